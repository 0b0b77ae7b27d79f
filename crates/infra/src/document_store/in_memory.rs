use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::r#trait::{Document, DocumentStore, StorageError, document_id};

type Collection = BTreeMap<String, Document>;

/// In-memory document store.
///
/// Intended for tests/dev. The store can be switched offline to exercise the
/// storage-failure paths of the layers above it.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Unavailable` (or succeed
    /// again when `offline` is false).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Write a document directly, bypassing duplicate checks. Test seeding helper.
    pub fn put_raw(&self, collection: &str, id: &str, document: Document) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.ensure_online()
    }

    async fn find_one(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        self.ensure_online()?;
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        self.ensure_online()?;
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        self.ensure_online()?;
        let id = document_id(&document)?.to_string();

        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(StorageError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        docs.insert(id, document);
        Ok(())
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<Option<Document>, StorageError> {
        self.ensure_online()?;
        if document_id(&document)? != id {
            return Err(StorageError::Serialization(format!(
                "replacement document must keep _id {id}"
            )));
        }

        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) else {
            return Ok(None);
        };
        Ok(Some(std::mem::replace(slot, document)))
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        self.ensure_online()?;
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get_mut(collection).and_then(|c| c.remove(id)))
    }
}
