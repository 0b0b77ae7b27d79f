use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use billflow_core::UserId;
use billflow_users::User;

use super::{RepositoryError, RepositoryResult, UserRepository, ensure_key, validate_collection};
use crate::cache::EntityCache;
use crate::document_store::{Document, DocumentStore, StorageError};

/// Persisted shape of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub telegram_username: String,
}

impl UserDocument {
    pub fn from_model(user: &User) -> Self {
        Self {
            id: user.id_typed().to_string(),
            telegram_username: user.handle().to_string(),
        }
    }

    pub fn into_model(self) -> RepositoryResult<User> {
        Ok(User::rehydrate(&self.id, self.telegram_username)?)
    }
}

fn encode(user: &User) -> RepositoryResult<Document> {
    serde_json::to_value(UserDocument::from_model(user))
        .map_err(|e| StorageError::Serialization(e.to_string()).into())
}

fn decode(document: Document) -> RepositoryResult<User> {
    serde_json::from_value::<UserDocument>(document)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_model()
}

/// Document-backed user store with a write-through cache.
///
/// The cache is warmed with the whole collection at construction, which is what
/// makes the cache-only `get_by_handle` scan authoritative: every later write goes
/// through this store.
pub struct UserStore<D> {
    documents: D,
    collection: String,
    cache: EntityCache<User>,
    write_gate: Mutex<()>,
}

impl<D: DocumentStore> UserStore<D> {
    /// Ping the backend (failing fast if it is unreachable) and eagerly load every
    /// user into the cache.
    #[instrument(skip(documents), err)]
    pub async fn connect(documents: D, collection: &str) -> RepositoryResult<Self> {
        validate_collection(collection)?;
        documents.ping().await?;

        let store = Self {
            documents,
            collection: collection.to_string(),
            cache: EntityCache::new(),
            write_gate: Mutex::new(()),
        };
        let users = store.load_all().await?;
        store.cache.extend(users);
        info!(count = store.cache.len(), "user cache warmed");

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn load_all(&self) -> RepositoryResult<Vec<User>> {
        self.documents
            .find_all(&self.collection)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[async_trait]
impl<D: DocumentStore> UserRepository for UserStore<D> {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get(&self, id: UserId) -> RepositoryResult<User> {
        if let Some(user) = self.cache.get(&id) {
            return Ok(user);
        }

        let _gate = self.write_gate.lock().await;
        // filled by a concurrent miss while we waited
        if let Some(user) = self.cache.get(&id) {
            return Ok(user);
        }

        debug!("cache miss");
        let document = self
            .documents
            .find_one(&self.collection, &id.to_string())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let user = decode(document)?;
        ensure_key(&id, &user)?;
        self.cache.insert(user.clone());
        Ok(user)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_by_handle(&self, handle: &str) -> RepositoryResult<User> {
        self.cache
            .find(|user| user.handle() == handle)
            .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        if !self.cache.is_empty() {
            return Ok(self.cache.values());
        }

        let _gate = self.write_gate.lock().await;
        let users = self.load_all().await?;
        self.cache.extend(users.iter().cloned());
        Ok(users)
    }

    #[instrument(skip(self, user), fields(collection = %self.collection, id = %user.id_typed()))]
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let _gate = self.write_gate.lock().await;
        self.documents
            .insert_one(&self.collection, encode(&user)?)
            .await?;
        self.cache.insert(user.clone());
        Ok(user)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn delete(&self, id: UserId) -> RepositoryResult<User> {
        let _gate = self.write_gate.lock().await;
        let document = self
            .documents
            .find_one_and_delete(&self.collection, &id.to_string())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        // The document is gone from storage even if it fails to decode.
        self.cache.remove(&id);
        let user = decode(document)?;
        ensure_key(&id, &user)?;
        Ok(user)
    }
}
