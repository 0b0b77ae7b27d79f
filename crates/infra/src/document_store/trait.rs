use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A schemaless record. Always a JSON object carrying its key under `_id`.
pub type Document = JsonValue;

/// Name of the key field every document carries.
pub const ID_FIELD: &str = "_id";

/// Durable storage operation error.
///
/// These are **infrastructure errors** (connectivity, query failures, malformed
/// documents) as opposed to domain errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage query failed: {0}")]
    Query(String),

    #[error("document already exists: {collection}/{id}")]
    Duplicate { collection: String, id: String },

    #[error("malformed document: {0}")]
    Serialization(String),
}

/// Document-oriented durable storage, addressed by collection name.
///
/// Implementations must make `find_one_and_replace` and `find_one_and_delete`
/// atomic per document: the returned document is the one that was replaced or
/// removed. `None` means no document matched and nothing was written.
///
/// Dropping a returned future cancels the call.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Liveness check against the backend.
    async fn ping(&self) -> Result<(), StorageError>;

    async fn find_one(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError>;

    /// All documents of a collection, ordered by key.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StorageError>;

    /// Insert a new document. Fails with `Duplicate` if the key is taken.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError>;

    /// Replace the document stored under `id`, returning the previous version.
    async fn find_one_and_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<Option<Document>, StorageError>;

    /// Remove the document stored under `id`, returning it.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn ping(&self) -> Result<(), StorageError> {
        (**self).ping().await
    }

    async fn find_one(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        (**self).find_one(collection, id).await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        (**self).find_all(collection).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        (**self).insert_one(collection, document).await
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<Option<Document>, StorageError> {
        (**self).find_one_and_replace(collection, id, document).await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        (**self).find_one_and_delete(collection, id).await
    }
}

/// Extract the `_id` key of a document.
pub fn document_id(document: &Document) -> Result<&str, StorageError> {
    document
        .get(ID_FIELD)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| StorageError::Serialization(format!("document has no string {ID_FIELD}")))
}
