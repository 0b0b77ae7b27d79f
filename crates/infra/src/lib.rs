//! Infrastructure layer: durable document storage, per-store caches, and the
//! cached user/billing repositories built on top of them.

pub mod cache;
pub mod document_store;
pub mod repository;

pub use cache::EntityCache;
pub use document_store::{
    Document, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, StorageError,
};
pub use repository::{
    BillingRepository, BillingStore, RepositoryError, RepositoryResult, UserRepository, UserStore,
};
