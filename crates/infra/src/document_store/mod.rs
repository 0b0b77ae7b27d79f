//! Durable document storage boundary.
//!
//! Defines the backend-agnostic document-store contract consumed by the repositories,
//! plus the in-memory (tests/dev) and Postgres adapters.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use r#trait::{Document, DocumentStore, ID_FIELD, StorageError, document_id};
