//! Cached repositories for users and billings.
//!
//! Both stores are read-through/write-through: durable storage is written first and
//! the cache is only updated once that write succeeded, so a failed write is never
//! visible through the cache.
//!
//! Every operation that mutates the cache (writes and read-through fills) runs under
//! the store's write gate, held across the storage call. Cache mutations therefore
//! happen in the same order as the storage mutations they mirror, and a delete can
//! never be undone by an earlier update or fill landing after it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use billflow_billing::Billing;
use billflow_core::{BillingId, DomainError, Entity, UserId};
use billflow_users::User;

use crate::document_store::StorageError;

pub mod billings;
pub mod users;

pub use billings::BillingStore;
pub use users::UserStore;

/// Repository operation error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No record with the requested key.
    #[error("no data")]
    NotFound,

    /// A stored record decoded but failed domain validation (bad id, unknown state).
    #[error("corrupt record: {0}")]
    Corrupt(#[from] DomainError),

    /// A stored record did not have the expected document shape.
    #[error("failed to decode record: {0}")]
    Decode(String),

    /// The record stored under `requested` carries a different `_id`.
    #[error("record stored under {requested} carries id {stored}")]
    KeyMismatch { requested: String, stored: String },

    /// The store was constructed with an unusable configuration.
    #[error("invalid store config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// User persistence contract.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: UserId) -> RepositoryResult<User>;

    /// Cache-only lookup by handle.
    async fn get_by_handle(&self, handle: &str) -> RepositoryResult<User>;

    async fn get_all(&self) -> RepositoryResult<Vec<User>>;

    async fn create(&self, user: User) -> RepositoryResult<User>;

    async fn delete(&self, id: UserId) -> RepositoryResult<User>;
}

/// Billing persistence contract.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn get(&self, id: BillingId) -> RepositoryResult<Billing>;

    /// Cache-only lookup of every billing owned by `owner_id`.
    async fn get_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Billing>>;

    async fn get_all(&self) -> RepositoryResult<Vec<Billing>>;

    async fn create(&self, billing: Billing) -> RepositoryResult<Billing>;

    /// Atomically replace the stored billing; `NotFound` if it does not exist.
    async fn update(&self, billing: Billing) -> RepositoryResult<Billing>;

    async fn delete(&self, id: BillingId) -> RepositoryResult<Billing>;
}

#[async_trait]
impl<R> UserRepository for Arc<R>
where
    R: UserRepository + ?Sized,
{
    async fn get(&self, id: UserId) -> RepositoryResult<User> {
        (**self).get(id).await
    }

    async fn get_by_handle(&self, handle: &str) -> RepositoryResult<User> {
        (**self).get_by_handle(handle).await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        (**self).get_all().await
    }

    async fn create(&self, user: User) -> RepositoryResult<User> {
        (**self).create(user).await
    }

    async fn delete(&self, id: UserId) -> RepositoryResult<User> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<R> BillingRepository for Arc<R>
where
    R: BillingRepository + ?Sized,
{
    async fn get(&self, id: BillingId) -> RepositoryResult<Billing> {
        (**self).get(id).await
    }

    async fn get_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Billing>> {
        (**self).get_by_owner(owner_id).await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Billing>> {
        (**self).get_all().await
    }

    async fn create(&self, billing: Billing) -> RepositoryResult<Billing> {
        (**self).create(billing).await
    }

    async fn update(&self, billing: Billing) -> RepositoryResult<Billing> {
        (**self).update(billing).await
    }

    async fn delete(&self, id: BillingId) -> RepositoryResult<Billing> {
        (**self).delete(id).await
    }
}

/// Reject a record whose `_id` differs from the key it was fetched under.
fn ensure_key<E: Entity>(requested: &E::Id, entity: &E) -> RepositoryResult<()> {
    if entity.id() != requested {
        return Err(RepositoryError::KeyMismatch {
            requested: requested.to_string(),
            stored: entity.id().to_string(),
        });
    }
    Ok(())
}

fn validate_collection(collection: &str) -> RepositoryResult<()> {
    if collection.trim().is_empty() {
        return Err(RepositoryError::InvalidConfig(
            "collection name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
