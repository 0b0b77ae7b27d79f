use thiserror::Error;
use tracing::{info, instrument};

use billflow_core::{DomainError, UserId};
use billflow_infra::{RepositoryError, UserRepository};
use billflow_users::User;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    UserNotFound,

    #[error("user is existing")]
    ExistingUser,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{context}: {source}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Registration and lookup of users by id or handle.
pub struct UserDirectory<U> {
    users: U,
}

impl<U: UserRepository> UserDirectory<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Register `handle`, failing with `ExistingUser` if it is already taken.
    ///
    /// Uniqueness is checked against the store's cache, which holds every user
    /// written by this process.
    #[instrument(skip(self))]
    pub async fn create(&self, handle: &str) -> DirectoryResult<User> {
        let user = User::register(handle)?;

        match self.users.get_by_handle(handle).await {
            Ok(_) => return Err(DirectoryError::ExistingUser),
            Err(RepositoryError::NotFound) => {}
            Err(source) => {
                return Err(DirectoryError::Repository {
                    context: "get user by handle",
                    source,
                });
            }
        }

        let user = self
            .users
            .create(user)
            .await
            .map_err(|source| DirectoryError::Repository {
                context: "create user",
                source,
            })?;
        info!(user_id = %user.id_typed(), "user registered");
        Ok(user)
    }

    pub async fn get_all(&self) -> DirectoryResult<Vec<User>> {
        self.users
            .get_all()
            .await
            .map_err(|source| DirectoryError::Repository {
                context: "list users",
                source,
            })
    }

    pub async fn get_by_handle(&self, handle: &str) -> DirectoryResult<User> {
        self.users
            .get_by_handle(handle)
            .await
            .map_err(not_found_or("get user by handle"))
    }

    pub async fn get_by_id(&self, id: UserId) -> DirectoryResult<User> {
        self.users.get(id).await.map_err(not_found_or("get user"))
    }

    /// Remove a user. Billings owned by the user are left in place.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> DirectoryResult<User> {
        let user = self
            .users
            .delete(id)
            .await
            .map_err(not_found_or("delete user"))?;
        info!("user deleted");
        Ok(user)
    }
}

fn not_found_or(context: &'static str) -> impl FnOnce(RepositoryError) -> DirectoryError {
    move |source| match source {
        RepositoryError::NotFound => DirectoryError::UserNotFound,
        source => DirectoryError::Repository { context, source },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use billflow_infra::{InMemoryDocumentStore, UserStore};

    async fn directory() -> (
        Arc<InMemoryDocumentStore>,
        UserDirectory<UserStore<Arc<InMemoryDocumentStore>>>,
    ) {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let users = UserStore::connect(docs.clone(), "users").await.unwrap();
        (docs, UserDirectory::new(users))
    }

    #[tokio::test]
    async fn duplicate_handle_is_rejected_other_handles_succeed() {
        let (_, dir) = directory().await;
        dir.create("alice").await.unwrap();

        assert!(matches!(
            dir.create("alice").await,
            Err(DirectoryError::ExistingUser)
        ));
        dir.create("bob").await.unwrap();
        assert_eq!(dir.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lookup_by_handle_returns_uuid_shaped_id() {
        let (_, dir) = directory().await;
        let created = dir.create("alice").await.unwrap();

        let found = dir.get_by_handle("alice").await.unwrap();
        assert_eq!(found.handle(), "alice");
        assert_eq!(found.id_typed(), created.id_typed());
        assert!(found.id_typed().to_string().parse::<UserId>().is_ok());

        assert!(matches!(
            dir.get_by_handle("nobody").await,
            Err(DirectoryError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn empty_handle_is_a_validation_error() {
        let (_, dir) = directory().await;
        assert!(matches!(
            dir.create("").await,
            Err(DirectoryError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn get_and_delete_by_id() {
        let (_, dir) = directory().await;
        let user = dir.create("alice").await.unwrap();

        assert_eq!(dir.get_by_id(user.id_typed()).await.unwrap(), user);
        assert_eq!(dir.delete(user.id_typed()).await.unwrap(), user);
        assert!(matches!(
            dir.get_by_id(user.id_typed()).await,
            Err(DirectoryError::UserNotFound)
        ));
        assert!(matches!(
            dir.delete(user.id_typed()).await,
            Err(DirectoryError::UserNotFound)
        ));
        // handle is free again
        dir.create("alice").await.unwrap();
    }

    #[tokio::test]
    async fn storage_failure_on_create_is_a_repository_error() {
        let (docs, dir) = directory().await;
        docs.set_offline(true);
        assert!(matches!(
            dir.create("alice").await,
            Err(DirectoryError::Repository {
                context: "create user",
                ..
            })
        ));
    }
}
