use serde::{Deserialize, Serialize};

use billflow_core::{DomainError, DomainResult, Entity, UserId};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    handle: String,
}

impl User {
    /// Register a new user under `handle` with a freshly assigned id.
    ///
    /// Handle uniqueness is a store-wide property and is checked by the directory
    /// service, not here.
    pub fn register(handle: impl Into<String>) -> DomainResult<Self> {
        let handle = handle.into();
        if handle.trim().is_empty() {
            return Err(DomainError::validation("telegram_username cannot be empty"));
        }
        Ok(Self {
            id: UserId::new(),
            handle,
        })
    }

    /// Rebuild a user from persisted fields, re-validating the identifier.
    pub fn rehydrate(id: &str, handle: impl Into<String>) -> DomainResult<Self> {
        Ok(Self {
            id: id.parse()?,
            handle: handle.into(),
        })
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_uuid_and_keeps_handle() {
        let user = User::register("alice").unwrap();
        assert_eq!(user.handle(), "alice");
        assert!(user.id_typed().to_string().parse::<UserId>().is_ok());
    }

    #[test]
    fn register_rejects_blank_handle() {
        assert!(matches!(
            User::register("  "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rehydrate_accepts_valid_record() {
        let id = UserId::new();
        let user = User::rehydrate(&id.to_string(), "test").unwrap();
        assert_eq!(user.id_typed(), id);
        assert_eq!(user.handle(), "test");
    }

    #[test]
    fn rehydrate_rejects_tampered_id() {
        let err = User::rehydrate("test", "test").unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdentifier { kind: "user", .. }));
    }
}
