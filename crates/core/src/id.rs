//! Strongly-typed identifiers and the identity validator.
//!
//! Every identifier that crosses a boundary (HTTP path/query/body, rehydrated
//! storage record) goes through [`validate_id`] via the `FromStr` impls below, so a
//! tampered or corrupted record is rejected at load time.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Validate that `value` is a well-formed UUID and return it.
///
/// `kind` only feeds the error message ("user", "billing").
pub fn validate_id(kind: &'static str, value: &str) -> Result<Uuid, DomainError> {
    Uuid::from_str(value).map_err(|_| DomainError::invalid_identifier(kind, value))
}

/// Identifier of a registered user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Identifier of a billing (one workflow instance).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $kind:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validate_id($kind, s).map(Self)
            }
        }
    };
}

impl_uuid_newtype!(UserId, "user");
impl_uuid_newtype!(BillingId, "billing");

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_non_uuid_strings() {
        let err = "test".parse::<UserId>().unwrap_err();
        assert_eq!(err, DomainError::invalid_identifier("user", "test"));

        let err = "".parse::<BillingId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdentifier { kind: "billing", .. }));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(BillingId::new(), BillingId::new());
    }

    proptest! {
        #[test]
        fn any_uuid_text_is_accepted(bytes in any::<[u8; 16]>()) {
            let uuid = Uuid::from_bytes(bytes);
            prop_assert_eq!(validate_id("user", &uuid.to_string()).unwrap(), uuid);
        }

        #[test]
        fn short_alphanumeric_strings_are_rejected(s in "[a-z0-9]{0,31}") {
            prop_assert!(validate_id("billing", &s).is_err());
        }
    }
}
