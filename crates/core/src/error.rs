//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (identifier
/// validation, state-machine boundaries). Storage concerns belong to the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A string did not parse as a UUID-shaped identifier.
    #[error("{value} is invalid {kind} id")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// A persisted workflow state did not match any known state name.
    #[error("{0} is invalid state")]
    InvalidState(String),

    /// `advance` was called on a billing that is already completed.
    #[error("impossible to next the state from completed state")]
    NextFromCompleted,

    /// `retreat` was called on a billing that is still pending.
    #[error("impossible to prev the state from pending state")]
    PrevFromPending,

    /// A value failed validation (e.g. empty input).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn invalid_identifier(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
        }
    }

    pub fn invalid_state(value: impl Into<String>) -> Self {
        Self::InvalidState(value.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(
            DomainError::NextFromCompleted.to_string(),
            "impossible to next the state from completed state"
        );
        assert_eq!(
            DomainError::PrevFromPending.to_string(),
            "impossible to prev the state from pending state"
        );
        assert_eq!(
            DomainError::invalid_identifier("user", "nope").to_string(),
            "nope is invalid user id"
        );
    }
}
