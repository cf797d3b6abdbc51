//! Error types for the accounts ledger engine.
//!
//! One taxonomy serves both directions. Business-rule violations carry enough
//! detail for the caller to correct the request; `ConcurrencyConflict` is
//! transient and retried by the store before it ever reaches a caller.

use thiserror::Error;
use uuid::Uuid;

use crate::accounts::types::AccountStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum AccountsError {
    /// Malformed input (negative amounts, bad installment count, missing counterparty).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced record does not exist (or belongs to another organization).
    #[error("Ledger record {0} not found")]
    NotFound(Uuid),

    /// Operation not permitted in the record's current status.
    #[error("Operation not allowed while record is {status}: {reason}")]
    InvalidState {
        /// The record's current status.
        status: AccountStatus,
        /// What was attempted and why it was refused.
        reason: String,
    },

    /// Payment attempted on a record that still awaits approval.
    #[error("Ledger record {0} requires approval before payment")]
    ApprovalRequired(Uuid),

    /// The acting user's role may not perform the operation.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden {
        /// The acting user's role.
        role: String,
        /// The refused action.
        action: String,
    },

    /// A concurrent writer changed the record first.
    #[error("Ledger record {0} was modified concurrently, please retry")]
    ConcurrencyConflict(Uuid),

    /// Storage unavailable or failed; the unit of work was rolled back.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl AccountsError {
    /// Shorthand for an `InvalidState` error.
    pub fn invalid_state(status: AccountStatus, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            status,
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for errors worth retrying with fresh data.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidState { .. } | Self::ApprovalRequired(_) => 400,
            Self::Forbidden { .. } => 403,
            Self::NotFound(_) => 404,
            Self::ConcurrencyConflict(_) => 409,
            Self::Persistence(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::ApprovalRequired(_) => "APPROVAL_REQUIRED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AccountsError::validation("bad"), 400, "VALIDATION_ERROR")]
    #[case(AccountsError::NotFound(Uuid::nil()), 404, "NOT_FOUND")]
    #[case(
        AccountsError::invalid_state(AccountStatus::Paid, "already settled"),
        400,
        "INVALID_STATE"
    )]
    #[case(AccountsError::ApprovalRequired(Uuid::nil()), 400, "APPROVAL_REQUIRED")]
    #[case(
        AccountsError::Forbidden { role: "viewer".into(), action: "approve".into() },
        403,
        "FORBIDDEN"
    )]
    #[case(AccountsError::ConcurrencyConflict(Uuid::nil()), 409, "CONCURRENCY_CONFLICT")]
    #[case(AccountsError::Persistence("down".into()), 500, "PERSISTENCE_FAILURE")]
    fn test_error_mapping(#[case] err: AccountsError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_invalid_state_message_names_status() {
        let err = AccountsError::invalid_state(AccountStatus::Cancelled, "cannot pay");
        assert!(err.to_string().contains("cancelled"));
        assert!(err.to_string().contains("cannot pay"));
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(AccountsError::ConcurrencyConflict(Uuid::nil()).is_retryable());
        assert!(!AccountsError::Persistence("x".into()).is_retryable());
        assert!(!AccountsError::ApprovalRequired(Uuid::nil()).is_retryable());
    }
}
