//! Ledger error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world_state::StateError;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Every variant aborts the invocation that produced it; the host discards the
/// invocation's write-set, so no partial state is ever persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or out-of-range input (including undecodable stored records).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced account or record is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate create, duplicate reward for an event hash, etc.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A debit would drive a balance below zero.
    #[error("insufficient balance: account '{owner}' holds {available}, needs {required}")]
    InsufficientBalance {
        owner: String,
        available: u64,
        required: u64,
    },

    /// The caller is not the authorized issuer.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// World-state collaborator failure, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StateError),
}

/// Coarse error classification reported to callers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Authorization,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authorization => "authorization_error",
            ErrorKind::Storage => "storage_error",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn insufficient_balance(owner: impl Into<String>, available: u64, required: u64) -> Self {
        Self::InsufficientBalance {
            owner: owner.into(),
            available,
            required,
        }
    }

    /// Classify the error. Insufficient balance is reported as a conflict.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::Conflict(_) | LedgerError::InsufficientBalance { .. } => {
                ErrorKind::Conflict
            }
            LedgerError::Unauthorized(_) => ErrorKind::Authorization,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_is_a_conflict() {
        let err = LedgerError::insufficient_balance("alice", 5, 10);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(msg.contains('5'));
        assert!(msg.contains("10"));
    }

    #[test]
    fn storage_errors_pass_through_unchanged() {
        let state_err = StateError::backend("disk on fire");
        let err: LedgerError = state_err.clone().into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.to_string(), state_err.to_string());
    }

    #[test]
    fn kinds_serialize_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
        assert_eq!(ErrorKind::Authorization.as_str(), "authorization_error");
    }
}
