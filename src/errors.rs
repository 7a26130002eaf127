//! Unified engine error, per spec.md §7.
//!
//! Module-local errors (`WalError`, `IndexError`, `StoreError`,
//! `CheckpointError`, `RecoveryError`) stay hand-rolled close to their own
//! subsystem; at the facade boundary they fold into one `EngineError` so
//! callers (the HTTP adapter, the CLI) have a single type to match on,
//! exposing a `code()`/`status_code()` pair so each variant maps cleanly
//! onto an HTTP response.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::index::IndexError;
use crate::recovery::RecoveryError;
use crate::store::StoreError;
use crate::wal::WalError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("durability error: {0}")]
    Durability(String),

    #[error("corrupt log: {0}")]
    CorruptLog(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::AlreadyExists(_) => "ALREADY_EXISTS",
            EngineError::InvalidOperation(_) => "INVALID_OPERATION",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Io(_) => "IO_ERROR",
            EngineError::Durability(_) => "DURABILITY_ERROR",
            EngineError::CorruptLog(_) => "CORRUPT_LOG_ERROR",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::AlreadyExists(_) => 409,
            EngineError::InvalidOperation(_) => 400,
            EngineError::Validation(_) => 400,
            EngineError::Io(_) => 500,
            EngineError::Durability(_) => 500,
            EngineError::CorruptLog(_) => 500,
            EngineError::Internal(_) => 500,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        EngineError::InvalidOperation(message.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        use crate::store::StoreErrorKind;
        match e.kind() {
            StoreErrorKind::NotFound => EngineError::NotFound(e.message().to_string()),
            StoreErrorKind::InvalidOperation => EngineError::InvalidOperation(e.message().to_string()),
            StoreErrorKind::Validation => EngineError::Validation(e.message().to_string()),
        }
    }
}

impl From<IndexError> for EngineError {
    fn from(e: IndexError) -> Self {
        use crate::index::IndexErrorKind;
        match e.kind() {
            IndexErrorKind::AlreadyExists => EngineError::AlreadyExists(e.message().to_string()),
            IndexErrorKind::NotFound => EngineError::NotFound(e.message().to_string()),
            IndexErrorKind::BuildFailed => EngineError::Internal(e.message().to_string()),
            IndexErrorKind::InvalidOperation => EngineError::InvalidOperation(e.message().to_string()),
        }
    }
}

impl From<WalError> for EngineError {
    fn from(e: WalError) -> Self {
        use crate::wal::WalErrorKind;
        match e.kind() {
            WalErrorKind::Io => EngineError::Io(e.message().to_string()),
            WalErrorKind::Durability => EngineError::Durability(e.message().to_string()),
            WalErrorKind::Corrupt => EngineError::CorruptLog(e.message().to_string()),
        }
    }
}

impl From<CheckpointError> for EngineError {
    fn from(e: CheckpointError) -> Self {
        use crate::checkpoint::CheckpointErrorKind;
        match e.kind() {
            CheckpointErrorKind::Io => EngineError::Io(e.message().to_string()),
            CheckpointErrorKind::Serialization => EngineError::Internal(e.message().to_string()),
        }
    }
}

impl From<RecoveryError> for EngineError {
    fn from(e: RecoveryError) -> Self {
        use crate::recovery::RecoveryErrorKind;
        match e.kind() {
            RecoveryErrorKind::CorruptLog => EngineError::CorruptLog(e.message().to_string()),
            RecoveryErrorKind::Io => EngineError::Io(e.message().to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = EngineError::not_found("users/u1");
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn store_not_found_converts_to_engine_not_found() {
        let store_err = StoreError::not_found("missing");
        let engine_err: EngineError = store_err.into();
        assert_eq!(engine_err.code(), "NOT_FOUND");
    }
}
