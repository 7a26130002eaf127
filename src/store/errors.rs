//! Errors raised by the in-memory document store.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    InvalidOperation,
    Validation,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::NotFound => write!(f, "NOT_FOUND"),
            StoreErrorKind::InvalidOperation => write!(f, "INVALID_OPERATION"),
            StoreErrorKind::Validation => write!(f, "VALIDATION_ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::NotFound, message: message.into() }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::InvalidOperation, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Validation, message: message.into() }
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;
