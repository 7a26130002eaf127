//! Recovery error types.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryErrorKind {
    CorruptLog,
    Io,
}

impl fmt::Display for RecoveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryErrorKind::CorruptLog => write!(f, "CORRUPT_LOG_ERROR"),
            RecoveryErrorKind::Io => write!(f, "IO_ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct RecoveryError {
    kind: RecoveryErrorKind,
    message: String,
}

impl RecoveryError {
    pub fn corrupt_log(message: impl Into<String>) -> Self {
        Self { kind: RecoveryErrorKind::CorruptLog, message: message.into() }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self { kind: RecoveryErrorKind::Io, message: message.into() }
    }

    pub fn kind(&self) -> RecoveryErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for RecoveryError {}

pub type RecoveryResult<T> = Result<T, RecoveryError>;
