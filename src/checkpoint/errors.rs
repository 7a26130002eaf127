//! Checkpoint error types.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointErrorKind {
    Io,
    Serialization,
}

impl fmt::Display for CheckpointErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointErrorKind::Io => write!(f, "IO_ERROR"),
            CheckpointErrorKind::Serialization => write!(f, "SERIALIZATION_ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct CheckpointError {
    kind: CheckpointErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CheckpointError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self { kind: CheckpointErrorKind::Io, message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn serialization(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            kind: CheckpointErrorKind::Serialization,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> CheckpointErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;
