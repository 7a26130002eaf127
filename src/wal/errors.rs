//! WAL error types.
//!
//! Three kinds, matching spec.md §4.1/§7:
//! - `Io`: append/flush failed (disk full, permissions).
//! - `Durability`: an explicit fsync failed under `Full` durability.
//! - `Corrupt`: checksum or structural failure while reading a segment.
//!   A corrupt record may be a tolerated torn tail write (the final line of
//!   the newest segment) — `tolerable_tail` distinguishes that case.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalErrorKind {
    Io,
    Durability,
    Corrupt,
}

impl fmt::Display for WalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalErrorKind::Io => write!(f, "IO_ERROR"),
            WalErrorKind::Durability => write!(f, "DURABILITY_ERROR"),
            WalErrorKind::Corrupt => write!(f, "CORRUPT_LOG_ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct WalError {
    kind: WalErrorKind,
    message: String,
    /// Set only on `Corrupt` errors: true if this corruption was the final
    /// line of the newest segment, and so may be a torn write from a crash.
    tolerable_tail: bool,
    source: Option<io::Error>,
}

impl WalError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self { kind: WalErrorKind::Io, message: message.into(), tolerable_tail: false, source: Some(source) }
    }

    pub fn durability(message: impl Into<String>, source: io::Error) -> Self {
        Self { kind: WalErrorKind::Durability, message: message.into(), tolerable_tail: false, source: Some(source) }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self { kind: WalErrorKind::Corrupt, message: message.into(), tolerable_tail: false, source: None }
    }

    pub fn corrupt_tail(message: impl Into<String>) -> Self {
        Self { kind: WalErrorKind::Corrupt, message: message.into(), tolerable_tail: true, source: None }
    }

    pub fn kind(&self) -> WalErrorKind {
        self.kind
    }

    pub fn is_tolerable_tail(&self) -> bool {
        self.tolerable_tail
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for WalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type WalResult<T> = Result<T, WalError>;
