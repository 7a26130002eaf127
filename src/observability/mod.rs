//! Structured logging for engine lifecycle events.

pub mod logger;

pub use logger::{Logger, Severity};
