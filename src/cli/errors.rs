//! CLI-specific error type. Every CLI error is fatal: main prints it and
//! exits non-zero.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    AlreadyInitialized,
    NotInitialized,
    EngineError,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CLI_CONFIG_ERROR",
            Self::AlreadyInitialized => "CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "CLI_NOT_INITIALIZED",
            Self::EngineError => "CLI_ENGINE_ERROR",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(CliErrorCode::AlreadyInitialized, "data directory already initialized")
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<crate::config::ConfigError> for CliError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<crate::errors::EngineError> for CliError {
    fn from(e: crate::errors::EngineError) -> Self {
        Self::new(CliErrorCode::EngineError, e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
