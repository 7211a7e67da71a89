//! CLI error type
//!
//! Every CLI error ends the process with a non-zero exit code. The code
//! string is printed first so scripts can match on it.

use std::io;

use thiserror::Error;

use crate::errors::FailoverError;

/// What went wrong, as a stable machine-readable code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    /// Writing to stdout failed, or a JSON body was unreadable
    IoError,
    /// Runtime or listener could not start
    BootFailed,
    /// Queried node did not answer
    Unreachable,
}

impl CliErrorCode {
    pub fn code(self) -> &'static str {
        match self {
            Self::ConfigError => "LIGHTHOUSE_CLI_CONFIG_ERROR",
            Self::IoError => "LIGHTHOUSE_CLI_IO_ERROR",
            Self::BootFailed => "LIGHTHOUSE_CLI_BOOT_FAILED",
            Self::Unreachable => "LIGHTHOUSE_CLI_UNREACHABLE",
        }
    }
}

#[derive(Debug, Error)]
#[error("{}: {}", .code.code(), .message)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, message)
    }

    pub fn boot_failed(message: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, message)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::new(CliErrorCode::IoError, e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(CliErrorCode::IoError, format!("JSON error: {}", e))
    }
}

impl From<FailoverError> for CliError {
    fn from(e: FailoverError) -> Self {
        let code = match &e {
            FailoverError::Config(_) => CliErrorCode::ConfigError,
            FailoverError::PeerUnreachable { .. } => CliErrorCode::Unreachable,
            _ => CliErrorCode::BootFailed,
        };
        Self::new(code, e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;
