//! Configuration Error Types
//!
//! Every configuration error is fatal: the node refuses to start rather
//! than guess at its position in the chain.

use std::fmt;

/// Configuration error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Error kind
    pub kind: ConfigErrorKind,
    /// Error message
    pub message: String,
}

/// Configuration error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// File could not be read
    Unreadable,
    /// File is not valid JSON
    Malformed,
    /// `role` key absent
    MissingRole,
    /// `role` is neither "master" nor "slave"
    InvalidRole,
    /// Slave without `parent_addr`
    MissingParent,
    /// Master with `parent_addr`
    UnexpectedParent,
    /// Address is not `host:port`
    InvalidAddress,
    /// A tuning value is out of range
    InvalidValue,
}

impl ConfigErrorKind {
    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreadable => "CONFIG_UNREADABLE",
            Self::Malformed => "CONFIG_MALFORMED",
            Self::MissingRole => "CONFIG_MISSING_ROLE",
            Self::InvalidRole => "CONFIG_INVALID_ROLE",
            Self::MissingParent => "CONFIG_MISSING_PARENT",
            Self::UnexpectedParent => "CONFIG_UNEXPECTED_PARENT",
            Self::InvalidAddress => "CONFIG_INVALID_ADDRESS",
            Self::InvalidValue => "CONFIG_INVALID_VALUE",
        }
    }
}

impl ConfigError {
    /// Create a new configuration error.
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Unreadable, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Malformed, message)
    }

    pub fn missing_role() -> Self {
        Self::new(
            ConfigErrorKind::MissingRole,
            "role is required and must be 'master' or 'slave'",
        )
    }

    pub fn invalid_role(role: &str) -> Self {
        Self::new(
            ConfigErrorKind::InvalidRole,
            format!("invalid role '{}': must be 'master' or 'slave'", role),
        )
    }

    pub fn missing_parent() -> Self {
        Self::new(
            ConfigErrorKind::MissingParent,
            "slave requires a non-empty parent_addr",
        )
    }

    pub fn unexpected_parent() -> Self {
        Self::new(
            ConfigErrorKind::UnexpectedParent,
            "master must not have parent_addr configured",
        )
    }

    pub fn invalid_address(field: &str, addr: &str) -> Self {
        Self::new(
            ConfigErrorKind::InvalidAddress,
            format!("{} '{}' is not a host:port address", field, addr),
        )
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidValue, message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
