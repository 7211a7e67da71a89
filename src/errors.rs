//! # Failover Errors
//!
//! Error taxonomy shared by every component of the engine.
//!
//! Only `Config` and `Transport` are fatal, and only at startup. Everything
//! else is logged and absorbed by the component that hit it; the health
//! monitor never stops because of an error.

use thiserror::Error;

use crate::callbacks::CallbackSlot;
use crate::registry::ConfigError;

/// Result type for engine operations
pub type FailoverResult<T> = Result<T, FailoverError>;

/// Engine errors
#[derive(Debug, Clone, Error)]
pub enum FailoverError {
    // ==================
    // Startup Errors
    // ==================
    /// Malformed or incomplete configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    // ==================
    // Peer Errors
    // ==================
    /// A peer call failed or timed out
    #[error("peer {addr} unreachable: {reason}")]
    PeerUnreachable { addr: String, reason: String },

    // ==================
    // Callback Errors
    // ==================
    /// A user callback returned an error or panicked
    #[error("{slot} callback failed: {message}")]
    Callback { slot: CallbackSlot, message: String },

    // ==================
    // Promotion Errors
    // ==================
    /// Another node already reports running
    #[error("promotion aborted: {peer} already reports running")]
    PromotionConflict { peer: String },

    /// Promotion requested on a node that already acts as active
    #[error("node is already acting as active")]
    AlreadyActive,

    /// Push requested on a node that is not active
    #[error("node is not active; only the active node may push updates")]
    NotActive,

    /// HTTP client construction or listener bind failed
    #[error("transport error: {0}")]
    Transport(String),

    // ==================
    // Request Errors
    // ==================
    /// Malformed control-surface request
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FailoverError {
    /// Create a peer unreachable error.
    pub fn peer_unreachable(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            FailoverError::InvalidRequest(_) => 400,
            FailoverError::PromotionConflict { .. } => 409,
            FailoverError::AlreadyActive => 409,
            FailoverError::NotActive => 409,
            FailoverError::PeerUnreachable { .. } => 502,
            FailoverError::Callback { .. } => 500,
            FailoverError::Config(_) => 500,
            FailoverError::Transport(_) => 500,
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            FailoverError::Config(_) => "LIGHTHOUSE_CONFIG_ERROR",
            FailoverError::PeerUnreachable { .. } => "LIGHTHOUSE_PEER_UNREACHABLE",
            FailoverError::Callback { .. } => "LIGHTHOUSE_CALLBACK_ERROR",
            FailoverError::PromotionConflict { .. } => "LIGHTHOUSE_PROMOTION_CONFLICT",
            FailoverError::AlreadyActive => "LIGHTHOUSE_ALREADY_ACTIVE",
            FailoverError::NotActive => "LIGHTHOUSE_NOT_ACTIVE",
            FailoverError::InvalidRequest(_) => "LIGHTHOUSE_INVALID_REQUEST",
            FailoverError::Transport(_) => "LIGHTHOUSE_TRANSPORT_ERROR",
        }
    }

    /// Errors that prevent the node from running at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FailoverError::Config(_) | FailoverError::Transport(_))
    }
}
