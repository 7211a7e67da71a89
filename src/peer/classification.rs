//! Peer classification
//!
//! Collapses a probe result into the three states the monitor acts on.

use std::fmt;

use serde::Serialize;

/// Liveness of a probed peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerClassification {
    /// Reachable and reporting "running" or "waiting"
    Up,
    /// Reachable but reporting anything else, including a temporary status
    Idle,
    /// Unreachable, timed out, or answered with an unparseable body
    Down,
}

impl PeerClassification {
    /// Classify a reachable peer by its raw status string.
    pub fn from_status(raw: &str) -> Self {
        match raw {
            "running" | "waiting" => PeerClassification::Up,
            _ => PeerClassification::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeerClassification::Up => "up",
            PeerClassification::Idle => "idle",
            PeerClassification::Down => "down",
        }
    }
}

impl fmt::Display for PeerClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
