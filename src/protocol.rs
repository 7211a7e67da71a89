//! Wire types
//!
//! JSON bodies shared by the control surface and the peer client. The same
//! shapes serve operators and other lighthouse nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::status::OperatingMode;
use crate::sync::CachedUpdate;

/// `GET /status` response.
///
/// Deserialization is lenient: peers only need `status` to be classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Raw status string: "running", "waiting" or "temporarily_stopped"
    pub status: String,
    #[serde(default)]
    pub mode: Option<OperatingMode>,
    /// Descendant addresses, kept under the configuration file's key name
    #[serde(default)]
    pub slaves: Vec<String>,
    #[serde(default)]
    pub parent_addr: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instance_id: Option<Uuid>,
}

/// `GET /sync` response. Both fields are null on an empty cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    /// Convert into a cached update, if the peer holds one.
    ///
    /// `received_at` is what marks a non-empty cache; a JSON `null`
    /// payload is a legitimate value.
    pub fn into_update(self) -> Option<CachedUpdate> {
        self.received_at.map(|received_at| CachedUpdate {
            payload: self.payload.unwrap_or(Value::Null),
            received_at,
        })
    }
}

impl From<Option<&CachedUpdate>> for SyncReport {
    fn from(update: Option<&CachedUpdate>) -> Self {
        match update {
            Some(u) => Self {
                payload: Some(u.payload.clone()),
                received_at: Some(u.received_at),
            },
            None => Self::default(),
        }
    }
}

/// `POST /topology` body: the sender is the receiver's new parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNotice {
    pub parent_addr: String,
}

/// Optional `POST /stop` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub message: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// `POST /temp-status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempStatusRequest {
    pub message: String,
    pub timeout_secs: u64,
}

/// Error body for every non-2xx control-surface response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
