//! Status and Operating Mode
//!
//! Status:
//! - Waiting: idle, ready to start (initial)
//! - Running: the supervised workload is believed started
//! - TemporarilyStopped: operator-visible message with an absolute expiry
//!
//! OperatingMode:
//! - Standby: watches a parent
//! - ActingActive: expected to run the workload
//!
//! Mode only ever moves Standby → ActingActive. A node never demotes itself.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Role;

/// Operational status of this node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    /// Idle and ready to start
    #[default]
    Waiting,

    /// Supervised workload believed started
    Running,

    /// Stopped with an operator message until `expires_at`.
    /// Reverts to Waiting lazily, on the first monitor tick at or after expiry.
    TemporarilyStopped {
        message: String,
        expires_at: DateTime<Utc>,
    },
}

impl Status {
    /// Wire name, as reported by `GET /status`.
    pub fn name(&self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::TemporarilyStopped { .. } => "temporarily_stopped",
        }
    }

    /// Build a temporary status lasting `timeout` from `now`.
    pub fn temporarily_stopped(message: impl Into<String>, now: DateTime<Utc>, timeout: Duration) -> Self {
        Status::TemporarilyStopped {
            message: message.into(),
            expires_at: deadline(now, timeout),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Status::Running)
    }

    pub fn is_temporarily_stopped(&self) -> bool {
        matches!(self, Status::TemporarilyStopped { .. })
    }

    /// Only a non-running node can be started.
    pub fn can_start(&self) -> bool {
        !self.is_running()
    }

    /// True once `now` has reached the expiry of a temporary status.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Status::TemporarilyStopped { expires_at, .. } => now >= *expires_at,
            _ => false,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Status::TemporarilyStopped { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Status::TemporarilyStopped { expires_at, .. } => Some(*expires_at),
            _ => None,
        }
    }
}

/// `now + timeout`, saturating at the largest representable instant.
pub fn deadline(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Effective operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Standby,
    ActingActive,
}

impl OperatingMode {
    /// Initial mode for a configured role.
    pub fn from_role(role: Role) -> Self {
        match role {
            Role::Active => OperatingMode::ActingActive,
            Role::Standby => OperatingMode::Standby,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OperatingMode::Standby => "standby",
            OperatingMode::ActingActive => "acting_active",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, OperatingMode::ActingActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_default_status_is_waiting() {
        assert_eq!(Status::default(), Status::Waiting);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(Status::Waiting.name(), "waiting");
        assert_eq!(Status::Running.name(), "running");
        assert_eq!(
            Status::temporarily_stopped("m", at(0), Duration::from_secs(1)).name(),
            "temporarily_stopped"
        );
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let status = Status::temporarily_stopped("deploy", at(100), Duration::from_secs(30));
        assert_eq!(status.expires_at(), Some(at(130)));
        assert!(!status.is_expired(at(129)));
        assert!(status.is_expired(at(130)));
        assert!(status.is_expired(at(131)));
    }

    #[test]
    fn test_only_temp_status_expires() {
        assert!(!Status::Waiting.is_expired(at(i32::MAX as i64)));
        assert!(!Status::Running.is_expired(at(i32::MAX as i64)));
    }

    #[test]
    fn test_deadline_saturates() {
        assert_eq!(deadline(at(0), Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_mode_from_role() {
        assert_eq!(OperatingMode::from_role(Role::Active), OperatingMode::ActingActive);
        assert_eq!(OperatingMode::from_role(Role::Standby), OperatingMode::Standby);
        assert!(!OperatingMode::Standby.is_active());
    }
}
