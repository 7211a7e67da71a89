//! Update Cache
//!
//! At most one payload per node, last write wins. `received_at` is stamped
//! with the storing node's clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload and the instant this node stored it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUpdate {
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Last-received shared-state payload
#[derive(Debug, Clone, Default)]
pub struct UpdateCache {
    current: Option<CachedUpdate>,
}

impl UpdateCache {
    pub fn current(&self) -> Option<&CachedUpdate> {
        self.current.as_ref()
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|u| u.received_at)
    }

    /// Overwrite unconditionally.
    pub fn store(&mut self, payload: Value, received_at: DateTime<Utc>) -> CachedUpdate {
        let update = CachedUpdate {
            payload,
            received_at,
        };
        self.current = Some(update.clone());
        update
    }

    /// Replace the cached value only if `candidate` is strictly newer.
    pub fn adopt_if_newer(&mut self, candidate: CachedUpdate) -> bool {
        match &self.current {
            Some(local) if local.received_at >= candidate.received_at => false,
            _ => {
                self.current = Some(candidate);
                true
            }
        }
    }
}

/// Pick the newest of the successful descendant responses.
///
/// Equal timestamps resolve to the one seen last in iteration order.
pub fn latest<I>(responses: I) -> Option<(String, CachedUpdate)>
where
    I: IntoIterator<Item = (String, CachedUpdate)>,
{
    responses.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.1.received_at > candidate.1.received_at => Some(current),
        _ => Some(candidate),
    })
}
