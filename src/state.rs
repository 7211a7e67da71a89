//! Engine State
//!
//! Everything the monitor task and the request handlers share lives in one
//! `NodeState` behind one mutex. The lock is only ever held for in-memory
//! transitions; every network call happens after the guard is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::registry::{NodeConfig, Topology};
use crate::status::{OperatingMode, Status};
use crate::sync::UpdateCache;

/// Mutable per-node state
#[derive(Debug, Clone)]
pub struct NodeState {
    pub status: Status,
    pub mode: OperatingMode,
    pub topology: Topology,
    pub cache: UpdateCache,
}

impl NodeState {
    /// Initial state for a freshly loaded configuration.
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            status: Status::Waiting,
            mode: OperatingMode::from_role(config.role),
            topology: Topology::new(config.parent_addr.clone(), config.descendants.clone()),
            cache: UpdateCache::default(),
        }
    }
}

/// Shared handle to the node state
pub type SharedState = Arc<Mutex<NodeState>>;

/// Create a shared state handle.
pub fn shared(state: NodeState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// Lock the node state.
///
/// A panic while the lock was held (only possible from a bug, handlers are
/// unwind-guarded) leaves the last written value in place; keep serving it.
pub fn lock(state: &SharedState) -> MutexGuard<'_, NodeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
