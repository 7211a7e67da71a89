//! Update propagation and sync
//!
//! Opaque JSON payloads flow from the active node to its descendants, and
//! back up to a freshly promoted node.

mod cache;
mod propagation;

pub use cache::{latest, CachedUpdate, UpdateCache};
pub use propagation::{DeliveryFailure, PushReport, SyncOutcome, UpdatePropagation};
