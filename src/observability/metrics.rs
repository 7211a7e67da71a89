//! Failover counters
//!
//! Counters only, monotonic, reset on process start. Relaxed ordering is
//! enough: nothing synchronizes on these values.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    monitor_ticks: AtomicU64,
    parent_probes: AtomicU64,
    peer_failures: AtomicU64,
    promotions: AtomicU64,
    promotion_conflicts: AtomicU64,
    updates_pushed: AtomicU64,
    push_failures: AtomicU64,
    updates_received: AtomicU64,
    syncs_adopted: AtomicU64,
    callback_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_monitor_ticks(&self) {
        self.monitor_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parent_probes(&self) {
        self.parent_probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_peer_failures(&self) {
        self.peer_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_promotions(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_promotion_conflicts(&self) {
        self.promotion_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates_pushed(&self) {
        self.updates_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add failed per-descendant deliveries from one push
    pub fn add_push_failures(&self, count: u64) {
        self.push_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_updates_received(&self) {
        self.updates_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_syncs_adopted(&self) {
        self.syncs_adopted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_failures(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            monitor_ticks: self.monitor_ticks.load(Ordering::Relaxed),
            parent_probes: self.parent_probes.load(Ordering::Relaxed),
            peer_failures: self.peer_failures.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            promotion_conflicts: self.promotion_conflicts.load(Ordering::Relaxed),
            updates_pushed: self.updates_pushed.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
            updates_received: self.updates_received.load(Ordering::Relaxed),
            syncs_adopted: self.syncs_adopted.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub monitor_ticks: u64,
    pub parent_probes: u64,
    pub peer_failures: u64,
    pub promotions: u64,
    pub promotion_conflicts: u64,
    pub updates_pushed: u64,
    pub push_failures: u64,
    pub updates_received: u64,
    pub syncs_adopted: u64,
    pub callback_failures: u64,
}
