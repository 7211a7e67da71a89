//! Health Monitor
//!
//! One long-lived task, one tick per `monitor_interval`. Ticks never
//! overlap: the next one is scheduled only after the current one returns,
//! and intervals missed while a tick ran long are skipped.
//!
//! Per tick:
//! - expire a lapsed temporary status
//! - standby: probe the parent; when it is down and the local workload is
//!   not running, wait out the stagger, check that no peer already runs the
//!   workload, then promote
//! - standby with a reachable parent: learn an empty descendant list from it
//! - acting-active: optionally re-send the topology notice

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::errors::FailoverError;
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry};
use crate::peer::{PeerClassification, PeerClient};
use crate::promotion::{NoticeReport, PromotionCoordinator, PromotionReport};
use crate::registry::EngineSettings;
use crate::state::{self, SharedState};
use crate::status::StatusMachine;

/// What one tick decided
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Parent answered
    ParentReachable {
        classification: PeerClassification,
        discovered_descendants: bool,
    },
    /// Parent is down but this node already runs the workload
    ParentDownWhileRunning,
    /// Parent is down and another peer already runs the workload
    PromotionDeferred { running_peer: String },
    /// Parent is down and this node took over
    Promoted(PromotionReport),
    /// Promotion lost a race with a concurrent one
    PromotionSkipped,
    /// Node is acting-active; nothing to probe
    Active { reasserted: Option<NoticeReport> },
    /// Standby without a parent pointer
    NoParent,
}

/// Periodic parent probe and failover trigger
#[derive(Clone)]
pub struct HealthMonitor {
    state: SharedState,
    status: StatusMachine,
    coordinator: PromotionCoordinator,
    peers: PeerClient,
    self_addr: String,
    settings: EngineSettings,
    metrics: Arc<MetricsRegistry>,
}

impl HealthMonitor {
    pub fn new(
        state: SharedState,
        status: StatusMachine,
        coordinator: PromotionCoordinator,
        peers: PeerClient,
        self_addr: impl Into<String>,
        settings: EngineSettings,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            state,
            status,
            coordinator,
            peers,
            self_addr: self_addr.into(),
            settings,
            metrics,
        }
    }

    /// Tick until `shutdown` fires or its sender is dropped.
    ///
    /// Shutdown is observed between ticks only; a running tick completes.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.settings.monitor_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
        log_event_with_fields(Event::ShutdownStart, &[("component", "monitor")]);
    }

    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// One tick, with `now` used for temporary status expiry.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        self.metrics.increment_monitor_ticks();
        self.status.expire_temporary_status(now);

        let (mode, parent, running) = {
            let guard = state::lock(&self.state);
            (
                guard.mode,
                guard.topology.parent().map(str::to_string),
                guard.status.is_running(),
            )
        };

        if mode.is_active() {
            let reasserted = if self.settings.reassert_descendants {
                Some(self.coordinator.announce_to_descendants().await)
            } else {
                None
            };
            return TickOutcome::Active { reasserted };
        }

        let Some(parent) = parent else {
            return TickOutcome::NoParent;
        };

        self.metrics.increment_parent_probes();
        match self.peers.fetch_status(&parent).await {
            Ok(report) => {
                let classification = PeerClassification::from_status(&report.status);
                log_event_with_fields(
                    Event::ParentProbe,
                    &[("parent", parent.as_str()), ("classification", classification.as_str())],
                );
                let discovered_descendants = self.discover_descendants(report.slaves);
                TickOutcome::ParentReachable {
                    classification,
                    discovered_descendants,
                }
            }
            Err(e) => {
                log_event_with_fields(
                    Event::ParentDown,
                    &[("parent", parent.as_str()), ("error", e.to_string().as_str())],
                );
                if running {
                    return TickOutcome::ParentDownWhileRunning;
                }
                self.fail_over().await
            }
        }
    }

    fn discover_descendants(&self, reported: Vec<String>) -> bool {
        let mut guard = state::lock(&self.state);
        let adopted = guard.topology.adopt_descendants(reported);
        if adopted {
            let list = guard.topology.descendants().join(",");
            log_event_with_fields(Event::DescendantsDiscovered, &[("descendants", list.as_str())]);
        }
        adopted
    }

    /// Stagger, liveness check, promote.
    async fn fail_over(&self) -> TickOutcome {
        let rank = state::lock(&self.state).topology.stagger_rank(&self.self_addr);
        let delay = self
            .settings
            .promotion_stagger
            .checked_mul(rank)
            .unwrap_or(Duration::MAX);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(running_peer) = self.coordinator.find_running_peer().await {
            self.metrics.increment_promotion_conflicts();
            log_event_with_fields(Event::PromotionConflict, &[("peer", running_peer.as_str())]);
            return TickOutcome::PromotionDeferred { running_peer };
        }

        match self.coordinator.promote_to_active().await {
            Ok(report) => TickOutcome::Promoted(report),
            Err(FailoverError::AlreadyActive) => {
                log_event(Event::PromotionConflict);
                TickOutcome::PromotionSkipped
            }
            Err(e) => {
                log_event_with_fields(Event::PromotionConflict, &[("error", e.to_string().as_str())]);
                TickOutcome::PromotionSkipped
            }
        }
    }
}
