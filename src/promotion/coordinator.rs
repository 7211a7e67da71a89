//! Promotion Coordinator
//!
//! Turns a standby into the acting active node:
//!
//! 1. switch mode to acting-active (compare-and-set, irreversible)
//! 2. pull the freshest payload from descendants
//! 3. start the workload
//! 4. tell every descendant that this node is now its parent
//!
//! Only step 1 can fail the promotion. Failures in steps 2-4 are logged and
//! recorded; the node stays acting-active and the monitor keeps ticking.
//!
//! Deciding *whether* to promote is the monitor's job. The coordinator also
//! answers the liveness question the monitor asks before promoting.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use crate::errors::FailoverResult;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::peer::PeerClient;
use crate::state::{self, SharedState};
use crate::status::StatusMachine;
use crate::sync::{SyncOutcome, UpdatePropagation};

use super::observability::{PromotionEvent, PromotionObserver};

/// Outcome of a topology notice fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoticeReport {
    pub notified: Vec<String>,
    pub unreachable: Vec<String>,
}

/// Outcome of one promotion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionReport {
    pub sync: SyncOutcome,
    pub workload_started: bool,
    pub notices: NoticeReport,
    pub events: Vec<PromotionEvent>,
}

/// Drives promotion and the active node's announcements
#[derive(Clone)]
pub struct PromotionCoordinator {
    state: SharedState,
    status: StatusMachine,
    propagation: UpdatePropagation,
    peers: PeerClient,
    self_addr: String,
    metrics: Arc<MetricsRegistry>,
}

impl PromotionCoordinator {
    pub fn new(
        state: SharedState,
        status: StatusMachine,
        propagation: UpdatePropagation,
        peers: PeerClient,
        self_addr: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            state,
            status,
            propagation,
            peers,
            self_addr: self_addr.into(),
            metrics,
        }
    }

    // =========================================================================
    // PROMOTION
    // =========================================================================

    /// Promote this node. Fails only with `AlreadyActive`.
    pub async fn promote_to_active(&self) -> FailoverResult<PromotionReport> {
        self.status.enter_acting_active()?;
        self.metrics.increment_promotions();

        let mut observer = PromotionObserver::new();
        observer.emit(PromotionEvent::Begin {
            self_addr: self.self_addr.clone(),
        });

        let sync = self.propagation.sync_from_descendants().await;
        observer.emit(PromotionEvent::Synced {
            outcome: sync.clone(),
        });

        let workload_started = match self.status.start_main() {
            Ok(_) => {
                observer.emit(PromotionEvent::WorkloadStarted);
                true
            }
            Err(e) => {
                observer.emit(PromotionEvent::WorkloadStartFailed {
                    error: e.to_string(),
                });
                false
            }
        };

        let notices = self.fan_out_notices(&mut observer).await;
        observer.emit(PromotionEvent::Completed {
            notified: notices.notified.len(),
            unreachable: notices.unreachable.len(),
        });

        Ok(PromotionReport {
            sync,
            workload_started,
            notices,
            events: observer.into_events(),
        })
    }

    /// Re-send the topology notice to every descendant.
    pub async fn announce_to_descendants(&self) -> NoticeReport {
        self.fan_out_notices(&mut PromotionObserver::new()).await
    }

    async fn fan_out_notices(&self, observer: &mut PromotionObserver) -> NoticeReport {
        let targets = state::lock(&self.state)
            .topology
            .fan_out_targets(&self.self_addr);

        let results = join_all(
            targets
                .iter()
                .map(|addr| self.peers.send_topology_notice(addr, &self.self_addr)),
        )
        .await;

        let mut report = NoticeReport::default();
        for (addr, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    observer.emit(PromotionEvent::NoticeDelivered { to: addr.clone() });
                    report.notified.push(addr);
                }
                Err(e) => {
                    observer.emit(PromotionEvent::NoticeFailed {
                        to: addr.clone(),
                        reason: e.to_string(),
                    });
                    report.unreachable.push(addr);
                }
            }
        }
        report
    }

    /// Receiving side of a topology notice: `new_parent` now acts as
    /// active and this node should monitor it. Returns true if the parent
    /// pointer changed. Status and mode are left alone.
    pub fn accept_topology_notice(&self, new_parent: &str) -> bool {
        let changed = state::lock(&self.state)
            .topology
            .set_parent(new_parent.to_string());
        log_event_with_fields(
            Event::TopologyNoticeReceived,
            &[("parent", new_parent), ("changed", if changed { "true" } else { "false" })],
        );
        changed
    }

    // =========================================================================
    // LIVENESS
    // =========================================================================

    /// First peer in the liveness scope that reports "running", if any.
    ///
    /// Unreachable peers count as not running.
    pub async fn find_running_peer(&self) -> Option<String> {
        let scope = state::lock(&self.state)
            .topology
            .liveness_scope(&self.self_addr);

        let results = join_all(scope.iter().map(|addr| self.peers.is_running(addr))).await;
        scope
            .into_iter()
            .zip(results)
            .find_map(|(addr, running)| running.then_some(addr))
    }

    /// True if any peer in the liveness scope reports "running".
    pub async fn any_main_running(&self) -> bool {
        self.find_running_peer().await.is_some()
    }

    // =========================================================================
    // CONFIGURED ACTIVE STARTUP
    // =========================================================================

    /// Startup path for a node configured as the active one: reset every
    /// descendant, then start the local workload.
    pub async fn assume_configured_active(&self) -> FailoverResult<()> {
        let targets = state::lock(&self.state)
            .topology
            .fan_out_targets(&self.self_addr);

        let results = join_all(targets.iter().map(|addr| self.peers.send_reset(addr))).await;
        let reset = results.iter().filter(|r| r.is_ok()).count();
        log_event_with_fields(
            Event::DescendantsReset,
            &[
                ("reset", reset.to_string().as_str()),
                ("unreachable", (targets.len() - reset).to_string().as_str()),
            ],
        );

        self.status.start_main().map(|_| ())
    }
}
