//! Promotion Observability
//!
//! Every promotion attempt leaves a trail: begin, sync result, workload
//! start result, one entry per topology notice, completion. The trail is
//! returned in the `PromotionReport`; steps not already logged by the layer
//! that performed them are logged here.
//!
//! Observability describes what happened; it never decides what happens.

use serde::Serialize;

use crate::observability::{log_event_with_fields, Event};
use crate::sync::SyncOutcome;

/// Promotion lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PromotionEvent {
    /// Mode switched to acting-active
    Begin { self_addr: String },

    /// Pull from descendants finished
    Synced { outcome: SyncOutcome },

    /// Start callback result
    WorkloadStarted,
    WorkloadStartFailed { error: String },

    /// Topology notice result for one descendant
    NoticeDelivered { to: String },
    NoticeFailed { to: String, reason: String },

    /// Sequence finished; the node stays acting-active regardless
    Completed { notified: usize, unreachable: usize },
}

impl PromotionEvent {
    /// Event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "lighthouse.promotion.begin",
            Self::Synced { .. } => "lighthouse.promotion.synced",
            Self::WorkloadStarted => "lighthouse.promotion.workload_started",
            Self::WorkloadStartFailed { .. } => "lighthouse.promotion.workload_start_failed",
            Self::NoticeDelivered { .. } => "lighthouse.promotion.notice_delivered",
            Self::NoticeFailed { .. } => "lighthouse.promotion.notice_failed",
            Self::Completed { .. } => "lighthouse.promotion.completed",
        }
    }

    fn log(&self) {
        let name = self.event_name();
        match self {
            Self::Begin { self_addr } => log_event_with_fields(
                Event::PromotionBegin,
                &[("step", name), ("self", self_addr.as_str())],
            ),
            Self::NoticeDelivered { to } => log_event_with_fields(
                Event::TopologyNoticeSent,
                &[("step", name), ("to", to.as_str())],
            ),
            Self::Completed {
                notified,
                unreachable,
            } => log_event_with_fields(
                Event::PromotionComplete,
                &[
                    ("step", name),
                    ("notified", notified.to_string().as_str()),
                    ("unreachable", unreachable.to_string().as_str()),
                ],
            ),
            // Already logged by the sync, status and peer layers.
            Self::Synced { .. }
            | Self::WorkloadStarted
            | Self::WorkloadStartFailed { .. }
            | Self::NoticeFailed { .. } => {}
        }
    }
}

/// Collects the trail of one promotion attempt.
#[derive(Debug, Default)]
pub struct PromotionObserver {
    events: Vec<PromotionEvent>,
}

impl PromotionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record an event.
    pub fn emit(&mut self, event: PromotionEvent) {
        event.log();
        self.events.push(event);
    }

    pub fn events(&self) -> &[PromotionEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<PromotionEvent> {
        self.events
    }
}
