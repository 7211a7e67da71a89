//! Observable lifecycle events
//!
//! Events are explicit and typed; the string form is what lands in the
//! `event` field of a log line.

use std::fmt;

/// Observable events in a lighthouse node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Node startup begins
    BootStart,
    /// Control surface is listening
    Serving,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Configuration rejected (FATAL)
    ConfigRejected,

    // Status state machine
    /// Start callback invoked, status is now running
    MainStarted,
    /// Stop callback invoked
    MainStopped,
    /// Temporary status set
    TempStatusSet,
    /// Temporary status expired back to waiting
    TempStatusExpired,
    /// A user callback returned an error or panicked
    CallbackFailed,

    // Health monitor
    /// Parent probe classified
    ParentProbe,
    /// Parent classified as down
    ParentDown,
    /// Descendant list learned from the parent
    DescendantsDiscovered,
    /// Peer call failed or timed out
    PeerUnreachable,

    // Promotion
    /// Promotion sequence begins
    PromotionBegin,
    /// Another node reports running; promotion aborted
    PromotionConflict,
    /// Promotion sequence finished
    PromotionComplete,
    /// Topology-changed notice sent to a descendant
    TopologyNoticeSent,
    /// Topology-changed notice received from a new parent
    TopologyNoticeReceived,
    /// Configured active node reset its descendants at startup
    DescendantsReset,

    // Update propagation
    /// Update pushed to descendants
    UpdatePushed,
    /// Update received and cached
    UpdateReceived,
    /// Newer payload adopted from a descendant
    SyncAdopted,
    /// Local payload kept after sync
    SyncKeptLocal,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "LIGHTHOUSE_STARTUP_BEGIN",
            Event::Serving => "LIGHTHOUSE_SERVING",
            Event::ShutdownStart => "SHUTDOWN_BEGIN",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigRejected => "CONFIG_REJECTED",

            Event::MainStarted => "MAIN_STARTED",
            Event::MainStopped => "MAIN_STOPPED",
            Event::TempStatusSet => "TEMP_STATUS_SET",
            Event::TempStatusExpired => "TEMP_STATUS_EXPIRED",
            Event::CallbackFailed => "CALLBACK_FAILED",

            Event::ParentProbe => "PARENT_PROBE",
            Event::ParentDown => "PARENT_DOWN",
            Event::DescendantsDiscovered => "DESCENDANTS_DISCOVERED",
            Event::PeerUnreachable => "PEER_UNREACHABLE",

            Event::PromotionBegin => "PROMOTION_BEGIN",
            Event::PromotionConflict => "PROMOTION_CONFLICT",
            Event::PromotionComplete => "PROMOTION_COMPLETE",
            Event::TopologyNoticeSent => "TOPOLOGY_NOTICE_SENT",
            Event::TopologyNoticeReceived => "TOPOLOGY_NOTICE_RECEIVED",
            Event::DescendantsReset => "DESCENDANTS_RESET",

            Event::UpdatePushed => "UPDATE_PUSHED",
            Event::UpdateReceived => "UPDATE_RECEIVED",
            Event::SyncAdopted => "SYNC_ADOPTED",
            Event::SyncKeptLocal => "SYNC_KEPT_LOCAL",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ConfigRejected)
    }

    /// Returns true if this event describes a degraded but non-fatal condition
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::CallbackFailed
                | Event::ParentDown
                | Event::PeerUnreachable
                | Event::PromotionConflict
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
