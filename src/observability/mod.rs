//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Monotonic failover counters
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only: it describes decisions, never makes them
//! 2. A logging failure never fails the operation being logged
//!
//! # Usage
//!
//! ```ignore
//! use lighthouse::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ParentDown, &[("parent", "10.0.0.1:8080")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Severity an event is logged at when no explicit level is given.
pub fn default_severity(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(default_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(default_severity(event), event.as_str(), fields);
}
