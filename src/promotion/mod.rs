//! Promotion
//!
//! Standby to acting-active transition, the liveness check that gates it,
//! and the topology notices that follow it.

mod coordinator;
mod observability;

pub use coordinator::{NoticeReport, PromotionCoordinator, PromotionReport};
pub use observability::{PromotionEvent, PromotionObserver};
