//! Status State Machine
//!
//! The authoritative in-memory record of whether this node runs the
//! supervised workload, and in which mode it operates.

mod machine;
mod state;

pub use machine::{StatusMachine, StopReason};
pub use state::{deadline, OperatingMode, Status};
