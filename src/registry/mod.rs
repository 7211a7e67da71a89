//! Node Registry
//!
//! Who this node is and where it sits in the failover chain.
//!
//! - `NodeConfig` is loaded once and never changes
//! - `Topology` is the live copy of the neighbour addresses, seeded from
//!   the config and owned by the engine state

mod config;
mod errors;
mod topology;

pub use config::{split_host_port, EngineSettings, NodeConfig, Role};
pub use errors::{ConfigError, ConfigErrorKind, ConfigResult};
pub use topology::Topology;
