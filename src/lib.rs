//! lighthouse - best-effort failover coordination for a chain of nodes
//!
//! Exactly one node of the chain is expected to run a supervised workload.
//! Each standby watches its parent and takes over when the parent stops
//! answering, after checking that nobody else already did.
//!
//! ```ignore
//! use lighthouse::{HandlerRegistry, Lighthouse, NodeConfig};
//!
//! let handlers = HandlerRegistry::new()
//!     .on_start(|ctx| { spawn_workload(&ctx.self_addr); Ok(()) })
//!     .on_stop(|_| { kill_workload(); Ok(()) });
//! let engine = Lighthouse::new(NodeConfig::load(path)?, handlers)?;
//! engine.run().await?;
//! ```

pub mod callbacks;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod http_server;
pub mod monitor;
pub mod observability;
pub mod peer;
pub mod promotion;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod status;
pub mod sync;

pub use callbacks::{CallbackSlot, HandlerRegistry, StartContext};
pub use engine::Lighthouse;
pub use errors::{FailoverError, FailoverResult};
pub use registry::{NodeConfig, Role};
pub use status::{OperatingMode, Status};
