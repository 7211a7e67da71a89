//! # Lighthouse HTTP Server Module
//!
//! The control surface every node exposes to operators and peers.
//!
//! # Endpoints
//!
//! - `/status`, `/reset`, `/stop`, `/temp-status` - status state machine
//! - `/update`, `/sync`, `/push` - update propagation
//! - `/topology` - topology-changed notice from a new parent
//! - `/health`, `/metrics` - observability

pub mod config;
pub mod control_routes;
mod errors;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
