//! CLI argument definitions using clap
//!
//! Commands:
//! - lighthouse start --config <path>
//! - lighthouse validate --config <path>
//! - lighthouse status --addr <host:port>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lighthouse - failover coordination for a chain of nodes
#[derive(Parser, Debug)]
#[command(name = "lighthouse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a node until Ctrl-C
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./lighthouse.json")]
        config: PathBuf,
    },

    /// Load and validate a configuration, then print it resolved
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./lighthouse.json")]
        config: PathBuf,
    },

    /// Query a node's /status and print it
    Status {
        /// Node address as host:port
        #[arg(long)]
        addr: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
