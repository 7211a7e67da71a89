//! CLI command implementations
//!
//! `start` builds an engine whose handlers only log: the supervised
//! workload is expected to be wired in by embedding the library. The other
//! commands are thin clients with no authority.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::callbacks::HandlerRegistry;
use crate::engine::Lighthouse;
use crate::observability::{Logger, MetricsRegistry};
use crate::peer::PeerClient;
use crate::registry::NodeConfig;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { config } => start(&config),
        Command::Validate { config } => validate(&config),
        Command::Status { addr, timeout_ms } => status(&addr, Duration::from_millis(timeout_ms)),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Handlers that record each callback in the log and always succeed.
pub fn logging_handlers() -> HandlerRegistry {
    HandlerRegistry::new()
        .on_start(|ctx| {
            let port = ctx.port.map(|p| p.to_string()).unwrap_or_default();
            Logger::info(
                "WORKLOAD_START",
                &[("self", ctx.self_addr.as_str()), ("port", port.as_str())],
            );
            Ok(())
        })
        .on_stop(|message| {
            Logger::info("WORKLOAD_STOP", &[("message", message.unwrap_or(""))]);
            Ok(())
        })
        .on_update(|payload| {
            Logger::info("WORKLOAD_UPDATE", &[("payload", payload.to_string().as_str())]);
            Ok(())
        })
}

/// Run a node until Ctrl-C
pub fn start(config_path: &Path) -> CliResult<()> {
    let engine = Lighthouse::from_config_file(config_path, logging_handlers())?;

    runtime()?.block_on(engine.run())?;
    Ok(())
}

/// Load and validate, print the resolved configuration
pub fn validate(config_path: &Path) -> CliResult<()> {
    let config = NodeConfig::load(config_path).map_err(|e| CliError::config_error(e.to_string()))?;
    write_json(&json!({
        "valid": true,
        "config": config,
    }))
}

/// Print a node's `/status`
pub fn status(addr: &str, timeout: Duration) -> CliResult<()> {
    let client = PeerClient::new(timeout, Arc::new(MetricsRegistry::new()))?;
    let report = runtime()?.block_on(client.fetch_status(addr))?;
    write_json(&report)
}
