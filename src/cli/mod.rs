//! CLI module for Lighthouse
//!
//! Provides command-line interface for:
//! - start: run a node until Ctrl-C
//! - validate: check a configuration file
//! - status: query a running node

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{logging_handlers, run, run_command, start, status, validate};
pub use errors::{CliError, CliErrorCode, CliResult};
