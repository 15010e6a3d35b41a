//! CLI module for the relay
//!
//! Provides command-line interface for:
//! - start: Bind the listener and relay until Ctrl-C
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, load_config, resolve_config, run, run_command, start};
pub use errors::{CliError, CliErrorCode, CliResult};
