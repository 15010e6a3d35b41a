//! CLI argument definitions using clap
//!
//! Commands:
//! - islandrelay start [--config <path>] [--bind <addr>]
//! - islandrelay check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Island relay - real-time broadcast relay for islands and posts
#[derive(Parser, Debug)]
#[command(name = "islandrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the relay server
    Start {
        /// Path to configuration file (defaults are used when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Validate a configuration file and print the effective config
    CheckConfig {
        /// Path to configuration file
        #[arg(long)]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
