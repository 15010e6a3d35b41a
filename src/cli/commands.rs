//! CLI command implementations
//!
//! `start` boots a tokio runtime and serves until Ctrl-C.
//! `check-config` validates a config file without binding anything.

use std::fs;
use std::path::Path;

use crate::observability::{log_event, log_event_with_fields, Event};
use crate::relay::{RelayConfig, RelayServer};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> CliResult<RelayConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

    let config: RelayConfig = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &RelayConfig) -> CliResult<()> {
    config.socket_addr()?;
    Ok(())
}

/// Resolve the effective config from an optional file and bind override
pub fn resolve_config(path: Option<&Path>, bind: Option<String>) -> CliResult<RelayConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    if let Some(bind) = bind {
        config.bind_addr = bind;
    }

    validate(&config)?;
    Ok(config)
}

/// Parse CLI args and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { config, bind } => start(config.as_deref(), bind),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Start the relay and serve until Ctrl-C
pub fn start(config_path: Option<&Path>, bind: Option<String>) -> CliResult<()> {
    log_event(Event::BootStart);

    let config = resolve_config(config_path, bind)?;
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("bind_addr", config.bind_addr.as_str()),
            ("log_messages", if config.log_messages { "true" } else { "false" }),
        ],
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let server = match RelayServer::bind(config).await {
            Ok(server) => server,
            Err(e) => {
                log_event_with_fields(Event::BindFailed, &[("error", e.to_string().as_str())]);
                return Err(CliError::from(e));
            }
        };

        let shutdown = server.shutdown_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log_event(Event::ShutdownStart);
                shutdown.shutdown();
            }
        });

        server.run().await?;

        let metrics = server.state().metrics().snapshot().to_json();
        log_event_with_fields(Event::ShutdownComplete, &[("metrics", metrics.as_str())]);
        Ok::<(), CliError>(())
    })
}

/// Validate a config file and print the effective config
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    println!("{}", json);
    Ok(())
}
