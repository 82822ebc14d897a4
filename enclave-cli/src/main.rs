//! Enclave CLI main entry point

use anyhow::{Context, Result};
use clap::Parser;
use enclave_config::{ConfigLoader, EnclaveConfig, LogLevel};
use tracing::{debug, info, warn};

mod cli;
mod commands;
mod connection;

use cli::{Cli, Commands, ConfigCommands};
use connection::{Endpoint, VMADDR_CID_ANY};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = ConfigLoader::new()
        .load(cli.config.as_ref())
        .context("Failed to load configuration")?;

    init_logging(&config, cli.log_level.as_deref())?;
    debug!("Enclave CLI starting");

    match cli.command {
        Some(Commands::Receive {
            listen,
            vsock_port,
            raw,
        }) => {
            let endpoint = match (listen, vsock_port) {
                (Some(address), _) => Endpoint::Tcp(address),
                (None, Some(port)) => Endpoint::Vsock {
                    cid: VMADDR_CID_ANY,
                    port,
                },
                (None, None) => Endpoint::listen_from_config(&config.connection),
            };
            commands::receive_command(&config, &endpoint, raw).await
        }
        Some(Commands::Send {
            connect,
            vsock_cid,
            vsock_port,
            payload,
            name,
        }) => {
            let endpoint = match (connect, vsock_cid, vsock_port) {
                (Some(address), _, _) => Endpoint::Tcp(address),
                (None, None, None) => Endpoint::from_config(&config.connection),
                (None, cid, port) => Endpoint::Vsock {
                    cid: cid.unwrap_or(config.connection.cid),
                    port: port.unwrap_or(config.connection.port),
                },
            };
            let algorithm =
                commands::load_payload(payload.file.as_deref(), payload.text.as_deref()).await?;
            info!(bytes = algorithm.len(), "Sending computation to {}", endpoint);
            commands::send_command(&config, &endpoint, algorithm, &name).await
        }
        Some(Commands::Config { config_cmd }) => match config_cmd {
            ConfigCommands::Validate { config_file } => {
                commands::config_validate_command(&config_file)
            }
            ConfigCommands::Generate => commands::config_generate_command(),
        },
        None => {
            warn!("No command specified");
            println!("No command specified. Use --help to see available commands.");
            Ok(())
        }
    }
}

/// Initialize logging from configuration, letting `--log-level` override the
/// configured level
fn init_logging(config: &EnclaveConfig, log_level: Option<&str>) -> Result<()> {
    let mut logging_config = config.logging.clone();
    if let Some(level_str) = log_level {
        match level_str.parse::<LogLevel>() {
            Ok(level) => logging_config.level = level,
            Err(e) => eprintln!("{}, keeping '{}'", e, logging_config.level.as_str()),
        }
    }

    if let Err(e) = enclave_logging::init_logging_from_config(&logging_config) {
        // Fall back to simple tracing if structured logging fails
        eprintln!(
            "Failed to initialize structured logging: {}, falling back to simple tracing",
            e
        );
        enclave_logging::init_simple_tracing(logging_config.level.as_str())?;
    }

    Ok(())
}
