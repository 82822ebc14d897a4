//! CLI argument parsing definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Accept one connection and print every message it carries (guest side)
    Receive {
        /// TCP address to listen on
        #[arg(long, value_name = "ADDR", conflicts_with = "vsock_port")]
        listen: Option<String>,

        /// vsock port to listen on
        #[arg(long, value_name = "PORT")]
        vsock_port: Option<u32>,

        /// Print raw payloads instead of decoding manager messages
        #[arg(long)]
        raw: bool,
    },

    /// Send a computation to a guest and wait for its acknowledgment (host side)
    Send {
        /// TCP address to connect to
        #[arg(long, value_name = "ADDR", conflicts_with_all = ["vsock_cid", "vsock_port"])]
        connect: Option<String>,

        /// vsock context ID of the guest
        #[arg(long, value_name = "CID")]
        vsock_cid: Option<u32>,

        /// vsock port of the guest
        #[arg(long, value_name = "PORT")]
        vsock_port: Option<u32>,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Computation name
        #[arg(long, value_name = "NAME", default_value = "cli-computation")]
        name: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Algorithm bytes to upload
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Read the algorithm from a file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Use the given text as the algorithm
    #[arg(long, value_name = "STRING")]
    pub text: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Print a sample configuration with every default filled in
    Generate,
}
