//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// hl-sensors - HoloLens multi-sensor capture, pairing, streaming and recording
#[derive(Parser, Debug)]
#[command(
    name = "hl-sensors",
    author,
    version,
    about = "HoloLens multi-sensor frame capture",
    long_about = "Opens the photo/video and research-mode source groups, pairs frames \n\
                  of different sensors by timestamp, and streams or records them."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HL_SENSORS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HL_SENSORS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a capture session against the mock device
    Run(RunArgs),

    /// Connect to a streaming server and print received frames
    Receive(ReceiveArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and sensor information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "HL_SENSORS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after this many synced pairs (0 = unlimited)
    #[arg(long, default_value = "0", env = "HL_SENSORS_MAX_PAIRS")]
    pub max_pairs: u64,

    /// Session timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "HL_SENSORS_TIMEOUT")]
    pub timeout: u64,

    /// Record into this directory, overriding the configuration
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Stream every captured sensor on its default port
    #[arg(long)]
    pub stream: bool,

    /// Metrics server port, overriding the configuration (0 = disabled)
    #[arg(long, env = "HL_SENSORS_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `receive` command
#[derive(Parser, Debug, Clone)]
pub struct ReceiveArgs {
    /// Address of the streaming server
    #[arg(short, long, default_value = "127.0.0.1:23940")]
    pub addr: SocketAddr,

    /// Stop after this many frames (0 = until the server disconnects)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Print one JSON object per frame
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the sensor catalogue
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
