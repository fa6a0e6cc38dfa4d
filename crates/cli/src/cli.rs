//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Streams - subscribe to simulated sensor streams from a scenario file
#[derive(Parser, Debug)]
#[command(
    name = "sensor-streams",
    author,
    version,
    about = "Sensor stream subscription runner",
    long_about = "Spawns the sensors of a scenario against the mock simulator, subscribes \n\
                  their primary and GBuffer streams, toggles ROS forwarding, and reports \n\
                  per-stream delivery statistics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_STREAMS_VERBOSE")]
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
        env = "SENSOR_STREAMS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn sensors and consume their streams
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "scenario.toml",
        env = "SENSOR_STREAMS_CONFIG"
    )]
    pub config: PathBuf,

    /// Override simulator host from configuration
    #[arg(long, env = "SENSOR_STREAMS_HOST")]
    pub host: Option<String>,

    /// Override simulator port from configuration
    #[arg(long, env = "SENSOR_STREAMS_PORT")]
    pub port: Option<u16>,

    /// Run duration in seconds (0 = until Ctrl+C or packet limit)
    #[arg(long, default_value = "10", env = "SENSOR_STREAMS_DURATION")]
    pub duration: u64,

    /// Stop after this many consumed packets (0 = unlimited)
    #[arg(long, default_value = "0", env = "SENSOR_STREAMS_MAX_PACKETS")]
    pub max_packets: u64,

    /// Capacity of the callback-to-consumer queue
    #[arg(long, default_value = "256", env = "SENSOR_STREAMS_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SENSOR_STREAMS_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without spawning sensors
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "scenario.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "scenario.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the subscription plan of every sensor
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
