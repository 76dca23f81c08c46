//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Batch Relay - debounced batch upload of error reports
#[derive(Parser, Debug)]
#[command(
    name = "batch-relay",
    author,
    version,
    about = "Debounced batch relay for error reports",
    long_about = "Reads error reports from stdin, one per line, and relays them to the \n\
                  configured sinks in batches.\n\n\
                  Reports arriving close together are coalesced and delivered after a \n\
                  quiet delay. Lines are parsed as JSON reports, or taken as plain text."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCH_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCH_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relay reports read from stdin
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
    #[arg(short, long, default_value = "relay.toml", env = "BATCH_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the quiet delay from configuration (milliseconds)
    #[arg(long, env = "BATCH_RELAY_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Component name stamped on reports that do not carry one
    #[arg(long, env = "BATCH_RELAY_SOURCE")]
    pub source: Option<String>,

    /// Stop reading input after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "BATCH_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without relaying
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCH_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "batch-relay",
            "-v",
            "run",
            "--config",
            "relay.json",
            "--delay-ms",
            "250",
            "--source",
            "collector",
        ]);
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("relay.json"));
        assert_eq!(args.delay_ms, Some(250));
        assert_eq!(args.source.as_deref(), Some("collector"));
        assert_eq!(args.timeout, 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["batch-relay", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
