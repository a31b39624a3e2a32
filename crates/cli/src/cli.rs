//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensors VTS - conformance suite for sensors HAL implementations
#[derive(Parser, Debug)]
#[command(
    name = "sensors-vts",
    author,
    version,
    about = "Sensors HAL conformance suite",
    long_about = "Drives a sensors HAL through its control surface and checks the\n\
                  behavioural contract: event delivery timing, flush semantics,\n\
                  batching, direct report and error codes for invalid input."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSORS_VTS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "SENSORS_VTS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the conformance suite
    Run(RunArgs),

    /// List test cases without running them
    List(ListArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "SENSORS_VTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only run cases whose name contains one of these substrings
    #[arg(short, long, value_delimiter = ',', env = "SENSORS_VTS_FILTER")]
    pub filter: Vec<String>,

    /// Metrics server port (overrides configuration)
    #[arg(long, env = "SENSORS_VTS_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list cases whose name contains one of these substrings
    #[arg(short, long, value_delimiter = ',')]
    pub filter: Vec<String>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sensors-vts.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_filter_splits_on_commas() {
        let cli = Cli::parse_from(["sensors-vts", "run", "--filter", "Flush,NoStale"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.filter, vec!["Flush", "NoStale"]);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sensors-vts", "-q", "-v", "list"]).is_err());
    }
}
