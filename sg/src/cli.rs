//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Skyglow - nighttime-light monitoring loop
#[derive(Parser)]
#[command(
    name = "sg",
    about = "Nighttime-light radiance monitoring: sense, reason, act, learn",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one Sense -> Reason -> Act -> Learn cycle
    Cycle {
        /// Period label for the cycle (defaults to today's date)
        #[arg(short, long)]
        period: Option<String>,

        /// Shielding percentage for an accompanying mitigation estimate
        #[arg(long, requires = "retrofit_pct")]
        shielding_pct: Option<f64>,

        /// Retrofit percentage for an accompanying mitigation estimate
        #[arg(long, requires = "shielding_pct")]
        retrofit_pct: Option<f64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the loop state snapshot and alert counts
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List alerts
    Alerts {
        /// Only alerts awaiting dispatch
        #[arg(short, long)]
        unsent: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show recent cycle events
    Events {
        /// Number of events to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Dispatch notifications for unsent alerts
    Notify {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Estimate the radiance drop for proposed mitigations
    Estimate {
        /// Shielding coverage in percent [0-100]
        #[arg(long)]
        shielding_pct: f64,

        /// Fixture retrofit coverage in percent [0-100]
        #[arg(long)]
        retrofit_pct: f64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Populate the store with a deterministic synthetic dataset
    Seed {
        /// Seed value for the generator
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_estimate_args() {
        let cli = Cli::parse_from([
            "sg",
            "estimate",
            "--shielding-pct",
            "40",
            "--retrofit-pct",
            "20",
        ]);
        match cli.command {
            Command::Estimate {
                shielding_pct,
                retrofit_pct,
                format,
            } => {
                assert_eq!(shielding_pct, 40.0);
                assert_eq!(retrofit_pct, 20.0);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected estimate command"),
        }
    }

    #[test]
    fn test_seed_default() {
        let cli = Cli::parse_from(["sg", "seed"]);
        match cli.command {
            Command::Seed { seed } => assert_eq!(seed, 42),
            _ => panic!("expected seed command"),
        }
    }

    #[test]
    fn test_non_numeric_estimate_rejected() {
        let result = Cli::try_parse_from([
            "sg",
            "estimate",
            "--shielding-pct",
            "forty",
            "--retrofit-pct",
            "20",
        ]);
        assert!(result.is_err());
    }
}
