//! CLI argument definitions for PharmaWatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `report` | Rank the universe over one period (always fetches fresh data) |
//! | `watch` | Re-run the report on an interval |
//! | `universe` | List configured instruments |
//! | `sources` | List provider policies |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--source` | from config (`yahoo`) | Data provider |
//! | `--config` | `pharmawatch.toml` | Configuration file |
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `-v` | off | Log verbosity (`-v` info, `-vv` debug) |
//!
//! # Examples
//!
//! ```bash
//! # One-year ranking from Yahoo Finance
//! pharmawatch report
//!
//! # Offline demo data as JSON
//! pharmawatch --source demo --format json --pretty report --period 6mo
//!
//! # Refresh every five minutes, three times
//! pharmawatch watch --every 300 --iterations 3
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pharmawatch_core::{Period, ProviderId};

/// Stock performance aggregator for NSE pharmaceutical equities.
#[derive(Debug, Parser)]
#[command(
    name = "pharmawatch",
    author,
    version,
    about = "Stock performance aggregator for NSE pharmaceutical equities"
)]
pub struct Cli {
    /// Data provider; overrides the configured one.
    #[arg(long, global = true, value_enum)]
    pub source: Option<SourceSelector>,

    /// Configuration file (defaults to ./pharmawatch.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Increase log verbosity; repeat for more.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text for terminal display.
    Table,
    /// Single JSON document.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelector {
    /// Yahoo Finance chart API.
    Yahoo,
    /// Alpha Vantage daily series (paced to the free tier).
    Alphavantage,
    /// Seeded synthetic data; no network.
    Demo,
}

impl From<SourceSelector> for ProviderId {
    fn from(value: SourceSelector) -> Self {
        match value {
            SourceSelector::Yahoo => ProviderId::Yahoo,
            SourceSelector::Alphavantage => ProviderId::Alphavantage,
            SourceSelector::Demo => ProviderId::Demo,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, rank and summarize the universe once.
    Report(ReportArgs),
    /// Re-run the report on a fixed interval, sharing one cache.
    Watch(WatchArgs),
    /// Print the configured instruments and provider symbols.
    Universe,
    /// Print each provider's concurrency, pacing and retry policy.
    Sources,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Period: 1mo, 3mo, 6mo, 1y, 2y or 5y.
    #[arg(long)]
    pub period: Option<Period>,

    /// Attempts per instrument, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Period: 1mo, 3mo, 6mo, 1y, 2y or 5y.
    #[arg(long)]
    pub period: Option<Period>,

    /// Seconds between runs.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub every: u64,

    /// Stop after this many runs; runs until interrupted when omitted.
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Attempts per instrument, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pharmawatch",
            "report",
            "--period",
            "6mo",
            "--source",
            "demo",
            "--format",
            "json",
            "-vv",
        ])
        .expect("valid arguments");

        assert_eq!(cli.source, Some(SourceSelector::Demo));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Report(args) => {
                assert_eq!(args.period, Some(Period::SixMonths));
                assert_eq!(args.max_attempts, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_period() {
        let error = Cli::try_parse_from(["pharmawatch", "report", "--period", "10y"])
            .expect_err("invalid period");
        assert!(error.to_string().contains("10y"));
    }

    #[test]
    fn watch_interval_must_be_positive() {
        assert!(Cli::try_parse_from(["pharmawatch", "watch", "--every", "0"]).is_err());
    }
}
