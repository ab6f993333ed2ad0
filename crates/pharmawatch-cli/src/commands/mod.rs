mod report;
mod sources;
mod universe;
mod watch;

use std::process::ExitCode;

use pharmawatch_core::{
    adapter_for, load_settings, Aggregation, Aggregator, HistoryFetcher, Period, Settings,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Output;

/// Exit code for an aggregation that produced no usable instrument.
const EMPTY_RESULT_EXIT: u8 = 3;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        settings.provider = source.into();
    }
    let output = Output {
        format: cli.format,
        pretty: cli.pretty,
    };

    match &cli.command {
        Command::Report(args) => report::run(args, settings, output).await,
        Command::Watch(args) => watch::run(args, settings, output).await,
        Command::Universe => universe::run(&settings, output),
        Command::Sources => sources::run(&settings, output),
    }
}

/// Applies command-line overrides on top of the loaded settings.
fn apply_overrides(
    settings: &mut Settings,
    period: Option<Period>,
    max_attempts: Option<u32>,
) -> Result<(), CliError> {
    if let Some(period) = period {
        settings.period = period;
    }
    if let Some(max_attempts) = max_attempts {
        settings.retry.max_attempts = max_attempts;
    }
    settings.validate()?;
    Ok(())
}

/// Uncached aggregator for the selected provider; `watch` attaches its cache.
fn build_aggregator(settings: &Settings) -> Aggregator {
    let fetcher =
        HistoryFetcher::new(adapter_for(settings.provider)).with_config(settings.retry_config());
    let aggregator = Aggregator::new(fetcher);

    match settings.max_concurrency {
        Some(max_concurrency) => aggregator.with_max_concurrency(max_concurrency),
        None => aggregator,
    }
}

fn render(aggregation: &Aggregation, output: Output) -> Result<ExitCode, CliError> {
    match aggregation {
        Aggregation::Ready(report) => {
            output.report(report)?;
            Ok(ExitCode::SUCCESS)
        }
        Aggregation::Empty(empty) => {
            output.empty(empty)?;
            Ok(ExitCode::from(EMPTY_RESULT_EXIT))
        }
    }
}
