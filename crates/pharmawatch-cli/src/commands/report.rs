use std::process::ExitCode;

use pharmawatch_core::Settings;
use tracing::info;

use crate::cli::ReportArgs;
use crate::error::CliError;
use crate::output::Output;

pub async fn run(
    args: &ReportArgs,
    mut settings: Settings,
    output: Output,
) -> Result<ExitCode, CliError> {
    super::apply_overrides(&mut settings, args.period, args.max_attempts)?;
    let universe = settings.universe()?;

    // One run reads each series once; no cache.
    let aggregator = super::build_aggregator(&settings);

    info!(
        provider = %settings.provider,
        period = %settings.period,
        instruments = universe.len(),
        "running report"
    );
    let aggregation = aggregator.aggregate(&universe, settings.period).await;
    super::render(&aggregation, output)
}
