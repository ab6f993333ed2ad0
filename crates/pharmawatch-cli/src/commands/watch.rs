use std::process::ExitCode;
use std::time::Duration;

use pharmawatch_core::{Aggregator, CacheMode, CacheStore, Settings};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::Output;

/// Re-runs the aggregation every `args.every` seconds against one shared cache.
///
/// Ctrl-C during a run drops the in-flight aggregation, which aborts its
/// fetches; the exit code is that of the last completed run.
pub async fn run(
    args: &WatchArgs,
    mut settings: Settings,
    output: Output,
) -> Result<ExitCode, CliError> {
    super::apply_overrides(&mut settings, args.period, args.max_attempts)?;
    let universe = settings.universe()?;

    let cache = CacheStore::new(settings.cache_ttl());
    let aggregator = aggregator(&settings, cache.clone());

    let mut ticker = tokio::time::interval(Duration::from_secs(args.every));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut runs = 0_u32;
    let mut last = ExitCode::SUCCESS;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        runs += 1;
        cache.clear_expired().await;
        info!(run = runs, period = %settings.period, "refreshing");

        let aggregation = tokio::select! {
            aggregation = aggregator.aggregate(&universe, settings.period) => aggregation,
            _ = tokio::signal::ctrl_c() => {
                warn!(run = runs, "interrupted; in-flight fetches cancelled");
                break;
            }
        };

        if runs > 1 && output.format == OutputFormat::Table {
            crate::output::write_stdout("\n")?;
        }
        last = super::render(&aggregation, output)?;

        if args.iterations.is_some_and(|limit| runs >= limit) {
            break;
        }
    }

    Ok(last)
}

/// Aggregator reading and writing `cache` across runs.
pub(super) fn aggregator(settings: &Settings, cache: CacheStore) -> Aggregator {
    super::build_aggregator(settings).with_cache(cache, CacheMode::Use)
}
