//! Behaviour tests for universe aggregation: ranking, summary, partial
//! failures, caching and the bounded fetch pool.

mod support;

use std::sync::Arc;
use std::time::Duration;

use pharmawatch_core::{
    Aggregation, Aggregator, CacheKey, CacheMode, CacheStore, DemoAdapter, HistoryFetcher, Period,
    PriceRecord, PriceSeries, SkipReason, SourceError, Universe, ZeroReason,
};
use support::{fetcher, series_ending, symbol, universe, ScriptedSource};
use time::macros::date;

const AS_OF: time::Date = date!(2024 - 06 - 28);

fn three_stock_source() -> ScriptedSource {
    ScriptedSource::new()
        .always("AAA", Ok(series_ending(AS_OF, &[100.0, 104.0, 110.0])))
        .always("BBB", Ok(series_ending(AS_OF, &[200.0, 195.0, 190.0])))
        .always("CCC", Ok(series_ending(AS_OF, &[50.0, 50.5, 51.0])))
}

fn three_stock_universe() -> Universe {
    universe(&[("AAA", "Alpha"), ("BBB", "Beta"), ("CCC", "Gamma")])
}

// =============================================================================
// Aggregation: ranking and summary
// =============================================================================

#[tokio::test]
async fn when_every_fetch_succeeds_report_ranks_and_summarizes() {
    // Given: three instruments moving +10%, -5% and +2%
    let source = Arc::new(three_stock_source());
    let aggregator = Aggregator::new(fetcher(source, 3));

    // When: the universe is aggregated over one month
    let aggregation = aggregator
        .aggregate(&three_stock_universe(), Period::OneMonth)
        .await;

    // Then: records keep universe order and the summary picks the extremes
    let report = aggregation.into_result().expect("report");
    let names = report
        .records
        .iter()
        .map(|record| record.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    assert!((report.records[0].percent_change - 10.0).abs() < 1e-9);
    assert!((report.records[1].percent_change + 5.0).abs() < 1e-9);
    assert!((report.records[2].percent_change - 2.0).abs() < 1e-9);
    assert_eq!(report.records[0].current_price, 110.0);

    assert_eq!(report.summary.best.display_name, "Alpha");
    assert_eq!(report.summary.worst.display_name, "Beta");
    assert!((report.summary.average - 7.0 / 3.0).abs() < 1e-9);

    let ranked = report
        .ranked()
        .map(|record| record.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ranked, vec!["Alpha", "Gamma", "Beta"]);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn when_changes_tie_first_instrument_in_universe_wins() {
    // Given: two instruments with identical +5% moves
    let source = Arc::new(
        ScriptedSource::new()
            .always("AAA", Ok(series_ending(AS_OF, &[100.0, 105.0])))
            .always("BBB", Ok(series_ending(AS_OF, &[40.0, 38.0])))
            .always("CCC", Ok(series_ending(AS_OF, &[20.0, 21.0]))),
    );

    // When: aggregated
    let report = Aggregator::new(fetcher(source, 1))
        .aggregate(&three_stock_universe(), Period::OneMonth)
        .await
        .into_result()
        .expect("report");

    // Then: best is the first-seen maximum and ranking keeps universe order
    assert_eq!(report.summary.best.display_name, "Alpha");
    assert_eq!(report.ranking, vec![0, 2, 1]);
}

#[tokio::test]
async fn when_history_exceeds_window_change_starts_at_window_edge() {
    // Given: 400 days of history whose first close is far below the window start
    let mut closes = vec![10.0; 369];
    closes.extend(std::iter::repeat(100.0).take(30));
    closes.push(120.0);
    let source = Arc::new(ScriptedSource::new().always("AAA", Ok(series_ending(AS_OF, &closes))));
    let universe = universe(&[("AAA", "Alpha")]);

    // When: aggregated over one month
    let report = Aggregator::new(fetcher(source, 1))
        .aggregate(&universe, Period::OneMonth)
        .await
        .into_result()
        .expect("report");

    // Then: only the trailing 30-day window is measured
    let record = &report.records[0];
    assert_eq!(record.series.len(), 31);
    assert!((record.percent_change - 20.0).abs() < 1e-9);
    assert_eq!(record.normalized.first().map(|point| point.value), Some(100.0));
}

// =============================================================================
// Aggregation: partial and total failure
// =============================================================================

#[tokio::test]
async fn when_one_instrument_keeps_failing_it_is_skipped_and_others_report() {
    // Given: BBB is unavailable on every attempt
    let source = Arc::new(
        three_stock_source().always("BBB", Err(SourceError::unavailable("upstream down"))),
    );

    // When: aggregated with three attempts per instrument
    let aggregation = Aggregator::new(fetcher(source.clone(), 3))
        .aggregate(&three_stock_universe(), Period::OneMonth)
        .await;

    // Then: BBB is reported as skipped after exhausting its attempts
    let report = aggregation.into_result().expect("partial report");
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.summary.worst.display_name, "Gamma");
    assert_eq!(source.calls("BBB"), 3);

    assert_eq!(report.skipped.len(), 1);
    let skipped = &report.skipped[0];
    assert_eq!(skipped.display_name, "Beta");
    assert!(matches!(
        &skipped.reason,
        SkipReason::FetchFailed { attempts: 3, code: "source.unavailable", .. }
    ));
}

#[tokio::test]
async fn when_every_instrument_fails_result_is_empty_with_reasons() {
    // Given: a source that knows none of the symbols
    let source = Arc::new(ScriptedSource::new());

    // When: aggregated
    let aggregation = Aggregator::new(fetcher(source.clone(), 3))
        .aggregate(&three_stock_universe(), Period::OneYear)
        .await;

    // Then: the caller gets the empty marker, not a report of zeros
    assert!(aggregation.is_empty());
    let Aggregation::Empty(empty) = aggregation else {
        panic!("expected empty result");
    };
    assert_eq!(empty.period, Period::OneYear);
    assert_eq!(empty.skipped.len(), 3);
    // Invalid requests are terminal, so each symbol is tried once.
    assert_eq!(source.total_calls(), 3);
    assert!(empty.to_string().contains("no data available"));
}

// =============================================================================
// Aggregation: concurrency and caching
// =============================================================================

#[tokio::test]
async fn fetches_never_exceed_the_concurrency_bound() {
    // Given: six slow instruments and a pool of two workers
    let mut source = ScriptedSource::new().with_delay(Duration::from_millis(20));
    let mut entries = Vec::new();
    for symbol in ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"] {
        source = source.always(symbol, Ok(series_ending(AS_OF, &[10.0, 11.0])));
        entries.push((symbol, symbol));
    }
    let source = Arc::new(source);

    // When: aggregated
    let report = Aggregator::new(fetcher(source.clone(), 1))
        .with_max_concurrency(2)
        .aggregate(&universe(&entries), Period::OneMonth)
        .await
        .into_result()
        .expect("report");

    // Then: every instrument was fetched once, at most two at a time
    assert_eq!(report.records.len(), 6);
    assert_eq!(source.total_calls(), 6);
    assert!(source.peak_in_flight() <= 2);
    assert!(source.peak_in_flight() >= 1);
}

#[tokio::test]
async fn cached_histories_are_reused_until_refresh() {
    // Given: an aggregator sharing a cache across runs
    let source = Arc::new(three_stock_source());
    let cache = CacheStore::with_default_ttl();
    let aggregator = Aggregator::new(fetcher(source.clone(), 1)).with_cache(cache.clone(), CacheMode::Use);
    let universe = three_stock_universe();

    // When: the same request runs twice
    let first = aggregator.aggregate(&universe, Period::OneMonth).await;
    let second = aggregator.aggregate(&universe, Period::OneMonth).await;

    // Then: the second run is served from cache
    assert_eq!(source.total_calls(), 3);
    assert!(first.report().expect("report").records.iter().all(|r| !r.from_cache));
    assert!(second.report().expect("report").records.iter().all(|r| r.from_cache));
    assert_ne!(
        first.report().map(|report| report.request_id),
        second.report().map(|report| report.request_id)
    );

    // When: a refresh is forced
    let refreshed = aggregator
        .clone()
        .with_cache_mode(CacheMode::Refresh)
        .aggregate(&universe, Period::OneMonth)
        .await;

    // Then: every instrument is fetched again
    assert_eq!(source.total_calls(), 6);
    assert!(refreshed.report().expect("report").records.iter().all(|r| !r.from_cache));
    assert_eq!(cache.len().await, 3);
}

#[tokio::test]
async fn older_request_never_overwrites_a_newer_cache_entry() {
    // Given: two aggregators sharing one cache; the first one's provider is slow
    let cache = CacheStore::with_default_ttl();
    let stale_series = series_ending(AS_OF, &[100.0, 101.0]);
    let fresh_series = series_ending(AS_OF, &[100.0, 120.0]);
    let slow = Aggregator::new(fetcher(
        Arc::new(
            ScriptedSource::new()
                .with_delay(Duration::from_millis(200))
                .always("AAA", Ok(stale_series.clone())),
        ),
        1,
    ))
    .with_cache(cache.clone(), CacheMode::Refresh);
    let fast = Aggregator::new(fetcher(
        Arc::new(ScriptedSource::new().always("AAA", Ok(fresh_series.clone()))),
        1,
    ))
    .with_cache(cache.clone(), CacheMode::Refresh);
    let universe = universe(&[("AAA", "Alpha")]);

    // When: the slow request starts first and the fast one finishes before it
    let older = {
        let universe = universe.clone();
        tokio::spawn(async move { slow.aggregate(&universe, Period::OneMonth).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let newer = fast.aggregate(&universe, Period::OneMonth).await;
    let older = older.await.expect("older aggregation completes");

    // Then: each report reflects its own fetch, but the cache keeps the newer series
    assert!((newer.report().expect("report").records[0].percent_change - 20.0).abs() < 1e-9);
    assert!((older.report().expect("report").records[0].percent_change - 1.0).abs() < 1e-9);
    let cached = cache
        .get(&CacheKey::new(symbol("AAA"), Period::OneMonth))
        .await
        .expect("slot filled");
    assert_eq!(cached, fresh_series);
}

// =============================================================================
// Aggregation: unusable series
// =============================================================================

#[tokio::test]
async fn series_with_non_positive_first_close_is_skipped_as_invalid() {
    // Given: one healthy instrument and one whose first close is zero
    let zero_base = PriceSeries::new(vec![
        PriceRecord {
            date: date!(2024 - 06 - 27),
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0,
        },
        PriceRecord::close_only(AS_OF, 12.0, 10).expect("valid record"),
    ])
    .expect("dates increase");
    let source = Arc::new(
        ScriptedSource::new()
            .always("AAA", Ok(series_ending(AS_OF, &[100.0, 110.0])))
            .always("ZZZ", Ok(zero_base)),
    );
    let aggregator = Aggregator::new(fetcher(source, 3));

    // When: the universe is aggregated
    let report = aggregator
        .aggregate(&universe(&[("AAA", "Alpha"), ("ZZZ", "Zeta")]), Period::OneMonth)
        .await
        .into_result()
        .expect("healthy instrument still reports");

    // Then: the zero-base series is reported as invalid, not ranked as flat
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].display_name, "Alpha");
    assert_eq!(report.ranking, vec![0]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].display_name, "Zeta");
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::InvalidSeries {
            detail: ZeroReason::NonPositiveBase
        }
    );
}

// =============================================================================
// Aggregation: demo universe end to end
// =============================================================================

#[tokio::test]
async fn demo_universe_reproduces_reference_figures() {
    // Given: the seeded demo source and the built-in universe
    let source = Arc::new(DemoAdapter::new(AS_OF, 7));
    let aggregator = Aggregator::new(HistoryFetcher::new(source));

    // When: aggregated over one year
    let report = aggregator
        .aggregate(&Universe::nse_pharma(), Period::OneYear)
        .await
        .into_result()
        .expect("demo report");

    // Then: Divi's leads, Cipla trails, and the mean matches the reference table
    assert_eq!(report.records.len(), 6);
    assert_eq!(report.summary.best.display_name, "Divi's Laboratories");
    assert_eq!(report.summary.worst.display_name, "Cipla");
    assert!((report.summary.average - 104.92 / 6.0).abs() < 1e-6);

    let comparison = report.comparison();
    assert_eq!(comparison.len(), 6);
    assert!(comparison
        .iter()
        .all(|line| line.points.first().map(|point| point.value) == Some(100.0)));

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["period"], "1y");
    assert_eq!(json["records"][0]["display_name"], "Sun Pharma");
    assert_eq!(json["records"][0]["series"][251]["date"], "2024-06-28");
}
