//! Universe-wide performance aggregation.
//!
//! The [`Aggregator`] fetches every instrument of a [`Universe`] through a
//! bounded worker pool, restricts each history to the requested window,
//! derives metrics, and ranks the survivors. Instruments that fail at any
//! stage are dropped from the records and reported in `skipped`; only a
//! universe with no usable instrument at all produces [`Aggregation::Empty`].
//!
//! ```text
//! Universe ──▶ [fetch ▸ cache] ──▶ filter_by_period ──▶ compute_metrics
//!                 (JoinSet, bounded)                          │
//!                                                             ▼
//!                                        records (universe order) + ranking
//!                                                             │
//!                                                             ▼
//!                                                  SummaryStats (best/worst/avg)
//! ```

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheMode, CacheStore, Generation};
use crate::filter::filter_by_period;
use crate::metrics::{compute_metrics, MetricsOutcome, NormalizedPoint, ZeroReason};
use crate::retry::{FetchFailure, HistoryFetcher};
use crate::{Instrument, Period, PriceSeries, ProviderId, Symbol, Universe};

/// Derived figures for one instrument within one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    pub symbol: Symbol,
    pub display_name: String,
    pub percent_change: f64,
    pub current_price: f64,
    /// Window-filtered history the figures were computed from.
    pub series: PriceSeries,
    pub normalized: Vec<NormalizedPoint>,
    pub from_cache: bool,
}

/// Best, worst and mean performer of one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub best: PerformanceRecord,
    pub worst: PerformanceRecord,
    pub average: f64,
}

/// Why an instrument is missing from the records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    FetchFailed {
        attempts: u32,
        code: &'static str,
        message: String,
    },
    NoDataInWindow,
    InvalidSeries { detail: ZeroReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInstrument {
    pub symbol: Symbol,
    pub display_name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Base-100 line for the cross-instrument comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonLine {
    pub display_name: String,
    pub points: Vec<NormalizedPoint>,
}

/// Successful aggregation output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub request_id: Uuid,
    pub provider: ProviderId,
    pub period: Period,
    pub generated_at: String,
    /// One record per usable instrument, in universe order.
    pub records: Vec<PerformanceRecord>,
    /// Indices into `records`, percent change descending; ties keep universe order.
    ///
    /// With several records tied for the lowest change, `ranking.last()` is the
    /// last of them while `summary.worst` is the first; read the worst
    /// performer from `summary`, not from the tail of this list.
    pub ranking: Vec<usize>,
    pub summary: SummaryStats,
    pub skipped: Vec<SkippedInstrument>,
}

impl PerformanceReport {
    pub fn ranked(&self) -> impl Iterator<Item = &PerformanceRecord> + '_ {
        self.ranking.iter().map(|index| &self.records[*index])
    }

    pub fn record(&self, display_name: &str) -> Option<&PerformanceRecord> {
        self.records
            .iter()
            .find(|record| record.display_name == display_name)
    }

    /// Normalized lines in universe order.
    pub fn comparison(&self) -> Vec<ComparisonLine> {
        self.records
            .iter()
            .filter(|record| !record.normalized.is_empty())
            .map(|record| ComparisonLine {
                display_name: record.display_name.clone(),
                points: record.normalized.clone(),
            })
            .collect()
    }
}

/// No instrument produced a record; the caller should offer a retry.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("no data available for period {period} from {provider}; {} instrument(s) skipped", .skipped.len())]
pub struct EmptyResult {
    pub request_id: Uuid,
    pub provider: ProviderId,
    pub period: Period,
    pub skipped: Vec<SkippedInstrument>,
}

/// Terminal state of one aggregation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Ready(PerformanceReport),
    Empty(EmptyResult),
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    pub fn report(&self) -> Option<&PerformanceReport> {
        match self {
            Self::Ready(report) => Some(report),
            Self::Empty(_) => None,
        }
    }

    pub fn into_result(self) -> Result<PerformanceReport, EmptyResult> {
        match self {
            Self::Ready(report) => Ok(report),
            Self::Empty(empty) => Err(empty),
        }
    }
}

#[derive(Debug)]
struct Loaded {
    series: PriceSeries,
    from_cache: bool,
}

/// Runs fetch, filter and metrics across a universe.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: HistoryFetcher,
    cache: Option<CacheStore>,
    cache_mode: CacheMode,
    max_concurrency: usize,
}

impl Aggregator {
    /// Concurrency defaults to the source's provider policy; no cache.
    pub fn new(fetcher: HistoryFetcher) -> Self {
        let max_concurrency = fetcher.source().policy().max_concurrency;
        Self {
            fetcher,
            cache: None,
            cache_mode: CacheMode::Bypass,
            max_concurrency,
        }
    }

    pub fn with_cache(mut self, cache: CacheStore, mode: CacheMode) -> Self {
        self.cache = Some(cache);
        self.cache_mode = mode;
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub fn fetcher(&self) -> &HistoryFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    /// Aggregates `universe` over `period`.
    ///
    /// Waits for every fetch to finish (or exhaust its retries) before
    /// ranking. Dropping the returned future aborts outstanding fetches.
    pub async fn aggregate(&self, universe: &Universe, period: Period) -> Aggregation {
        let request_id = Uuid::new_v4();
        let provider = self.fetcher.source_id();
        let generation = self.cache.as_ref().map(CacheStore::begin_request);
        info!(%request_id, %provider, %period, instruments = universe.len(), "aggregation started");

        let loads = self.load_all(universe, period, generation).await;

        let mut records = Vec::with_capacity(universe.len());
        let mut skipped = Vec::new();
        for (instrument, load) in universe.iter().zip(loads) {
            match evaluate(instrument, load, period) {
                Ok(record) => records.push(record),
                Err(skip) => {
                    warn!(%request_id, symbol = %skip.symbol, reason = ?skip.reason, "instrument skipped");
                    skipped.push(skip);
                }
            }
        }

        let Some(summary) = summarize(&records) else {
            warn!(%request_id, %provider, %period, "aggregation produced no records");
            return Aggregation::Empty(EmptyResult {
                request_id,
                provider,
                period,
                skipped,
            });
        };

        let ranking = rank(&records);
        info!(
            %request_id,
            records = records.len(),
            skipped = skipped.len(),
            best = %summary.best.display_name,
            worst = %summary.worst.display_name,
            "aggregation finished"
        );

        Aggregation::Ready(PerformanceReport {
            request_id,
            provider,
            period,
            generated_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            records,
            ranking,
            summary,
            skipped,
        })
    }

    /// One result per universe slot, in universe order.
    async fn load_all(
        &self,
        universe: &Universe,
        period: Period,
        generation: Option<Generation>,
    ) -> Vec<Result<Loaded, FetchFailure>> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency()));
        let mut tasks = JoinSet::new();

        for (index, instrument) in universe.iter().enumerate() {
            let worker = self.clone();
            let permits = Arc::clone(&permits);
            let symbol = instrument.symbol.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let loaded = worker.load(&symbol, period, generation).await;
                (index, loaded)
            });
        }

        let mut slots: Vec<Option<Result<Loaded, FetchFailure>>> =
            (0..universe.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, loaded)) => slots[index] = Some(loaded),
                Err(join_error) => error!(error = %join_error, "fetch worker did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(universe.iter())
            .map(|(slot, instrument)| {
                slot.unwrap_or_else(|| {
                    Err(FetchFailure {
                        symbol: instrument.symbol.clone(),
                        attempts: 0,
                        last_error: crate::SourceError::internal("fetch worker did not complete"),
                    })
                })
            })
            .collect()
    }

    async fn load(
        &self,
        symbol: &Symbol,
        period: Period,
        generation: Option<Generation>,
    ) -> Result<Loaded, FetchFailure> {
        let key = CacheKey::new(symbol.clone(), period);

        if let Some(cache) = self.cache.as_ref().filter(|_| self.cache_mode.reads()) {
            if let Some(series) = cache.get(&key).await {
                debug!(%symbol, %period, "cache hit");
                return Ok(Loaded {
                    series,
                    from_cache: true,
                });
            }
        }

        let fetched = self.fetcher.fetch(symbol, period).await?;

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            if self.cache_mode.writes()
                && !cache.put(key, fetched.series.clone(), generation).await
            {
                debug!(%symbol, %period, "cache slot holds newer data; write dropped");
            }
        }

        Ok(Loaded {
            series: fetched.series,
            from_cache: false,
        })
    }
}

fn evaluate(
    instrument: &Instrument,
    load: Result<Loaded, FetchFailure>,
    period: Period,
) -> Result<PerformanceRecord, SkippedInstrument> {
    let skip = |reason| SkippedInstrument {
        symbol: instrument.symbol.clone(),
        display_name: instrument.display_name.clone(),
        reason,
    };

    let loaded = load.map_err(|failure| {
        skip(SkipReason::FetchFailed {
            attempts: failure.attempts,
            code: failure.last_error.code(),
            message: failure.last_error.message().to_owned(),
        })
    })?;

    let series = filter_by_period(Some(&loaded.series), period);
    if series.is_empty() {
        return Err(skip(SkipReason::NoDataInWindow));
    }

    match compute_metrics(&series) {
        MetricsOutcome::Computed(metrics) => Ok(PerformanceRecord {
            symbol: instrument.symbol.clone(),
            display_name: instrument.display_name.clone(),
            percent_change: metrics.percent_change,
            current_price: metrics.current_price,
            series,
            normalized: metrics.normalized,
            from_cache: loaded.from_cache,
        }),
        MetricsOutcome::Zero(reason) => Err(skip(SkipReason::InvalidSeries { detail: reason })),
    }
}

/// Indices of `records` ordered by percent change, highest first.
///
/// The sort is stable, so equal values keep their universe order.
pub fn rank(records: &[PerformanceRecord]) -> Vec<usize> {
    let mut ranking = (0..records.len()).collect::<Vec<_>>();
    ranking.sort_by(|a, b| {
        records[*b]
            .percent_change
            .total_cmp(&records[*a].percent_change)
    });
    ranking
}

/// Best and worst are the first-seen maximum and minimum; `None` for no records.
pub fn summarize(records: &[PerformanceRecord]) -> Option<SummaryStats> {
    let first = records.first()?;
    let mut best = first;
    let mut worst = first;
    let mut total = 0.0;

    for record in records {
        if record.percent_change > best.percent_change {
            best = record;
        }
        if record.percent_change < worst.percent_change {
            worst = record;
        }
        total += record.percent_change;
    }

    Some(SummaryStats {
        best: best.clone(),
        worst: worst.clone(),
        average: total / records.len() as f64,
    })
}
