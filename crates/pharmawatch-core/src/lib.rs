//! # PharmaWatch Core
//!
//! Price-history fetching and cross-instrument performance aggregation for a
//! small universe of equities (by default six NSE pharmaceutical stocks).
//!
//! ## Overview
//!
//! - **Domain types** for symbols, periods, daily price series and universes
//! - **Data source trait** with Yahoo Finance, Alpha Vantage and demo adapters
//! - **Retrying fetcher** with bounded attempts and per-attempt timeouts
//! - **Window filter and metrics** (percent change, base-100 normalization)
//! - **Aggregator** that ranks a universe and summarizes best/worst/average
//! - **Result cache** keyed by symbol and period, with generation ordering
//! - **Layered configuration** from file and environment
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo, Alpha Vantage, Demo) |
//! | [`aggregator`] | Universe aggregation, ranking and summary |
//! | [`cache`] | Fetched-series cache with TTL and generations |
//! | [`config`] | Settings loading and validation |
//! | [`data_source`] | Data source trait and structured source errors |
//! | [`domain`] | Symbol, Period, PriceSeries, Instrument, Universe |
//! | [`error`] | Core error types |
//! | [`filter`] | Trailing-window filter |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`metrics`] | Percent change and normalization |
//! | [`provider_policy`] | Per-provider concurrency, pacing and retry |
//! | [`retry`] | Retrying history fetcher |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Call pacing for metered providers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pharmawatch_core::{Aggregation, Aggregator, DemoAdapter, HistoryFetcher, Period, Universe};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = HistoryFetcher::new(Arc::new(DemoAdapter::default()));
//!     let aggregation = Aggregator::new(fetcher)
//!         .aggregate(&Universe::nse_pharma(), Period::OneYear)
//!         .await;
//!
//!     if let Aggregation::Ready(report) = aggregation {
//!         for record in report.ranked() {
//!             println!("{:<22} {:+.2}%", record.display_name, record.percent_change);
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│   CacheStore     │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HistoryFetcher  │────▶│ ThrottlingQueue  │
//! │ (retry/timeout) │     │ (governor)       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod metrics;
pub mod provider_policy;
pub mod retry;
pub mod source;
pub mod throttling;

pub use adapters::{adapter_for, AlphaVantageAdapter, DemoAdapter, YahooAdapter};
pub use aggregator::{
    rank, summarize, Aggregation, Aggregator, ComparisonLine, EmptyResult, PerformanceRecord,
    PerformanceReport, SkipReason, SkippedInstrument, SummaryStats,
};
pub use cache::{CacheKey, CacheMode, CacheStore, Generation};
pub use config::{load_settings, ConfigError, Settings};
pub use data_source::{DataSource, HistoryFuture, HistoryRequest, SourceError, SourceErrorKind};
pub use domain::{Instrument, Period, PriceRecord, PriceSeries, Symbol, Universe, NSE_PHARMA};
pub use error::{CoreError, ValidationError};
pub use filter::filter_by_period;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use metrics::{
    compute_metrics, format_percent, percent_change, Metrics, MetricsOutcome, NormalizedPoint,
    ZeroReason,
};
pub use provider_policy::ProviderPolicy;
pub use retry::{Backoff, FetchFailure, FetchSuccess, HistoryFetcher, RetryConfig};
pub use source::ProviderId;
pub use throttling::ThrottlingQueue;
