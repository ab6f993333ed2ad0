//! Bounded retry around [`DataSource::history`].
//!
//! [`HistoryFetcher`] calls the provider at most `max_attempts` times. An
//! attempt fails when the provider errors, exceeds `attempt_timeout`, or
//! answers with an empty series. Between failed attempts the fetcher sleeps
//! for the delay given by the configured [`Backoff`].
//!
//! For metered providers each attempt first waits for a [`ThrottlingQueue`]
//! slot. That wait is not part of the attempt, so `attempt_timeout` bounds
//! only the provider call itself.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::data_source::{DataSource, HistoryRequest, SourceError};
use crate::throttling::ThrottlingQueue;
use crate::{Period, PriceSeries, ProviderId, Symbol};

/// Delay strategy between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed {
        delay: Duration,
    },
    /// Delay of `base * factor^retry`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random jitter of +/- 50% to each delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(2),
        }
    }
}

impl Backoff {
    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(retry as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(seconds.max(0.0));

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms = delay.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Retry budget for one history fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Upper bound on a single provider call.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn exponential(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base,
                factor: 2.0,
                max,
                jitter: true,
            },
            ..Self::default()
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}

/// Non-empty series returned by a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSuccess {
    pub series: PriceSeries,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Fetch that exhausted its attempts or hit a terminal provider error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("fetching {symbol} failed after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    pub symbol: Symbol,
    pub attempts: u32,
    pub last_error: SourceError,
}

/// Retry wrapper over a shared [`DataSource`].
///
/// Clones share one pacing queue, so concurrent workers of an aggregation
/// stay within the provider's call budget together.
#[derive(Clone)]
pub struct HistoryFetcher {
    source: Arc<dyn DataSource>,
    config: RetryConfig,
    throttling: Option<ThrottlingQueue>,
}

impl HistoryFetcher {
    /// Uses the retry and pacing defaults of the source's provider policy.
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let policy = source.policy();
        Self {
            throttling: ThrottlingQueue::from_policy(&policy),
            config: policy.retry,
            source,
        }
    }

    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the pacing queue; `None` disables pacing.
    pub fn with_throttling(mut self, throttling: Option<ThrottlingQueue>) -> Self {
        self.throttling = throttling;
        self
    }

    pub fn throttling(&self) -> Option<&ThrottlingQueue> {
        self.throttling.as_ref()
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn source_id(&self) -> ProviderId {
        self.source.id()
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub async fn fetch(&self, symbol: &Symbol, period: Period) -> Result<FetchSuccess, FetchFailure> {
        let max_attempts = self.config.effective_attempts();
        let provider = self.source.id();
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            if let Some(throttling) = &self.throttling {
                throttling.acquire().await;
            }
            let error = match self.attempt(symbol, period).await {
                Ok(series) => {
                    debug!(%provider, %symbol, %period, attempt, records = series.len(), "history fetched");
                    return Ok(FetchSuccess {
                        series,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            if attempt >= max_attempts || !error.retryable() {
                warn!(%provider, %symbol, %period, attempt, error = %error, "giving up on history fetch");
                return Err(FetchFailure {
                    symbol: symbol.clone(),
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.config.delay_for_retry(attempt - 1);
            warn!(
                %provider,
                %symbol,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "history fetch failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, symbol: &Symbol, period: Period) -> Result<PriceSeries, SourceError> {
        let request = HistoryRequest::new(symbol.clone(), period);
        let timeout = self.config.attempt_timeout;

        match tokio::time::timeout(timeout, self.source.history(request)).await {
            Ok(Ok(series)) if series.is_empty() => Err(SourceError::empty_payload(format!(
                "{} returned no records for {symbol} ({period})",
                self.source.id()
            ))),
            Ok(result) => result,
            Err(_) => Err(SourceError::timeout(format!(
                "{} did not answer within {}ms",
                self.source.id(),
                timeout.as_millis()
            ))),
        }
    }
}
