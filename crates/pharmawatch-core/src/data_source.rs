//! Data source trait and request/error types.
//!
//! This module defines the capability every price-history provider offers
//! (`DataSource`) together with the structured error the rest of the
//! pipeline consumes. Provider failures never cross this boundary as
//! anything other than a [`SourceError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pharmawatch_core::{DataSource, DemoAdapter, HistoryRequest, Period, Symbol};
//!
//! async fn latest_close(adapter: &DemoAdapter) -> Option<f64> {
//!     let request = HistoryRequest::new(Symbol::parse("CIPLA").ok()?, Period::OneMonth);
//!     let series = adapter.history(request).await.ok()?;
//!     series.last().map(|record| record.close)
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::provider_policy::ProviderPolicy;
use crate::{Period, PriceSeries, ProviderId, Symbol};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    EmptyPayload,
    MalformedPayload,
    InvalidRequest,
    Internal,
}

/// Structured source error consumed by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message, true)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message, true)
    }

    pub fn empty_payload(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::EmptyPayload, message, true)
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::MalformedPayload, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message, true)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::EmptyPayload => "source.empty_payload",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for price-history calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub period: Period,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, period: Period) -> Self {
        Self { symbol, period }
    }
}

/// Boxed future returned by [`DataSource::history`].
pub type HistoryFuture<'a> = Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>>;

/// Price-history provider contract.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](DataSource::id) | Provider identifier |
/// | [`policy`](DataSource::policy) | Concurrency, pacing and retry defaults |
/// | [`history`](DataSource::history) | Fetch a date-ordered daily series |
///
/// Implementations must be `Send + Sync`; the aggregator shares one adapter
/// across its fetch workers.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy::default_for(self.id())
    }

    /// Fetches the daily history of `req.symbol` covering at least `req.period`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider is unreachable, rejects the
    /// call, times out, or answers with a payload that cannot be normalized.
    /// An empty series is a valid answer here; the retry layer decides what
    /// to do with it.
    fn history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a>;
}
