//! Provider adapters.
//!
//! | Adapter | Provider | Network |
//! |---------|----------|---------|
//! | [`YahooAdapter`] | Yahoo Finance chart API | yes |
//! | [`AlphaVantageAdapter`] | Alpha Vantage `TIME_SERIES_DAILY` | yes |
//! | [`DemoAdapter`] | Seeded synthetic history | no |

mod alphavantage;
mod demo;
mod yahoo;

use std::sync::Arc;

pub use alphavantage::AlphaVantageAdapter;
pub use demo::{DemoAdapter, DemoQuote, DEMO_QUOTES};
pub use yahoo::YahooAdapter;

use crate::data_source::{DataSource, SourceError};
use crate::http_client::{HttpError, HttpResponse};
use crate::ProviderId;

/// Builds the production adapter for `provider_id`.
pub fn adapter_for(provider_id: ProviderId) -> Arc<dyn DataSource> {
    match provider_id {
        ProviderId::Yahoo => Arc::new(YahooAdapter::default()),
        ProviderId::Alphavantage => Arc::new(AlphaVantageAdapter::default()),
        ProviderId::Demo => Arc::new(DemoAdapter::default()),
    }
}

pub(crate) fn transport_error(provider: ProviderId, error: HttpError) -> SourceError {
    if error.timed_out() {
        SourceError::timeout(format!("{provider} request timed out: {}", error.message()))
    } else {
        SourceError::unavailable(format!("{provider} transport error: {}", error.message()))
    }
}

pub(crate) fn status_error(provider: ProviderId, response: &HttpResponse) -> Option<SourceError> {
    match response.status {
        _ if response.is_success() => None,
        429 => Some(SourceError::rate_limited(format!(
            "{provider} returned status 429"
        ))),
        status => Some(SourceError::unavailable(format!(
            "{provider} returned status {status}"
        ))),
    }
}
