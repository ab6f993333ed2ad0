use std::sync::Arc;

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use super::{status_error, transport_error};
use crate::data_source::{DataSource, HistoryFuture, HistoryRequest, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{PriceRecord, PriceSeries, ProviderId};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance daily chart adapter.
///
/// Periods map directly onto the chart API `range` parameter, so the
/// provider does the slicing and the local window filter only trims edges.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()))
    }
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn chart_url(&self, req: &HistoryRequest) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url,
            urlencoding::encode(req.symbol.as_str()),
            req.period.as_str()
        )
    }

    async fn fetch_chart(&self, req: HistoryRequest) -> Result<PriceSeries, SourceError> {
        let request = HttpRequest::get(self.chart_url(&req))
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| transport_error(ProviderId::Yahoo, error))?;

        if let Some(error) = status_error(ProviderId::Yahoo, &response) {
            return Err(error);
        }

        let series = parse_chart(&response.body)?;
        debug!(symbol = %req.symbol, period = %req.period, records = series.len(), "yahoo chart parsed");
        Ok(series)
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(self.fetch_chart(req))
    }
}

fn parse_chart(body: &str) -> Result<PriceSeries, SourceError> {
    let chart: YahooChartResponse = serde_json::from_str(body).map_err(|error| {
        SourceError::malformed_payload(format!("failed to parse yahoo chart: {error}"))
    })?;

    if let Some(error) = chart.chart.error {
        return Err(SourceError::unavailable(format!(
            "yahoo chart API error: {} ({})",
            error.description.unwrap_or_default(),
            error.code
        )));
    }

    let result = chart
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::empty_payload("yahoo chart returned no result"))?;

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(SourceError::empty_payload("yahoo chart returned no timestamps"));
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::malformed_payload("yahoo chart has no quote block"))?;

    // Exchange-local dates; NSE sessions open after midnight UTC anyway.
    let offset = result
        .meta
        .and_then(|meta| meta.gmtoffset)
        .and_then(|seconds| i32::try_from(seconds).ok())
        .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
        .unwrap_or(UtcOffset::UTC);

    let mut records = Vec::with_capacity(timestamps.len());
    for (index, timestamp) in timestamps.into_iter().enumerate() {
        let Ok(instant) = OffsetDateTime::from_unix_timestamp(timestamp) else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, index),
            value_at(&quote.high, index),
            value_at(&quote.low, index),
            value_at(&quote.close, index),
        ) else {
            continue;
        };
        let volume = quote
            .volume
            .get(index)
            .copied()
            .flatten()
            .and_then(|volume| u64::try_from(volume).ok())
            .unwrap_or(0);

        if let Ok(record) =
            PriceRecord::new(instant.to_offset(offset).date(), open, high, low, close, volume)
        {
            records.push(record);
        }
    }

    Ok(PriceSeries::from_unsorted(records))
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
