use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::Date;
use tracing::debug;

use super::{status_error, transport_error};
use crate::data_source::{DataSource, HistoryFuture, HistoryRequest, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{Period, PriceRecord, PriceSeries, ProviderId};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const API_KEY_VARS: [&str; 2] = ["PHARMAWATCH_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY"];

/// Alpha Vantage `TIME_SERIES_DAILY` adapter.
///
/// The free tier allows five calls a minute; the adapter's provider policy
/// carries that pacing and [`HistoryFetcher`](crate::HistoryFetcher) enforces it.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
}

impl Default for AlphaVantageAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()), api_key_from_env())
    }
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn daily_url(&self, req: &HistoryRequest) -> String {
        format!(
            "{}/query?function=TIME_SERIES_DAILY&symbol={}&outputsize={}&apikey={}",
            self.base_url,
            urlencoding::encode(req.symbol.as_str()),
            output_size(req.period),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn fetch_daily(&self, req: HistoryRequest) -> Result<PriceSeries, SourceError> {
        // The URL carries the API key; log the symbol only.
        debug!(symbol = %req.symbol, period = %req.period, "requesting alphavantage daily series");
        let request = HttpRequest::get(self.daily_url(&req));
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| transport_error(ProviderId::Alphavantage, error))?;

        if let Some(error) = status_error(ProviderId::Alphavantage, &response) {
            return Err(error);
        }

        parse_daily(&response.body)
    }
}

impl DataSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(self.fetch_daily(req))
    }
}

/// First non-empty key among the supported environment variables, else `demo`.
pub(crate) fn api_key_from_env() -> String {
    API_KEY_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| String::from("demo"))
}

/// `compact` returns the latest 100 sessions, enough for three months.
fn output_size(period: Period) -> &'static str {
    match period {
        Period::OneMonth | Period::ThreeMonths => "compact",
        _ => "full",
    }
}

fn parse_daily(body: &str) -> Result<PriceSeries, SourceError> {
    let payload: AlphaVantageDailyResponse = serde_json::from_str(body).map_err(|error| {
        SourceError::malformed_payload(format!("failed to parse alphavantage daily series: {error}"))
    })?;

    if let Some(note) = payload.note.or(payload.information) {
        return Err(SourceError::rate_limited(format!(
            "alphavantage rejected the call: {note}"
        )));
    }
    if let Some(message) = payload.error_message {
        return Err(SourceError::invalid_request(format!(
            "alphavantage error: {message}"
        )));
    }

    let rows = payload.time_series.ok_or_else(|| {
        SourceError::malformed_payload("alphavantage response has no 'Time Series (Daily)' block")
    })?;

    let date_format = format_description!("[year]-[month]-[day]");
    let records = rows
        .into_iter()
        .filter_map(|(day, row)| {
            let date = Date::parse(&day, date_format).ok()?;
            PriceRecord::new(
                date,
                row.open.trim().parse().ok()?,
                row.high.trim().parse().ok()?,
                row.low.trim().parse().ok()?,
                row.close.trim().parse().ok()?,
                row.volume.trim().parse().ok()?,
            )
            .ok()
        })
        .collect::<Vec<_>>();

    Ok(PriceSeries::from_unsorted(records))
}

#[derive(Debug, Deserialize)]
struct AlphaVantageDailyResponse {
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Time Series (Daily)", default)]
    time_series: Option<BTreeMap<String, AlphaVantageDailyRow>>,
}

/// Every numeric field arrives as a JSON string.
#[derive(Debug, Deserialize)]
struct AlphaVantageDailyRow {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}
