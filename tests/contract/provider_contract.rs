//! Contract every provider adapter must honour: identity, policy, and a
//! date-ordered series of positive closes on success.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use pharmawatch_core::{
    AlphaVantageAdapter, DataSource, DemoAdapter, HistoryRequest, HttpResponse, Period,
    ProviderId, ProviderPolicy, SourceErrorKind, YahooAdapter,
};
use support::{symbol, ScriptedHttpClient};
use time::macros::date;

const YAHOO_CHART: &str = r#"{"chart":{"result":[{
    "meta":{"gmtoffset":19800},
    "timestamp":[1704080700,1704167100,1704253500],
    "indicators":{"quote":[{
        "open":[1240.0,1250.5,1258.0],
        "high":[1260.0,1262.0,1270.0],
        "low":[1235.0,1244.0,1248.0],
        "close":[1251.0,1255.5,1266.0],
        "volume":[1200000,1100000,900000]
    }]}
}],"error":null}}"#;

const ALPHAVANTAGE_DAILY: &str = r#"{"Time Series (Daily)":{
    "2024-01-03":{"1. open":"1258.0","2. high":"1270.0","3. low":"1248.0","4. close":"1266.0","5. volume":"900000"},
    "2024-01-02":{"1. open":"1250.5","2. high":"1262.0","3. low":"1244.0","4. close":"1255.5","5. volume":"1100000"},
    "2024-01-01":{"1. open":"1240.0","2. high":"1260.0","3. low":"1235.0","4. close":"1251.0","5. volume":"1200000"}
}}"#;

struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn DataSource>,
    symbol: &'static str,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Yahoo,
            source: Arc::new(YahooAdapter::new(Arc::new(ScriptedHttpClient::ok(YAHOO_CHART)))),
            symbol: "CIPLA.NS",
        },
        ProviderCase {
            id: ProviderId::Alphavantage,
            source: Arc::new(AlphaVantageAdapter::new(
                Arc::new(ScriptedHttpClient::ok(ALPHAVANTAGE_DAILY)),
                "test-key",
            )),
            symbol: "CIPLA",
        },
        ProviderCase {
            id: ProviderId::Demo,
            source: Arc::new(DemoAdapter::new(date!(2024 - 01 - 03), 1)),
            symbol: "CIPLA",
        },
    ]
}

#[test]
fn adapters_report_their_identity_and_policy() {
    for case in provider_cases() {
        assert_eq!(case.source.id(), case.id);

        let policy = case.source.policy();
        assert_eq!(policy, ProviderPolicy::default_for(case.id));
        assert!(policy.max_concurrency >= 1, "{}", case.id);
    }
}

#[tokio::test]
async fn adapters_return_date_ordered_positive_series() {
    for case in provider_cases() {
        let request = HistoryRequest::new(symbol(case.symbol), Period::OneMonth);
        let series = case
            .source
            .history(request)
            .await
            .unwrap_or_else(|error| panic!("{} history failed: {error}", case.id));

        assert!(!series.is_empty(), "{} returned no records", case.id);
        assert_eq!(series.latest_date(), Some(date!(2024 - 01 - 03)), "{}", case.id);
        assert!(
            series
                .records()
                .windows(2)
                .all(|pair| pair[0].date < pair[1].date),
            "{} dates must strictly increase",
            case.id
        );
        assert!(series.closes().all(|close| close > 0.0), "{}", case.id);
    }
}

#[tokio::test]
async fn network_adapters_map_http_429_to_rate_limited() {
    let throttled = || Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::with_status(429, ""))]));
    let sources: Vec<Arc<dyn DataSource>> = vec![
        Arc::new(YahooAdapter::new(throttled())),
        Arc::new(AlphaVantageAdapter::new(throttled(), "test-key")),
    ];

    for source in sources {
        let error = source
            .history(HistoryRequest::new(symbol("CIPLA"), Period::OneYear))
            .await
            .expect_err("429 must fail");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "{}", source.id());
        assert!(error.retryable());
    }
}
