//! Scripted in-memory collaborators shared by the behaviour tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pharmawatch_core::http_client::HttpFuture;
use pharmawatch_core::{
    DataSource, HistoryFetcher, HistoryFuture, HistoryRequest, HttpClient, HttpError, HttpRequest,
    HttpResponse, Instrument, PriceRecord, PriceSeries, ProviderId, ProviderPolicy, RetryConfig,
    SourceError, Symbol, Universe,
};
use time::{Date, Duration as DateDuration};

pub type Outcome = Result<PriceSeries, SourceError>;

/// `DataSource` that replays a per-symbol script of outcomes.
///
/// Each call pops the next outcome; the last one repeats once the script is
/// down to a single entry. Unscripted symbols answer `InvalidRequest`.
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<HashMap<String, u32>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, symbol: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .expect("script store should not be poisoned")
            .insert(symbol.to_owned(), outcomes.into());
        self
    }

    pub fn always(self, symbol: &str, outcome: Outcome) -> Self {
        self.script(symbol, vec![outcome])
    }

    pub fn calls(&self, symbol: &str) -> u32 {
        self.calls
            .lock()
            .expect("call store should not be poisoned")
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls
            .lock()
            .expect("call store should not be poisoned")
            .values()
            .sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, symbol: &str) -> Outcome {
        *self
            .calls
            .lock()
            .expect("call store should not be poisoned")
            .entry(symbol.to_owned())
            .or_insert(0) += 1;

        let mut scripts = self.scripts.lock().expect("script store should not be poisoned");
        match scripts.get_mut(symbol) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty queue"),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(SourceError::invalid_request("empty script"))),
            None => Err(SourceError::invalid_request(format!("unscripted symbol {symbol}"))),
        }
    }
}

impl DataSource for ScriptedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Demo
    }

    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy {
            provider_id: ProviderId::Demo,
            max_concurrency: 8,
            pacing: None,
            retry: RetryConfig::fixed(Duration::ZERO, 3),
        }
    }

    fn history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = self.next_outcome(req.symbol.as_str());

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        })
    }
}

/// `HttpClient` replaying canned responses and recording requests.
pub struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::new(vec![Ok(HttpResponse::ok_json(body))])
    }

    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);

        let mut responses = self.responses.lock().expect("response store should not be poisoned");
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        }
        .unwrap_or_else(|| Err(HttpError::new("no scripted response")));

        Box::pin(async move { response })
    }
}

/// One record per calendar day, the last one dated `last`.
pub fn series_ending(last: Date, closes: &[f64]) -> PriceSeries {
    let count = closes.len() as i64;
    let records = closes
        .iter()
        .enumerate()
        .map(|(index, close)| {
            let date = last - DateDuration::days(count - 1 - index as i64);
            PriceRecord::close_only(date, *close, 1_000).expect("valid record")
        })
        .collect();
    PriceSeries::new(records).expect("dates increase")
}

pub fn universe(entries: &[(&str, &str)]) -> Universe {
    Universe::new(
        entries
            .iter()
            .map(|(symbol, name)| Instrument::parse(symbol, name).expect("valid instrument"))
            .collect(),
    )
    .expect("valid universe")
}

pub fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

pub fn fetcher(source: Arc<ScriptedSource>, max_attempts: u32) -> HistoryFetcher {
    HistoryFetcher::new(source).with_config(RetryConfig::fixed(Duration::ZERO, max_attempts))
}
