use time::{Date, Duration, OffsetDateTime};

use crate::data_source::{DataSource, HistoryFuture, HistoryRequest, SourceError};
use crate::{Period, PriceRecord, PriceSeries, ProviderId, Symbol};

/// Reference close and period change for one demo instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoQuote {
    pub symbol: &'static str,
    pub current_price: f64,
    pub percent_change: f64,
}

/// Reference figures for the built-in universe.
pub const DEMO_QUOTES: [DemoQuote; 6] = [
    DemoQuote {
        symbol: "SUNPHARMA",
        current_price: 1589.30,
        percent_change: 15.53,
    },
    DemoQuote {
        symbol: "DRREDDY",
        current_price: 5234.50,
        percent_change: 8.24,
    },
    DemoQuote {
        symbol: "CIPLA",
        current_price: 1456.75,
        percent_change: -2.15,
    },
    DemoQuote {
        symbol: "LUPIN",
        current_price: 2156.80,
        percent_change: 12.67,
    },
    DemoQuote {
        symbol: "AUROPHARMA",
        current_price: 1678.25,
        percent_change: -0.37,
    },
    DemoQuote {
        symbol: "DIVISLAB",
        current_price: 5890.40,
        percent_change: 71.00,
    },
];

const JITTER: f64 = 0.02;
const FLOOR: f64 = 0.8;

/// Offline source producing seeded synthetic history.
///
/// One point per calendar day ending at `as_of`. The path runs linearly from
/// `current / (1 + change / 100)` to `current` with bounded jitter; both end
/// points are pinned so the computed change matches the reference figure.
/// The same seed, date and symbol always produce the same series.
#[derive(Debug, Clone)]
pub struct DemoAdapter {
    as_of: Date,
    seed: u64,
}

impl Default for DemoAdapter {
    fn default() -> Self {
        Self {
            as_of: OffsetDateTime::now_utc().date(),
            seed: 0x5eed_f00d,
        }
    }
}

impl DemoAdapter {
    pub fn new(as_of: Date, seed: u64) -> Self {
        Self { as_of, seed }
    }

    pub fn with_as_of(mut self, as_of: Date) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn as_of(&self) -> Date {
        self.as_of
    }

    pub fn quote(symbol: &Symbol) -> Option<&'static DemoQuote> {
        let bare = symbol.as_str().strip_suffix(".NS").unwrap_or(symbol.as_str());
        DEMO_QUOTES.iter().find(|quote| quote.symbol == bare)
    }

    fn generate(&self, symbol: &Symbol, period: Period) -> Result<PriceSeries, SourceError> {
        let quote = Self::quote(symbol).ok_or_else(|| {
            SourceError::invalid_request(format!("demo source has no data for '{symbol}'"))
        })?;

        let days = period.trading_days().max(2);
        let current = quote.current_price;
        let start = current / (1.0 + quote.percent_change / 100.0);
        let mut rng = fastrand::Rng::with_seed(self.seed ^ symbol_seed(quote.symbol));

        let mut records = Vec::with_capacity(days);
        let mut previous_close = start;
        for step in 0..days {
            let offset = i64::try_from(days - 1 - step).unwrap_or(i64::MAX);
            let Some(date) = self.as_of.checked_sub(Duration::days(offset)) else {
                continue;
            };

            let close = if step == 0 {
                start
            } else if step == days - 1 {
                current
            } else {
                let progress = step as f64 / (days - 1) as f64;
                let trend = start + (current - start) * progress;
                let variation = trend * (rng.f64() * 2.0 - 1.0) * JITTER;
                (trend + variation).max(start * FLOOR)
            };
            let open = previous_close;
            let swing = 1.0 + rng.f64() * 0.01;
            let high = open.max(close) * swing;
            let low = open.min(close) / swing;
            let volume = rng.u64(1_000_000..5_000_000);

            let record = PriceRecord::new(date, open, high, low, close, volume)
                .map_err(|error| SourceError::internal(format!("demo record rejected: {error}")))?;
            records.push(record);
            previous_close = close;
        }

        Ok(PriceSeries::from_unsorted(records))
    }
}

impl DataSource for DemoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Demo
    }

    fn history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { self.generate(&req.symbol, req.period) })
    }
}

fn symbol_seed(symbol: &str) -> u64 {
    symbol.bytes().fold(11_u64, |acc, byte| {
        acc.wrapping_mul(31).wrapping_add(u64::from(byte))
    })
}
