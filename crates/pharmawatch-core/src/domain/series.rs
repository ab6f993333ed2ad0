use serde::{Deserialize, Serialize};
use time::Date;

use crate::ValidationError;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

/// One daily OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(with = "calendar_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceRecord {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if close <= 0.0 {
            return Err(ValidationError::NonPositiveClose {
                date: date.to_string(),
            });
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Record carrying only a close, with open/high/low pinned to it.
    pub fn close_only(date: Date, close: f64, volume: u64) -> Result<Self, ValidationError> {
        Self::new(date, close, close, close, close, volume)
    }
}

/// Date-ordered price history: strictly increasing dates, positive closes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceRecord>", into = "Vec<PriceRecord>")]
pub struct PriceSeries {
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Builds a series from records that must already be in strictly increasing date order.
    pub fn new(records: Vec<PriceRecord>) -> Result<Self, ValidationError> {
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ValidationError::NonMonotonicDates {
                    previous: pair[0].date.to_string(),
                    next: pair[1].date.to_string(),
                });
            }
        }
        Ok(Self { records })
    }

    /// Sorts by date and keeps the first record seen for each date.
    pub fn from_unsorted(mut records: Vec<PriceRecord>) -> Self {
        records.sort_by_key(|record| record.date);
        records.dedup_by_key(|record| record.date);
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&PriceRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&PriceRecord> {
        self.records.last()
    }

    pub fn latest_date(&self) -> Option<Date> {
        self.last().map(|record| record.date)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|record| record.close)
    }

    /// Keeps the records matching `predicate`; order is preserved so the invariant holds.
    pub fn retain_where(&self, predicate: impl Fn(&PriceRecord) -> bool) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        }
    }
}

impl TryFrom<Vec<PriceRecord>> for PriceSeries {
    type Error = ValidationError;

    fn try_from(records: Vec<PriceRecord>) -> Result<Self, Self::Error> {
        for record in &records {
            if !(record.close > 0.0) {
                return Err(ValidationError::NonPositiveClose {
                    date: record.date.to_string(),
                });
            }
        }
        Self::new(records)
    }
}

impl From<PriceSeries> for Vec<PriceRecord> {
    fn from(series: PriceSeries) -> Self {
        series.records
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PriceRecord;
    type IntoIter = std::slice::Iter<'a, PriceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
