//! Per-instrument performance figures.
//!
//! Percentages are kept at full `f64` precision; [`format_percent`] is the
//! only place rounding happens.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::PriceSeries;

time::serde::format_description!(point_date, Date, "[year]-[month]-[day]");

/// One point of a base-100 comparison line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    #[serde(with = "point_date")]
    pub date: Date,
    pub value: f64,
}

/// Figures derived from a series whose first close is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub percent_change: f64,
    pub current_price: f64,
    /// `close[i] / close[0] * 100` for every record.
    pub normalized: Vec<NormalizedPoint>,
}

/// Why no metrics could be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroReason {
    EmptySeries,
    NonPositiveBase,
}

/// Result of [`compute_metrics`].
///
/// `Zero` reports a percent change of `0.0` so existing displays keep working,
/// but it is a distinct variant: a zero here means "no usable data", never
/// "flat performance".
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsOutcome {
    Computed(Metrics),
    Zero(ZeroReason),
}

impl MetricsOutcome {
    pub fn percent_change(&self) -> f64 {
        match self {
            Self::Computed(metrics) => metrics.percent_change,
            Self::Zero(_) => 0.0,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        match self {
            Self::Computed(metrics) => Some(metrics),
            Self::Zero(_) => None,
        }
    }

    pub fn into_metrics(self) -> Result<Metrics, ZeroReason> {
        match self {
            Self::Computed(metrics) => Ok(metrics),
            Self::Zero(reason) => Err(reason),
        }
    }
}

pub fn compute_metrics(series: &PriceSeries) -> MetricsOutcome {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return MetricsOutcome::Zero(ZeroReason::EmptySeries);
    };

    let base = first.close;
    if !(base > 0.0) || !base.is_finite() {
        return MetricsOutcome::Zero(ZeroReason::NonPositiveBase);
    }

    let normalized = series
        .iter()
        .map(|record| NormalizedPoint {
            date: record.date,
            value: record.close / base * 100.0,
        })
        .collect();

    MetricsOutcome::Computed(Metrics {
        percent_change: percent_change(base, last.close),
        current_price: last.close,
        normalized,
    })
}

/// Relative move from `start` to `end`, in percent.
pub fn percent_change(start: f64, end: f64) -> f64 {
    (end - start) / start * 100.0
}

/// Two-decimal percentage with an explicit sign, e.g. `+2.33%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:+.2}%")
}
