//! Trailing-window restriction of a price history.

use time::Duration;

use crate::{Period, PriceSeries};

/// Restricts `series` to records dated on or after `latest - window_days(period)`.
///
/// The window is anchored at the series' own latest date, not at today, so
/// histories that stop early (holidays, delisting, stale cache) still yield a
/// full window. An absent or empty input yields an empty series: "no data in
/// this window" rather than an error.
pub fn filter_by_period(series: Option<&PriceSeries>, period: Period) -> PriceSeries {
    let Some(series) = series else {
        return PriceSeries::empty();
    };
    let Some(latest) = series.latest_date() else {
        return PriceSeries::empty();
    };

    match latest.checked_sub(Duration::days(period.window_days())) {
        Some(cutoff) => series.retain_where(|record| record.date >= cutoff),
        None => series.clone(),
    }
}
