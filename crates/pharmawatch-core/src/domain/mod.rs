//! # Domain Models
//!
//! Canonical types shared by every stage of the pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated provider ticker |
//! | [`Period`] | Trailing window (1mo .. 5y) |
//! | [`PriceRecord`] | One daily OHLCV observation |
//! | [`PriceSeries`] | Strictly date-ordered history |
//! | [`Instrument`] | Symbol plus display name |
//! | [`Universe`] | Ordered set of tracked instruments |
//!
//! All types validate their invariants at construction time:
//!
//! ```rust
//! use pharmawatch_core::{PriceRecord, ValidationError};
//! use time::macros::date;
//!
//! let err = PriceRecord::new(date!(2024 - 01 - 02), 10.0, 11.0, 9.0, -1.0, 0).unwrap_err();
//! assert!(matches!(err, ValidationError::NegativeValue { field: "close" }));
//! ```

mod instrument;
mod period;
mod series;
mod symbol;

pub use instrument::{Instrument, Universe, NSE_PHARMA};
pub use period::Period;
pub use series::{PriceRecord, PriceSeries};
pub use symbol::Symbol;
