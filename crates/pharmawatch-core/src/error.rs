use thiserror::Error;

/// Validation and contract errors exposed by `pharmawatch-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid period '{value}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y")]
    InvalidPeriod { value: String },
    #[error("invalid source '{value}', expected one of yahoo, alphavantage, demo")]
    InvalidSource { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("close on {date} must be strictly positive")]
    NonPositiveClose { date: String },

    #[error("price records must have strictly increasing dates ({previous} then {next})")]
    NonMonotonicDates { previous: String, next: String },

    #[error("display name cannot be empty for symbol '{symbol}'")]
    EmptyDisplayName { symbol: String },
    #[error("universe must contain at least one instrument")]
    EmptyUniverse,
    #[error("instrument '{symbol}' appears more than once in the universe")]
    DuplicateInstrument { symbol: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
