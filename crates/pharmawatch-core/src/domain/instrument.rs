use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// One tracked equity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub display_name: String,
}

impl Instrument {
    pub fn new(symbol: Symbol, display_name: impl Into<String>) -> Result<Self, ValidationError> {
        let display_name = display_name.into().trim().to_owned();
        if display_name.is_empty() {
            return Err(ValidationError::EmptyDisplayName {
                symbol: symbol.to_string(),
            });
        }
        Ok(Self {
            symbol,
            display_name,
        })
    }

    pub fn parse(symbol: &str, display_name: &str) -> Result<Self, ValidationError> {
        Self::new(Symbol::parse(symbol)?, display_name)
    }
}

/// Built-in NSE pharmaceutical universe, bare tickers in display order.
pub const NSE_PHARMA: [(&str, &str); 6] = [
    ("SUNPHARMA", "Sun Pharma"),
    ("DRREDDY", "Dr. Reddy's Labs"),
    ("CIPLA", "Cipla"),
    ("LUPIN", "Lupin"),
    ("AUROPHARMA", "Aurobindo Pharma"),
    ("DIVISLAB", "Divi's Laboratories"),
];

/// Ordered, duplicate-free set of instruments.
///
/// Order is significant: it is the legend order of every report and the
/// tie-break order when ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Instrument>", into = "Vec<Instrument>")]
pub struct Universe {
    instruments: Vec<Instrument>,
}

impl Universe {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, ValidationError> {
        if instruments.is_empty() {
            return Err(ValidationError::EmptyUniverse);
        }

        let mut seen = HashSet::with_capacity(instruments.len());
        for instrument in &instruments {
            if !seen.insert(instrument.symbol.clone()) {
                return Err(ValidationError::DuplicateInstrument {
                    symbol: instrument.symbol.to_string(),
                });
            }
        }

        Ok(Self { instruments })
    }

    pub fn nse_pharma() -> Self {
        let instruments = NSE_PHARMA
            .iter()
            .filter_map(|(symbol, name)| Instrument::parse(symbol, name).ok())
            .collect();
        Self { instruments }
    }

    /// Rewrites every symbol with a provider-specific exchange suffix.
    pub fn with_symbol_suffix(&self, suffix: &str) -> Result<Self, ValidationError> {
        let instruments = self
            .instruments
            .iter()
            .map(|instrument| {
                Ok(Instrument {
                    symbol: instrument.symbol.with_suffix(suffix)?,
                    display_name: instrument.display_name.clone(),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Self::new(instruments)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instrument> {
        self.instruments.iter()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::nse_pharma()
    }
}

impl TryFrom<Vec<Instrument>> for Universe {
    type Error = ValidationError;

    fn try_from(value: Vec<Instrument>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Universe> for Vec<Instrument> {
    fn from(value: Universe) -> Self {
        value.instruments
    }
}
