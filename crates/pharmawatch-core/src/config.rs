//! Layered runtime configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults ([`Settings::default`]).
//! 2. `pharmawatch.toml` in the working directory, or an explicit file.
//! 3. `PHARMAWATCH_*` environment variables; nested keys use `__`
//!    (`PHARMAWATCH_RETRY__MAX_ATTEMPTS=5`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryConfig;
use crate::{Instrument, Period, ProviderId, Universe, ValidationError};

pub const DEFAULT_CONFIG_FILE: &str = "pharmawatch.toml";
pub const ENV_PREFIX: &str = "PHARMAWATCH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid universe entry: {0}")]
    Universe(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub attempt_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2_000,
            attempt_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Zero disables caching.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 3_600 }
    }
}

/// Configured instrument; symbols are bare tickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderId,
    pub period: Period,
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    /// Overrides the provider policy's concurrency bound.
    pub max_concurrency: Option<usize>,
    /// Replaces the built-in NSE pharma universe.
    pub universe: Option<Vec<UniverseEntry>>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(String::from(
                "retry.max_attempts must be at least 1",
            )));
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "retry.attempt_timeout_ms must be greater than zero",
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(String::from(
                "max_concurrency must be at least 1",
            )));
        }
        self.universe()?;
        Ok(())
    }

    /// Configured or built-in universe, with the provider's symbol suffix applied.
    pub fn universe(&self) -> Result<Universe, ConfigError> {
        let base = match &self.universe {
            Some(entries) => Universe::new(
                entries
                    .iter()
                    .map(|entry| Instrument::parse(&entry.symbol, &entry.display_name))
                    .collect::<Result<Vec<_>, _>>()?,
            )?,
            None => Universe::nse_pharma(),
        };
        Ok(base.with_symbol_suffix(self.provider.symbol_suffix())?)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(
            Duration::from_millis(self.retry.delay_ms),
            self.retry.max_attempts,
        )
        .with_attempt_timeout(Duration::from_millis(self.retry.attempt_timeout_ms))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

/// Loads settings from defaults, the config file and the process environment.
///
/// With `path` set the file must exist; otherwise `pharmawatch.toml` is read
/// only if present.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_with_env(path, None)
}

/// Like [`load_settings`], reading environment variables from `env` instead
/// of the process when given.
pub fn load_settings_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
