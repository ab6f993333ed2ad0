use std::time::Duration;

use crate::retry::RetryConfig;
use crate::ProviderId;

/// Per-provider limits applied by the fetch layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    /// Upper bound on concurrent history fetches.
    pub max_concurrency: usize,
    /// Minimum spacing between upstream calls, when the provider meters them.
    pub pacing: Option<Duration>,
    pub retry: RetryConfig,
}

impl ProviderPolicy {
    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            max_concurrency: 4,
            pacing: None,
            retry: RetryConfig::default(),
        }
    }

    /// Free tier allows five calls a minute; 13s spacing keeps a margin.
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            max_concurrency: 1,
            pacing: Some(Duration::from_secs(13)),
            retry: RetryConfig::default(),
        }
    }

    pub fn demo_default() -> Self {
        Self {
            provider_id: ProviderId::Demo,
            max_concurrency: 8,
            pacing: None,
            retry: RetryConfig::fixed(Duration::ZERO, 1),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Yahoo => Self::yahoo_default(),
            ProviderId::Alphavantage => Self::alphavantage_default(),
            ProviderId::Demo => Self::demo_default(),
        }
    }
}
