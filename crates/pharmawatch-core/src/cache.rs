//! In-memory cache of fetched price histories.
//!
//! Entries are keyed by `(symbol, period)` and hold the series exactly as the
//! provider returned it, before any window filtering. Every aggregation takes
//! a [`Generation`] ticket up front; a write carrying an older ticket than the
//! one already stored in the slot is dropped, so a slow or abandoned request
//! never overwrites data written on behalf of a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Period, PriceSeries, Symbol};

/// How an aggregation interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read a non-expired entry if present; otherwise fetch and write back.
    #[default]
    Use,
    /// Always fetch, then write the fresh series back.
    Refresh,
    /// Always fetch; never read or write.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

/// Cache slot identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub period: Period,
}

impl CacheKey {
    pub fn new(symbol: Symbol, period: Period) -> Self {
        Self { symbol, period }
    }
}

/// Monotonic request ticket used to order cache writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: PriceSeries,
    generation: Generation,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl CacheInner {
    fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.series.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: CacheKey, series: PriceSeries, generation: Generation) -> bool {
        if let Some(existing) = self.map.get(&key) {
            if existing.generation > generation {
                return false;
            }
        }

        let expires_at = Instant::now() + self.ttl;
        self.map.insert(
            key,
            CacheEntry {
                series,
                generation,
                expires_at,
            },
        );
        true
    }
}

/// Thread-safe, cloneable handle to a shared history cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    generations: Arc<AtomicU64>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// One-hour TTL, matching how often daily data is worth re-fetching.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }

    /// Cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Issues the ticket for a new request; later calls always get larger tickets.
    pub fn begin_request(&self) -> Generation {
        Generation(self.generations.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        self.inner.read().await.get(key)
    }

    /// Stores `series` unless the slot holds an entry from a newer generation.
    ///
    /// Returns whether the write was applied.
    pub async fn put(&self, key: CacheKey, series: PriceSeries, generation: Generation) -> bool {
        let mut store = self.inner.write().await;
        if store.ttl == Duration::ZERO {
            return false;
        }
        store.put(key, series, generation)
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, including expired ones not yet cleared.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.ttl == Duration::ZERO
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
