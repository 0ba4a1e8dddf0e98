//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use quotes_core::{CacheKey, CachedEntry, Clock, DEFAULT_TTL, MarketData, QuoteCache, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: MarketData,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is valid while its age is strictly below the TTL.
    fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        age >= TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }
}

/// Process-local cache with a fixed TTL.
///
/// Entries live in a `RwLock`-protected `HashMap`; the lock is held only for
/// the map lookup or insertion. Expired entries are skipped on read and stay
/// in the map until overwritten or removed by [`QuoteCache::purge_expired`].
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl InMemoryCache {
    /// Create a new empty cache using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty cache judging expiry against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl: DEFAULT_TTL,
        }
    }

    /// Returns the TTL applied to every entry.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteCache for InMemoryCache {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Option<MarketData> {
        let now = self.clock.now();
        let cache = self.entries.read().await;
        match cache.get(key) {
            Some(entry) if !entry.is_stale(now, self.ttl) => {
                debug!("Cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!("Cache entry expired");
                None
            }
            None => {
                debug!("Cache miss");
                None
            }
        }
    }

    #[instrument(skip_all, fields(key = %key, kind = value.label()))]
    async fn put(&self, key: CacheKey, value: MarketData) {
        let entry = CacheEntry {
            data: value,
            cached_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
        debug!("Cached entry");
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn peek(&self, key: &CacheKey) -> Option<CachedEntry> {
        let now = self.clock.now();
        let cache = self.entries.read().await;
        cache.get(key).map(|entry| CachedEntry {
            value: entry.data.clone(),
            stored_at: entry.cached_at,
            ttl: self.ttl,
            stale: entry.is_stale(now, self.ttl),
        })
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(now, self.ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    #[instrument(skip(self))]
    async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
    }
}
