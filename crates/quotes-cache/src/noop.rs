//! No-op cache implementation.

use async_trait::async_trait;
use quotes_core::{CacheKey, CachedEntry, MarketData, QuoteCache};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// Every lookup misses and every write is dropped, so each request goes
/// upstream. Useful for disabling caching or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QuoteCache for NoopCache {
    async fn get(&self, _key: &CacheKey) -> Option<MarketData> {
        trace!("NoopCache: get called, returning None");
        None
    }

    async fn put(&self, _key: CacheKey, _value: MarketData) {
        trace!("NoopCache: put called, doing nothing");
    }

    async fn peek(&self, _key: &CacheKey) -> Option<CachedEntry> {
        None
    }

    async fn purge_expired(&self) -> usize {
        0
    }

    async fn clear(&self) {}
}
