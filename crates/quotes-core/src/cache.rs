//! Cache trait for storing fetched market data.
//!
//! This module defines the [`QuoteCache`] trait that provides a unified
//! interface for the time-bounded result store sitting in front of the
//! upstream provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::time::Duration;

use crate::{request::CacheKey, types::MarketData};

/// Time-to-live applied to every cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// A cached value with its age information, as returned by [`QuoteCache::peek`].
#[derive(Clone, Debug, PartialEq)]
pub struct CachedEntry {
    /// The cached payload.
    pub value: MarketData,
    /// When the value was stored.
    pub stored_at: DateTime<Utc>,
    /// The TTL the entry was judged against.
    pub ttl: Duration,
    /// True once the entry has outlived its TTL.
    pub stale: bool,
}

/// Trait for caching fetched market data.
///
/// Implementations must tolerate concurrent readers and writers. Expiry is
/// lazy: [`get`](QuoteCache::get) never returns an entry whose age has reached
/// the TTL, but such entries may stay in the backing store until overwritten
/// or purged.
#[async_trait]
pub trait QuoteCache: Send + Sync + Debug {
    /// Returns the value stored under `key` if it is still fresh.
    async fn get(&self, key: &CacheKey) -> Option<MarketData>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn put(&self, key: CacheKey, value: MarketData);

    /// Returns the entry under `key` with its staleness, fresh or not.
    async fn peek(&self, key: &CacheKey) -> Option<CachedEntry>;

    /// Removes expired entries.
    ///
    /// Returns the number of entries removed.
    async fn purge_expired(&self) -> usize;

    /// Clears all cached data.
    async fn clear(&self);
}
