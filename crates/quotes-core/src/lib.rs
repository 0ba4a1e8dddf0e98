#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the market data service.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`MarketDataProvider`](provider::MarketDataProvider) - Upstream data source
//! - [`QuoteCache`](cache::QuoteCache) - Time-bounded result store
//! - [`Clock`](clock::Clock) - Injectable time source for TTL decisions
//! - [`QuoteError`](error::QuoteError) - Caller-facing error taxonomy
//! - [`translate`](translate::translate) - Upstream failure to taxonomy mapping

/// Cache trait and types for storing fetched data.
pub mod cache;
/// Time sources.
pub mod clock;
/// Error types for data operations.
pub mod error;
/// Provider trait for fetching market data.
pub mod provider;
/// Requests, operations and cache keys.
pub mod request;
/// Slicing utilities for time series.
pub mod series;
/// Upstream failure translation.
pub mod translate;
/// Core data types (Symbol, TimeSeries, GlobalQuote, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CachedEntry, DEFAULT_TTL, QuoteCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, FailureClass, QuoteError, Result, UpstreamFailure};
pub use provider::MarketDataProvider;
pub use request::{CacheKey, MarketDataRequest, Metal, Operation, SeriesInterval};
pub use series::{SeriesWindow, last_n};
pub use types::{
    CompanyOverview, GlobalQuote, Keywords, MarketData, SpotPrice, Symbol, SymbolMatch,
    TimeSeries, TimeSeriesPoint,
};
