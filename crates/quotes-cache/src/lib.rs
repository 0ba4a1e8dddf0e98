#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for the market data service.
//!
//! This crate provides implementations of the [`QuoteCache`] trait from `quotes-core`:
//!
//! - [`InMemoryCache`] - TTL-bounded in-memory cache (default)
//! - [`NoopCache`] - No-op cache that doesn't store anything

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use quotes_core::QuoteCache;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;
