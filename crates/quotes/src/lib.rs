#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cached market data access over a single upstream provider.
//!
//! This crate re-exports the core types and the provider implementation, and
//! provides a [`MarketDataService`] that fronts the provider with input
//! validation, a short-lived cache and error translation.
//!
//! # Features
//!
//! - `alphavantage` - Alpha Vantage provider, [`Config`] and
//!   [`MarketDataService::from_config`] (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use quotes::{Config, MarketDataService, SeriesWindow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = MarketDataService::from_config(&Config::from_env()?);
//!
//!     let quote = service.stock_price("AAPL").await?;
//!     println!("{} ({:?})", quote.value.price, quote.origin);
//!
//!     let month = service.daily_series_last("AAPL", SeriesWindow::Last30).await?;
//!     println!("{} points", month.value.len());
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use quotes_core::*;

// Cache implementations
pub use quotes_cache::{InMemoryCache, NoopCache};

// Providers
#[cfg(feature = "alphavantage")]
pub use quotes_alphavantage::AlphaVantageProvider;

#[cfg(feature = "alphavantage")]
mod config;
#[cfg(feature = "alphavantage")]
pub use config::{
    API_KEY_VAR, BASE_URL_VAR, Config, ConfigError, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, TIMEOUT_VAR,
};

mod observer;
pub use observer::{FetchEvent, FetchObserver, RecordingObserver, TracingObserver};

mod service;
pub use service::{Cached, Fetched, MarketDataService, Origin};
