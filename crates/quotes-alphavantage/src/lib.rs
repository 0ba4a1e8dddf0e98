#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Alpha Vantage data provider.
//!
//! This crate implements the [`MarketDataProvider`] trait for the
//! [Alpha Vantage](https://www.alphavantage.co/) query API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quotes_alphavantage::AlphaVantageProvider;
//! use quotes_core::{MarketDataProvider, MarketDataRequest, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = AlphaVantageProvider::new("your_api_key");
//!
//!     let request = MarketDataRequest::Quote(Symbol::parse("AAPL")?);
//!     let quote = provider.fetch(&request).await?.into_quote()?;
//!     println!("{} @ {}", quote.symbol, quote.price);
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use quotes_core::{
    FailureClass, MarketData, MarketDataProvider, MarketDataRequest, UpstreamFailure,
    translate::classify_status,
};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

mod payload;

use payload::{Payload, expected_key};

/// Default Alpha Vantage query endpoint.
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Alpha Vantage data provider.
///
/// Provides access to:
/// - Global quotes
/// - Daily, weekly and monthly price history
/// - Company overviews
/// - Gold and silver spot prices
/// - Symbol search
#[derive(Clone)]
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for AlphaVantageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AlphaVantageProvider {
    /// Create a new provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key)
    }

    /// Create a new provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the provider at a different query endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured query endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the query parameters for a request, API key excluded.
    fn query_params(request: &MarketDataRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![("function", request.operation().as_str().to_string())];
        match request {
            MarketDataRequest::Quote(symbol)
            | MarketDataRequest::Series(symbol, _)
            | MarketDataRequest::Overview(symbol) => params.push(("symbol", symbol.to_string())),
            MarketDataRequest::Spot(metal) => params.push(("symbol", metal.code().to_string())),
            MarketDataRequest::Search(keywords) => {
                params.push(("keywords", keywords.as_str().to_string()));
            }
        }
        params
    }

    /// Make one GET request and decode the JSON body.
    async fn get(&self, request: &MarketDataRequest) -> Result<Value, UpstreamFailure> {
        let mut params = Self::query_params(request);
        debug!("Alpha Vantage request: {:?}", params);
        params.push(("apikey", self.api_key.clone()));

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key.
                UpstreamFailure::new(
                    FailureClass::ServiceUnavailable,
                    format!("Network error: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = format!("HTTP {status}: {text}");
            let failure = UpstreamFailure::new(classify_status(code), message);
            return Err(failure.with_status(code));
        }

        let text = response.text().await.map_err(|e| {
            UpstreamFailure::new(
                FailureClass::ServiceUnavailable,
                format!("Failed to read response body: {}", e.without_url()),
            )
        })?;

        serde_json::from_str(&text)
            .map_err(|e| UpstreamFailure::new(FailureClass::Malformed, format!("{e}: {text}")))
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    async fn fetch(&self, request: &MarketDataRequest) -> Result<MarketData, UpstreamFailure> {
        let body = self.get(request).await?;

        match Payload::resolve(body, expected_key(request.operation())) {
            Payload::Data(data) => payload::parse(request, data),
            other => Err(other.into_failure(request)),
        }
    }
}
