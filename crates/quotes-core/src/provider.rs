//! Provider trait for fetching market data from an upstream service.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::UpstreamFailure, request::MarketDataRequest, types::MarketData};

/// An upstream market data source.
///
/// Implementations perform exactly one outbound call per [`fetch`](Self::fetch)
/// and never retry. Failures carry a [`FailureClass`](crate::FailureClass)
/// which the caller translates into a [`QuoteError`](crate::QuoteError).
#[async_trait]
pub trait MarketDataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Alpha Vantage").
    fn name(&self) -> &str;

    /// Fetches the result for one request.
    async fn fetch(&self, request: &MarketDataRequest) -> Result<MarketData, UpstreamFailure>;
}
