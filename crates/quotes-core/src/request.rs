//! Logical data requests and the cache keys derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Keywords, Symbol};

/// Bar interval of a price history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesInterval {
    /// Daily bars.
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

/// Precious metal with a spot price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metal {
    /// Gold (XAU).
    Gold,
    /// Silver (XAG).
    Silver,
}

impl Metal {
    /// Returns the ISO 4217 metal code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Gold => "XAU",
            Self::Silver => "XAG",
        }
    }
}

/// Logical operation name, one per upstream function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Latest quote.
    GlobalQuote,
    /// Daily price history.
    DailySeries,
    /// Weekly price history.
    WeeklySeries,
    /// Monthly price history.
    MonthlySeries,
    /// Company reference data.
    CompanyOverview,
    /// Metal spot price.
    SpotPrice,
    /// Symbol search.
    SymbolSearch,
}

impl Operation {
    /// Returns the operation name, matching the upstream function selector.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalQuote => "GLOBAL_QUOTE",
            Self::DailySeries => "TIME_SERIES_DAILY",
            Self::WeeklySeries => "TIME_SERIES_WEEKLY",
            Self::MonthlySeries => "TIME_SERIES_MONTHLY",
            Self::CompanyOverview => "OVERVIEW",
            Self::SpotPrice => "GOLD_SILVER_SPOT",
            Self::SymbolSearch => "SYMBOL_SEARCH",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request for one logical resource.
///
/// Holding a [`Symbol`] or [`Keywords`] means input validation already
/// happened, so building a request can never reach the network with bad input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MarketDataRequest {
    /// Latest quote for a symbol.
    Quote(Symbol),
    /// Price history for a symbol.
    Series(Symbol, SeriesInterval),
    /// Company overview for a symbol.
    Overview(Symbol),
    /// Metal spot price.
    Spot(Metal),
    /// Symbol search.
    Search(Keywords),
}

impl MarketDataRequest {
    /// Returns the logical operation of this request.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Quote(_) => Operation::GlobalQuote,
            Self::Series(_, SeriesInterval::Daily) => Operation::DailySeries,
            Self::Series(_, SeriesInterval::Weekly) => Operation::WeeklySeries,
            Self::Series(_, SeriesInterval::Monthly) => Operation::MonthlySeries,
            Self::Overview(_) => Operation::CompanyOverview,
            Self::Spot(_) => Operation::SpotPrice,
            Self::Search(_) => Operation::SymbolSearch,
        }
    }

    /// Returns the normalized subject (symbol, metal code or folded keywords).
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::Quote(s) | Self::Series(s, _) | Self::Overview(s) => s.to_string(),
            Self::Spot(metal) => metal.code().to_string(),
            Self::Search(keywords) => keywords.normalized(),
        }
    }

    /// Returns the cache key addressing this request's result.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.operation(), self.subject())
    }
}

/// Composite cache address: operation plus normalized subject.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    operation: Operation,
    subject: String,
}

impl CacheKey {
    /// Creates a key from its parts. The subject is expected to be normalized already.
    #[must_use]
    pub fn new(operation: Operation, subject: impl Into<String>) -> Self {
        Self {
            operation,
            subject: subject.into(),
        }
    }

    /// Returns the operation part.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the subject part.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.subject)
    }
}
