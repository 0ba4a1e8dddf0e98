//! Core data types for market data.
//!
//! This module defines the validated identifiers and the result records:
//!
//! - [`Symbol`] - Validated, uppercased ticker
//! - [`Keywords`] - Validated symbol search text
//! - [`TimeSeriesPoint`] / [`TimeSeries`] - OHLCV history, most recent first
//! - [`GlobalQuote`] - Latest quote for a symbol
//! - [`CompanyOverview`] - Company reference data
//! - [`SpotPrice`] - Precious metal spot price
//! - [`SymbolMatch`] - Symbol search hit
//! - [`MarketData`] - Tagged union of all results, as stored in the cache

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::error::{QuoteError, Result};
use crate::request::SeriesInterval;

/// Maximum length of a ticker symbol.
pub const MAX_SYMBOL_LEN: usize = 10;

/// Maximum length of a symbol search query.
pub const MAX_KEYWORDS_LEN: usize = 50;

/// A trading symbol/ticker.
///
/// Symbols are validated and uppercased on creation: 1 to
/// [`MAX_SYMBOL_LEN`] characters of ASCII letters, digits, `-` or `.`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validates and normalizes a symbol.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_SYMBOL_LEN {
            return Err(QuoteError::Validation(format!(
                "Invalid symbol format: {s:?} (expected 1-{MAX_SYMBOL_LEN} characters)"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(QuoteError::Validation(format!(
                "Invalid symbol format: {s:?}"
            )));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = QuoteError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Free-text query for symbol search.
///
/// Trimmed on creation; must be non-empty and at most [`MAX_KEYWORDS_LEN`]
/// characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Keywords(String);

impl Keywords {
    /// Validates and trims search keywords.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuoteError::Validation("Search keywords must not be empty".into()));
        }
        if s.chars().count() > MAX_KEYWORDS_LEN {
            return Err(QuoteError::Validation(format!(
                "Search keywords longer than {MAX_KEYWORDS_LEN} characters"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the keywords as sent upstream.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the case-folded form used for cache addressing.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Keywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One OHLCV bar of a daily, weekly or monthly series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Bar date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Trading volume.
    pub volume: u64,
}

impl TimeSeriesPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Price history for a symbol, ordered by date descending.
///
/// The ordering is established at construction so that "most recent N"
/// slices never need to re-sort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    symbol: Symbol,
    interval: SeriesInterval,
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    /// Creates a series, sorting the points most recent first.
    #[must_use]
    pub fn new(symbol: Symbol, interval: SeriesInterval, mut points: Vec<TimeSeriesPoint>) -> Self {
        points.sort_by_key(|p| Reverse(p.date));
        Self {
            symbol,
            interval,
            points,
        }
    }

    /// Returns the symbol this series belongs to.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Returns the bar interval.
    #[must_use]
    pub const fn interval(&self) -> SeriesInterval {
        self.interval
    }

    /// Returns the points, most recent first.
    #[must_use]
    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// Returns the most recent point.
    #[must_use]
    pub fn latest(&self) -> Option<&TimeSeriesPoint> {
        self.points.first()
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns an iterator over the points, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesPoint> {
        self.points.iter()
    }

    /// Returns a series holding the first `n` points. Caller guarantees ordering is kept.
    pub(crate) fn truncated(&self, n: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            interval: self.interval,
            points: self.points.iter().take(n).cloned().collect(),
        }
    }
}

/// Latest quote for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalQuote {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Opening price of the latest trading day.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Last traded price.
    pub price: f64,
    /// Session volume.
    pub volume: u64,
    /// Date of the latest trading day.
    pub latest_trading_day: NaiveDate,
    /// Previous session close.
    pub previous_close: f64,
    /// Absolute change against the previous close.
    pub change: f64,
    /// Percentage change against the previous close.
    pub change_percent: f64,
}

/// Company reference information.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Business description.
    pub description: Option<String>,
    /// Asset type (e.g. "Common Stock").
    pub asset_type: Option<String>,
    /// Primary exchange.
    pub exchange: Option<String>,
    /// Trading currency.
    pub currency: Option<String>,
    /// Country of incorporation.
    pub country: Option<String>,
    /// Business sector.
    pub sector: Option<String>,
    /// Industry within the sector.
    pub industry: Option<String>,
    /// SEC CIK number.
    pub cik: Option<String>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Price-to-earnings ratio.
    pub pe_ratio: Option<f64>,
    /// Price/earnings-to-growth ratio.
    pub peg_ratio: Option<f64>,
    /// Book value per share.
    pub book_value: Option<f64>,
    /// Dividend per share.
    pub dividend_per_share: Option<f64>,
    /// Dividend yield.
    pub dividend_yield: Option<f64>,
    /// Earnings per share.
    pub eps: Option<f64>,
    /// Beta coefficient.
    pub beta: Option<f64>,
    /// 52-week high price.
    pub week_52_high: Option<f64>,
    /// 52-week low price.
    pub week_52_low: Option<f64>,
    /// 50-day moving average.
    pub moving_average_50: Option<f64>,
    /// 200-day moving average.
    pub moving_average_200: Option<f64>,
    /// Shares outstanding.
    pub shares_outstanding: Option<f64>,
}

impl CompanyOverview {
    /// Creates an overview with required fields; everything else is empty.
    #[must_use]
    pub fn new(symbol: Symbol, name: impl Into<String>) -> Self {
        Self {
            symbol,
            name: name.into(),
            description: None,
            asset_type: None,
            exchange: None,
            currency: None,
            country: None,
            sector: None,
            industry: None,
            cik: None,
            market_cap: None,
            pe_ratio: None,
            peg_ratio: None,
            book_value: None,
            dividend_per_share: None,
            dividend_yield: None,
            eps: None,
            beta: None,
            week_52_high: None,
            week_52_low: None,
            moving_average_50: None,
            moving_average_200: None,
            shares_outstanding: None,
        }
    }
}

/// Precious metal spot price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpotPrice {
    /// Metal code (`XAU` or `XAG`).
    pub symbol: String,
    /// Display name reported upstream.
    pub name: Option<String>,
    /// Spot price in USD.
    pub price: f64,
    /// Quote timestamp as reported upstream.
    pub timestamp: Option<String>,
}

/// One result of a symbol search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    /// Matched ticker. Kept verbatim since search hits may carry exchange suffixes.
    pub symbol: String,
    /// Security name.
    pub name: String,
    /// Security type (e.g. "Equity", "ETF").
    pub kind: String,
    /// Listing region.
    pub region: String,
    /// Local market open time.
    pub market_open: String,
    /// Local market close time.
    pub market_close: String,
    /// Market timezone.
    pub timezone: String,
    /// Trading currency.
    pub currency: String,
    /// Relevance in `[0, 1]`.
    pub match_score: f64,
}

/// Any result the upstream provider can return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MarketData {
    /// Latest quote.
    Quote(GlobalQuote),
    /// Daily, weekly or monthly history.
    Series(TimeSeries),
    /// Company reference data.
    Overview(Box<CompanyOverview>),
    /// Metal spot price.
    Spot(SpotPrice),
    /// Symbol search hits.
    Matches(Vec<SymbolMatch>),
}

impl MarketData {
    /// Returns a short label for the variant, used in error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Series(_) => "series",
            Self::Overview(_) => "overview",
            Self::Spot(_) => "spot",
            Self::Matches(_) => "matches",
        }
    }

    /// Extracts the quote, or fails with an unknown error.
    pub fn into_quote(self) -> Result<GlobalQuote> {
        match self {
            Self::Quote(q) => Ok(q),
            other => Err(unexpected("quote", &other)),
        }
    }

    /// Extracts the time series, or fails with an unknown error.
    pub fn into_series(self) -> Result<TimeSeries> {
        match self {
            Self::Series(s) => Ok(s),
            other => Err(unexpected("series", &other)),
        }
    }

    /// Extracts the company overview, or fails with an unknown error.
    pub fn into_overview(self) -> Result<CompanyOverview> {
        match self {
            Self::Overview(o) => Ok(*o),
            other => Err(unexpected("overview", &other)),
        }
    }

    /// Extracts the spot price, or fails with an unknown error.
    pub fn into_spot(self) -> Result<SpotPrice> {
        match self {
            Self::Spot(s) => Ok(s),
            other => Err(unexpected("spot", &other)),
        }
    }

    /// Extracts the search matches, or fails with an unknown error.
    pub fn into_matches(self) -> Result<Vec<SymbolMatch>> {
        match self {
            Self::Matches(m) => Ok(m),
            other => Err(unexpected("matches", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &MarketData) -> QuoteError {
    QuoteError::Unknown(format!("Expected {expected} data, got {}", got.label()))
}
