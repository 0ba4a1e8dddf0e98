//! Resolution of raw Alpha Vantage bodies into typed market data.
//!
//! Alpha Vantage reports many failures with HTTP 200 and a JSON object that
//! carries a `Note`, `Information` or `Error Message` field instead of data.
//! [`Payload::resolve`] sorts a body into data, notice, empty or malformed
//! before any field mapping runs.

use chrono::NaiveDate;
use quotes_core::{
    CompanyOverview, FailureClass, GlobalQuote, MarketData, MarketDataRequest, Operation,
    SeriesInterval, SpotPrice, Symbol, SymbolMatch, TimeSeries, TimeSeriesPoint, UpstreamFailure,
    translate::{classify_error_message, classify_notice},
};
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A decoded response body, classified.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    /// The expected data key is present.
    Data(Map<String, Value>),
    /// The provider sent a notice instead of data.
    Notice(Notice),
    /// An empty object.
    Empty,
    /// Not an object, or missing the expected key.
    Malformed(String),
}

/// Provider notice embedded in a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
    /// `Note`: historically used for throttling.
    Note(String),
    /// `Information`: throttling, premium endpoints, demo key warnings.
    Information(String),
    /// `Error Message`: invalid call, unknown symbol or rejected key.
    ErrorMessage(String),
}

impl Notice {
    /// Converts the notice into a classified failure.
    pub(crate) fn into_failure(self) -> UpstreamFailure {
        match self {
            Self::ErrorMessage(text) => UpstreamFailure::new(classify_error_message(&text), text),
            Self::Note(text) | Self::Information(text) => {
                UpstreamFailure::new(classify_notice(&text), text)
            }
        }
    }
}

impl Payload {
    /// Classifies a decoded body against the data key the operation expects.
    pub(crate) fn resolve(body: Value, expected_key: &str) -> Self {
        let Value::Object(map) = body else {
            return Self::Malformed("Expected a JSON object".to_string());
        };

        if let Some(text) = map.get("Error Message") {
            return Self::Notice(Notice::ErrorMessage(value_text(text)));
        }
        if let Some(text) = map.get("Note") {
            return Self::Notice(Notice::Note(value_text(text)));
        }
        if let Some(text) = map.get("Information") {
            return Self::Notice(Notice::Information(value_text(text)));
        }
        if map.is_empty() {
            return Self::Empty;
        }
        if !map.contains_key(expected_key) {
            return Self::Malformed(format!("Missing \"{expected_key}\" in response"));
        }
        Self::Data(map)
    }

    /// Converts an unusable body into a failure for `request`.
    ///
    /// `OVERVIEW` answers an unknown symbol with `{}`, so an empty overview is a
    /// missing resource. An empty body anywhere else is malformed.
    pub(crate) fn into_failure(self, request: &MarketDataRequest) -> UpstreamFailure {
        match (self, request) {
            (Self::Notice(notice), _) => notice.into_failure(),
            (Self::Empty, MarketDataRequest::Overview(symbol)) => {
                let message = format!("No overview available for {symbol}");
                UpstreamFailure::new(FailureClass::NotFound, message)
            }
            (Self::Empty, _) => malformed(EMPTY_BODY),
            (Self::Malformed(reason), _) => malformed(reason),
            (Self::Data(_), _) => malformed("Unexpected data payload"),
        }
    }
}

const EMPTY_BODY: &str = "Empty response from Alpha Vantage";

fn malformed(message: impl Into<String>) -> UpstreamFailure {
    UpstreamFailure::new(FailureClass::Malformed, message)
}

fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

/// Returns the top-level key holding the data for an operation.
pub(crate) const fn expected_key(operation: Operation) -> &'static str {
    match operation {
        Operation::GlobalQuote => "Global Quote",
        Operation::DailySeries => "Time Series (Daily)",
        Operation::WeeklySeries => "Weekly Time Series",
        Operation::MonthlySeries => "Monthly Time Series",
        Operation::CompanyOverview => "Symbol",
        Operation::SpotPrice => "price",
        Operation::SymbolSearch => "bestMatches",
    }
}

/// Maps a resolved data object onto the result type of `request`.
pub(crate) fn parse(
    request: &MarketDataRequest,
    mut data: Map<String, Value>,
) -> Result<MarketData, UpstreamFailure> {
    let key = expected_key(request.operation());
    match request {
        MarketDataRequest::Quote(symbol) => {
            let raw = data.remove(key).unwrap_or(Value::Null);
            // Unknown symbols come back as an empty quote object.
            if raw.as_object().is_some_and(Map::is_empty) {
                return Err(UpstreamFailure::new(
                    FailureClass::NotFound,
                    format!("No quote available for {symbol}"),
                ));
            }
            let quote: AvGlobalQuote = decode(raw)?;
            Ok(MarketData::Quote(quote.into_quote(symbol.clone())))
        }
        MarketDataRequest::Series(symbol, interval) => {
            let raw: BTreeMap<String, AvBar> = decode(data.remove(key).unwrap_or(Value::Null))?;
            parse_series(symbol, *interval, raw).map(MarketData::Series)
        }
        MarketDataRequest::Overview(symbol) => {
            let raw: AvOverview = decode(Value::Object(data))?;
            let overview = raw.into_overview(symbol.clone());
            Ok(MarketData::Overview(Box::new(overview)))
        }
        MarketDataRequest::Spot(metal) => {
            let spot: AvSpot = decode(Value::Object(data))?;
            Ok(MarketData::Spot(SpotPrice {
                symbol: spot.symbol.unwrap_or_else(|| metal.code().into()),
                name: spot.name,
                price: spot.price,
                timestamp: spot.timestamp,
            }))
        }
        MarketDataRequest::Search(_) => {
            let matches: Vec<AvSymbolMatch> = decode(data.remove(key).unwrap_or(Value::Null))?;
            Ok(MarketData::Matches(
                matches.into_iter().map(AvSymbolMatch::into_match).collect(),
            ))
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, UpstreamFailure> {
    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}

fn parse_series(
    symbol: &Symbol,
    interval: SeriesInterval,
    raw: BTreeMap<String, AvBar>,
) -> Result<TimeSeries, UpstreamFailure> {
    if raw.is_empty() {
        return Err(malformed(format!("Empty {interval:?} series for {symbol}")));
    }

    let points = raw
        .into_iter()
        .map(|(date, bar)| {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| malformed(format!("Bad date {date:?}: {e}")))?;
            let AvBar {
                open,
                high,
                low,
                close,
                volume,
            } = bar;
            Ok(TimeSeriesPoint::new(date, open, high, low, close, volume))
        })
        .collect::<Result<Vec<_>, UpstreamFailure>>()?;

    Ok(TimeSeries::new(symbol.clone(), interval, points))
}

// ============================================================================
// Alpha Vantage Response Types
// ============================================================================

/// `Global Quote` object.
#[derive(Debug, Clone, Deserialize)]
struct AvGlobalQuote {
    #[serde(rename = "02. open", deserialize_with = "de_f64")]
    open: f64,
    #[serde(rename = "03. high", deserialize_with = "de_f64")]
    high: f64,
    #[serde(rename = "04. low", deserialize_with = "de_f64")]
    low: f64,
    #[serde(rename = "05. price", deserialize_with = "de_f64")]
    price: f64,
    #[serde(rename = "06. volume", deserialize_with = "de_u64")]
    volume: u64,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: NaiveDate,
    #[serde(rename = "08. previous close", deserialize_with = "de_f64")]
    previous_close: f64,
    #[serde(rename = "09. change", deserialize_with = "de_f64")]
    change: f64,
    #[serde(rename = "10. change percent", deserialize_with = "de_f64")]
    change_percent: f64,
}

impl AvGlobalQuote {
    fn into_quote(self, symbol: Symbol) -> GlobalQuote {
        GlobalQuote {
            symbol,
            open: self.open,
            high: self.high,
            low: self.low,
            price: self.price,
            volume: self.volume,
            latest_trading_day: self.latest_trading_day,
            previous_close: self.previous_close,
            change: self.change,
            change_percent: self.change_percent,
        }
    }
}

/// One bar of a `Time Series (Daily)`, `Weekly Time Series` or `Monthly Time Series` object.
#[derive(Debug, Clone, Deserialize)]
struct AvBar {
    #[serde(rename = "1. open", deserialize_with = "de_f64")]
    open: f64,
    #[serde(rename = "2. high", deserialize_with = "de_f64")]
    high: f64,
    #[serde(rename = "3. low", deserialize_with = "de_f64")]
    low: f64,
    #[serde(rename = "4. close", deserialize_with = "de_f64")]
    close: f64,
    #[serde(rename = "5. volume", deserialize_with = "de_u64", default)]
    volume: u64,
}

/// `OVERVIEW` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AvOverview {
    #[serde(default)]
    name: String,
    description: Option<String>,
    asset_type: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
    country: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    #[serde(rename = "CIK")]
    cik: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    market_capitalization: Option<f64>,
    #[serde(rename = "PERatio", default, deserialize_with = "de_opt_f64")]
    pe_ratio: Option<f64>,
    #[serde(rename = "PEGRatio", default, deserialize_with = "de_opt_f64")]
    peg_ratio: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    book_value: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    dividend_per_share: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    dividend_yield: Option<f64>,
    #[serde(rename = "EPS", default, deserialize_with = "de_opt_f64")]
    eps: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    beta: Option<f64>,
    #[serde(rename = "52WeekHigh", default, deserialize_with = "de_opt_f64")]
    week_52_high: Option<f64>,
    #[serde(rename = "52WeekLow", default, deserialize_with = "de_opt_f64")]
    week_52_low: Option<f64>,
    #[serde(
        rename = "50DayMovingAverage",
        default,
        deserialize_with = "de_opt_f64"
    )]
    moving_average_50: Option<f64>,
    #[serde(
        rename = "200DayMovingAverage",
        default,
        deserialize_with = "de_opt_f64"
    )]
    moving_average_200: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    shares_outstanding: Option<f64>,
}

impl AvOverview {
    fn into_overview(self, symbol: Symbol) -> CompanyOverview {
        let mut overview = CompanyOverview::new(symbol, self.name);
        overview.description = self.description;
        overview.asset_type = self.asset_type;
        overview.exchange = self.exchange;
        overview.currency = self.currency;
        overview.country = self.country;
        overview.sector = self.sector;
        overview.industry = self.industry;
        overview.cik = self.cik;
        overview.market_cap = self.market_capitalization;
        overview.pe_ratio = self.pe_ratio;
        overview.peg_ratio = self.peg_ratio;
        overview.book_value = self.book_value;
        overview.dividend_per_share = self.dividend_per_share;
        overview.dividend_yield = self.dividend_yield;
        overview.eps = self.eps;
        overview.beta = self.beta;
        overview.week_52_high = self.week_52_high;
        overview.week_52_low = self.week_52_low;
        overview.moving_average_50 = self.moving_average_50;
        overview.moving_average_200 = self.moving_average_200;
        overview.shares_outstanding = self.shares_outstanding;
        overview
    }
}

/// `GOLD_SILVER_SPOT` response.
#[derive(Debug, Clone, Deserialize)]
struct AvSpot {
    symbol: Option<String>,
    name: Option<String>,
    #[serde(deserialize_with = "de_f64")]
    price: f64,
    timestamp: Option<String>,
}

/// One entry of `bestMatches`.
#[derive(Debug, Clone, Deserialize)]
struct AvSymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name", default)]
    name: String,
    #[serde(rename = "3. type", default)]
    kind: String,
    #[serde(rename = "4. region", default)]
    region: String,
    #[serde(rename = "5. marketOpen", default)]
    market_open: String,
    #[serde(rename = "6. marketClose", default)]
    market_close: String,
    #[serde(rename = "7. timezone", default)]
    timezone: String,
    #[serde(rename = "8. currency", default)]
    currency: String,
    #[serde(rename = "9. matchScore", default, deserialize_with = "de_f64")]
    match_score: f64,
}

impl AvSymbolMatch {
    fn into_match(self) -> SymbolMatch {
        SymbolMatch {
            symbol: self.symbol,
            name: self.name,
            kind: self.kind,
            region: self.region,
            market_open: self.market_open,
            market_close: self.market_close,
            timezone: self.timezone,
            currency: self.currency,
            match_score: self.match_score,
        }
    }
}

/// Alpha Vantage sends numbers as strings, sometimes suffixed with `%`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().trim_end_matches('%').parse().ok(),
        }
    }
}

fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = NumberOrText::deserialize(deserializer)?;
    raw.as_f64()
        .ok_or_else(|| serde::de::Error::custom("expected a numeric value"))
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = de_f64(deserializer)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value as u64)
    } else {
        Err(serde::de::Error::custom("expected a non-negative volume"))
    }
}

/// Lenient: `"None"`, `"-"` and other non-numeric text become `None`.
fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.as_f64()))
}
