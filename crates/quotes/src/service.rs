//! Fetch orchestration: cache lookup, upstream fetch, error translation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use quotes_cache::InMemoryCache;
use quotes_core::{
    CompanyOverview, GlobalQuote, Keywords, MarketData, MarketDataProvider, MarketDataRequest,
    Metal, Operation, QuoteCache, QuoteError, Result, SeriesInterval, SeriesWindow, SpotPrice,
    Symbol, SymbolMatch, TimeSeries, last_n, translate::translate,
};

use crate::observer::{FetchEvent, FetchObserver, TracingObserver};

/// Where a returned value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Served from a fresh cache entry.
    Cache,
    /// Fetched from the upstream provider by this call.
    Upstream,
}

/// A value together with its [`Origin`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Fetched<T> {
    /// The result.
    pub value: T,
    /// Where it came from.
    pub origin: Origin,
}

impl<T> Fetched<T> {
    /// Returns true if the value was served from cache.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cache
    }

    /// Discards the origin.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Applies a fallible conversion to the value, keeping the origin.
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Fetched<U>> {
        Ok(Fetched {
            value: f(self.value)?,
            origin: self.origin,
        })
    }
}

/// A cache entry read without going upstream, possibly stale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cached<T> {
    /// The cached result.
    pub value: T,
    /// When it was stored.
    pub stored_at: DateTime<Utc>,
    /// TTL the entry is judged against.
    pub ttl: Duration,
    /// True once the entry has outlived its TTL.
    pub stale: bool,
}

/// Front door for all market data reads.
///
/// Every typed operation validates its input, then goes through
/// [`get_or_fetch`](Self::get_or_fetch): a fresh cache entry is returned
/// as-is, otherwise the provider is called once and a successful result is
/// cached. Failures are translated into [`QuoteError`] and never cached.
///
/// Concurrent misses for the same key are not coalesced; each performs its own
/// upstream call and the last write wins.
///
/// # Example
///
/// ```rust,ignore
/// use quotes::{Config, MarketDataService, SeriesWindow};
///
/// let service = MarketDataService::from_config(&Config::from_env()?);
/// let week = service.daily_series_last("IBM", SeriesWindow::Last7).await?;
/// assert!(week.value.len() <= 7);
/// ```
pub struct MarketDataService {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<dyn QuoteCache>,
    observer: Arc<dyn FetchObserver>,
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .field("observer", &self.observer)
            .finish()
    }
}

impl MarketDataService {
    /// Create a service over `provider` with an in-memory cache and tracing observer.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(InMemoryCache::new()),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Create a service backed by Alpha Vantage from startup configuration.
    #[cfg(feature = "alphavantage")]
    #[must_use]
    pub fn from_config(config: &crate::Config) -> Self {
        let api_key = config.api_key.clone();
        let provider = quotes_alphavantage::AlphaVantageProvider::new(api_key)
            .with_base_url(config.base_url.clone())
            .with_timeout(config.timeout);
        Self::new(Arc::new(provider))
    }

    /// Replace the cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn QuoteCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Return the cached result for `request` if fresh, otherwise fetch it upstream.
    pub async fn get_or_fetch(&self, request: &MarketDataRequest) -> Result<Fetched<MarketData>> {
        let operation = request.operation();
        let key = request.cache_key();

        self.observer.on_event(&FetchEvent::Attempt {
            operation,
            key: key.clone(),
        });

        if let Some(value) = self.cache.get(&key).await {
            let event = FetchEvent::CacheHit { operation, key };
            self.observer.on_event(&event);
            return Ok(Fetched {
                value,
                origin: Origin::Cache,
            });
        }

        debug!(
            provider = self.provider.name(),
            key = %key,
            "Cache miss, fetching upstream"
        );

        match self.provider.fetch(request).await {
            Ok(value) => {
                self.cache.put(key.clone(), value.clone()).await;
                let event = FetchEvent::Success { operation, key };
                self.observer.on_event(&event);
                Ok(Fetched {
                    value,
                    origin: Origin::Upstream,
                })
            }
            Err(failure) => {
                debug!(
                    provider = self.provider.name(),
                    key = %key,
                    status = ?failure.status,
                    class = ?failure.class,
                    "Upstream failure"
                );
                let error = translate(&failure);
                self.observer.on_event(&FetchEvent::Failure {
                    operation,
                    key,
                    kind: error.kind(),
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Run [`get_or_fetch`](Self::get_or_fetch) for several requests concurrently.
    ///
    /// Results are returned in input order; one failure does not affect the others.
    pub async fn fetch_many(
        &self,
        requests: &[MarketDataRequest],
    ) -> Vec<Result<Fetched<MarketData>>> {
        let pending = requests.iter().map(|r| self.get_or_fetch(r));
        join_all(pending).await
    }

    /// Latest quote for a symbol.
    pub async fn stock_price(&self, symbol: &str) -> Result<Fetched<GlobalQuote>> {
        let symbol = parse_input(Operation::GlobalQuote, symbol, Symbol::parse)?;
        self.get_or_fetch(&MarketDataRequest::Quote(symbol))
            .await?
            .try_map(MarketData::into_quote)
    }

    /// Full daily price history, most recent first.
    pub async fn daily_series(&self, symbol: &str) -> Result<Fetched<TimeSeries>> {
        self.series(symbol, SeriesInterval::Daily).await
    }

    /// The most recent `window` daily points.
    ///
    /// Shares the cache entry of [`daily_series`](Self::daily_series).
    pub async fn daily_series_last(
        &self,
        symbol: &str,
        window: SeriesWindow,
    ) -> Result<Fetched<TimeSeries>> {
        self.daily_series(symbol)
            .await?
            .try_map(|series| last_n(&series, window.days()))
    }

    /// Full weekly price history, most recent first.
    pub async fn weekly_series(&self, symbol: &str) -> Result<Fetched<TimeSeries>> {
        self.series(symbol, SeriesInterval::Weekly).await
    }

    /// Full monthly price history, most recent first.
    pub async fn monthly_series(&self, symbol: &str) -> Result<Fetched<TimeSeries>> {
        self.series(symbol, SeriesInterval::Monthly).await
    }

    async fn series(&self, symbol: &str, interval: SeriesInterval) -> Result<Fetched<TimeSeries>> {
        let operation = match interval {
            SeriesInterval::Daily => Operation::DailySeries,
            SeriesInterval::Weekly => Operation::WeeklySeries,
            SeriesInterval::Monthly => Operation::MonthlySeries,
        };
        let symbol = parse_input(operation, symbol, Symbol::parse)?;
        let request = MarketDataRequest::Series(symbol, interval);
        self.get_or_fetch(&request)
            .await?
            .try_map(MarketData::into_series)
    }

    /// Company reference data.
    pub async fn company_overview(&self, symbol: &str) -> Result<Fetched<CompanyOverview>> {
        let symbol = parse_input(Operation::CompanyOverview, symbol, Symbol::parse)?;
        self.get_or_fetch(&MarketDataRequest::Overview(symbol))
            .await?
            .try_map(MarketData::into_overview)
    }

    /// Gold spot price.
    pub async fn gold_spot_price(&self) -> Result<Fetched<SpotPrice>> {
        self.spot(Metal::Gold).await
    }

    /// Silver spot price.
    pub async fn silver_spot_price(&self) -> Result<Fetched<SpotPrice>> {
        self.spot(Metal::Silver).await
    }

    async fn spot(&self, metal: Metal) -> Result<Fetched<SpotPrice>> {
        self.get_or_fetch(&MarketDataRequest::Spot(metal))
            .await?
            .try_map(MarketData::into_spot)
    }

    /// Symbols matching free-text keywords.
    pub async fn search_symbol(&self, keywords: &str) -> Result<Fetched<Vec<SymbolMatch>>> {
        let keywords = parse_input(Operation::SymbolSearch, keywords, Keywords::parse)?;
        self.get_or_fetch(&MarketDataRequest::Search(keywords))
            .await?
            .try_map(MarketData::into_matches)
    }

    /// Cached quote for a symbol, without going upstream.
    ///
    /// Returns `None` when nothing is cached, or when the entry is stale and
    /// `include_stale` is false.
    pub async fn cached_stock_price(
        &self,
        symbol: &str,
        include_stale: bool,
    ) -> Result<Option<Cached<GlobalQuote>>> {
        let symbol = parse_input(Operation::GlobalQuote, symbol, Symbol::parse)?;
        let request = MarketDataRequest::Quote(symbol);
        self.cached(&request, include_stale, MarketData::into_quote)
            .await
    }

    /// Cached daily series for a symbol, without going upstream.
    pub async fn cached_daily_series(
        &self,
        symbol: &str,
        include_stale: bool,
    ) -> Result<Option<Cached<TimeSeries>>> {
        let symbol = parse_input(Operation::DailySeries, symbol, Symbol::parse)?;
        let request = MarketDataRequest::Series(symbol, SeriesInterval::Daily);
        self.cached(&request, include_stale, MarketData::into_series)
            .await
    }

    /// Cached company overview for a symbol, without going upstream.
    pub async fn cached_company_overview(
        &self,
        symbol: &str,
        include_stale: bool,
    ) -> Result<Option<Cached<CompanyOverview>>> {
        let symbol = parse_input(Operation::CompanyOverview, symbol, Symbol::parse)?;
        let request = MarketDataRequest::Overview(symbol);
        self.cached(&request, include_stale, MarketData::into_overview)
            .await
    }

    async fn cached<T>(
        &self,
        request: &MarketDataRequest,
        include_stale: bool,
        narrow: impl FnOnce(MarketData) -> Result<T>,
    ) -> Result<Option<Cached<T>>> {
        let Some(entry) = self.cache.peek(&request.cache_key()).await else {
            return Ok(None);
        };
        if entry.stale && !include_stale {
            return Ok(None);
        }
        Ok(Some(Cached {
            value: narrow(entry.value)?,
            stored_at: entry.stored_at,
            ttl: entry.ttl,
            stale: entry.stale,
        }))
    }

    /// Drop expired cache entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }
}

/// Parses caller input, logging the raw value when it is rejected.
fn parse_input<T>(
    operation: Operation,
    input: &str,
    parse: impl FnOnce(&str) -> Result<T>,
) -> Result<T> {
    parse(input).inspect_err(|e: &QuoteError| {
        warn!(
            operation = %operation,
            input = ?input,
            kind = %e.kind(),
            error = %e,
            "Rejected request"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeDelta};
    use quotes_core::{ErrorKind, FailureClass, ManualClock, TimeSeriesPoint, UpstreamFailure};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning canned data and counting upstream calls.
    #[derive(Debug, Default)]
    struct FakeProvider {
        calls: AtomicUsize,
        failure: Option<UpstreamFailure>,
        delay: Option<Duration>,
    }

    impl FakeProvider {
        fn failing(class: FailureClass, message: &str) -> Self {
            Self {
                failure: Some(UpstreamFailure::new(class, message)),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        fn name(&self) -> &str {
            "Fake"
        }

        async fn fetch(
            &self,
            request: &MarketDataRequest,
        ) -> std::result::Result<MarketData, UpstreamFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.failure {
                Some(failure) => Err(failure.clone()),
                None => Ok(canned(request)),
            }
        }
    }

    fn canned(request: &MarketDataRequest) -> MarketData {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        match request {
            MarketDataRequest::Quote(symbol) => MarketData::Quote(GlobalQuote {
                symbol: symbol.clone(),
                open: 189.0,
                high: 190.5,
                low: 188.1,
                price: 10.0 * symbol.as_str().len() as f64,
                volume: 51_000_000,
                latest_trading_day: day,
                previous_close: 188.5,
                change: 1.5,
                change_percent: 0.7958,
            }),
            MarketDataRequest::Series(symbol, interval) => {
                // Oldest first, so the series has to reorder them.
                let points = (0..40)
                    .map(|i| {
                        let date = day - TimeDelta::days(39 - i);
                        let close = 100.0 + i as f64;
                        TimeSeriesPoint::new(date, close, close + 1.0, close - 1.0, close, 1_000)
                    })
                    .collect();
                MarketData::Series(TimeSeries::new(symbol.clone(), *interval, points))
            }
            MarketDataRequest::Overview(symbol) => {
                let name = format!("{symbol} Corporation");
                let overview = CompanyOverview::new(symbol.clone(), name);
                MarketData::Overview(Box::new(overview))
            }
            MarketDataRequest::Spot(metal) => MarketData::Spot(SpotPrice {
                symbol: metal.code().to_string(),
                name: None,
                price: match metal {
                    Metal::Gold => 2_350.25,
                    Metal::Silver => 28.4,
                },
                timestamp: None,
            }),
            MarketDataRequest::Search(keywords) => MarketData::Matches(vec![SymbolMatch {
                symbol: keywords.as_str().to_uppercase(),
                name: format!("{} Inc", keywords.as_str()),
                kind: "Equity".to_string(),
                region: "United States".to_string(),
                market_open: "09:30".to_string(),
                market_close: "16:00".to_string(),
                timezone: "UTC-04".to_string(),
                currency: "USD".to_string(),
                match_score: 1.0,
            }]),
        }
    }

    struct Harness {
        service: MarketDataService,
        provider: Arc<FakeProvider>,
        clock: Arc<ManualClock>,
        observer: Arc<RecordingObserver>,
    }

    fn harness(provider: FakeProvider) -> Harness {
        let provider = Arc::new(provider);
        let clock = Arc::new(ManualClock::default());
        let observer = Arc::new(RecordingObserver::new());
        let service = MarketDataService::new(provider.clone())
            .with_cache(Arc::new(InMemoryCache::with_clock(clock.clone())))
            .with_observer(observer.clone());
        Harness {
            service,
            provider,
            clock,
            observer,
        }
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let h = harness(FakeProvider::default());

        let first = h.service.stock_price("AAPL").await.unwrap();
        h.clock.advance(TimeDelta::seconds(30));
        let second = h.service.stock_price("aapl").await.unwrap();

        assert_eq!(first.origin, Origin::Upstream);
        assert!(second.is_cached());
        assert_eq!(first.value, second.value);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched_once() {
        let h = harness(FakeProvider::default());

        h.service.company_overview("IBM").await.unwrap();
        h.clock.advance(TimeDelta::seconds(119));
        assert!(h.service.company_overview("IBM").await.unwrap().is_cached());

        h.clock.advance(TimeDelta::seconds(1));
        let refreshed = h.service.company_overview("IBM").await.unwrap();
        assert_eq!(refreshed.origin, Origin::Upstream);
        assert_eq!(refreshed.value.name, "IBM Corporation");
        assert_eq!(h.provider.calls(), 2);

        assert!(h.service.company_overview("IBM").await.unwrap().is_cached());
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let h = harness(FakeProvider::failing(FailureClass::ServiceUnavailable, "timed out"));

        for _ in 0..2 {
            let err = h.service.stock_price("MSFT").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
            assert_eq!(err.status_code(), 503);
        }
        assert_eq!(h.provider.calls(), 2);
        let cached = h.service.cached_stock_price("MSFT", true).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_translated() {
        let h = harness(FakeProvider::failing(
            FailureClass::RateLimited,
            "Our standard API call frequency is 5 calls per minute",
        ));

        let err = h.service.gold_spot_price().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.status_code(), 429);

        let events = h.observer.events();
        assert!(matches!(
            events.last(),
            Some(FetchEvent::Failure {
                kind: ErrorKind::RateLimited,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_upstream_error_classes_map_to_status_codes() {
        let cases = [
            (FailureClass::Auth, 401),
            (FailureClass::NotFound, 404),
            (FailureClass::RateLimited, 429),
            (FailureClass::ServiceUnavailable, 503),
            (FailureClass::Malformed, 500),
            (FailureClass::Unknown, 500),
        ];
        for (class, status) in cases {
            let h = harness(FakeProvider::failing(class, "upstream said no"));
            let err = h.service.daily_series("IBM").await.unwrap_err();
            assert_eq!(err.status_code(), status, "class {class:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_upstream() {
        let h = harness(FakeProvider::default());

        let err = h.service.search_symbol("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), 400);

        for bad in ["", "NOT A SYMBOL", "TOOLONGSYMBOL1"] {
            let err = h.service.stock_price(bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "input {bad:?}");
        }
        assert!(h.service.cached_daily_series("$$$", false).await.is_err());

        assert_eq!(h.provider.calls(), 0);
        assert!(h.observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_windows_share_daily_entry() {
        let h = harness(FakeProvider::default());

        let full = h.service.daily_series("IBM").await.unwrap().into_value();
        let week = h
            .service
            .daily_series_last("IBM", SeriesWindow::Last7)
            .await
            .unwrap();
        let month = h
            .service
            .daily_series_last("ibm", SeriesWindow::Last30)
            .await
            .unwrap();

        assert_eq!(h.provider.calls(), 1);
        assert!(week.is_cached());
        assert_eq!(week.value.len(), 7);
        assert_eq!(month.value.len(), 30);
        assert_eq!(week.value.points(), &month.value.points()[..7]);
        assert_eq!(week.value.latest(), full.latest());
        assert_eq!(
            week.value.latest().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[tokio::test]
    async fn test_series_intervals_cached_separately() {
        let h = harness(FakeProvider::default());

        let daily = h.service.daily_series("IBM").await.unwrap();
        let weekly = h.service.weekly_series("IBM").await.unwrap();
        let monthly = h.service.monthly_series("IBM").await.unwrap();

        assert_eq!(daily.value.interval(), SeriesInterval::Daily);
        assert_eq!(weekly.value.interval(), SeriesInterval::Weekly);
        assert_eq!(monthly.value.interval(), SeriesInterval::Monthly);
        assert!(!weekly.is_cached());
        assert_eq!(h.provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_spot_and_search() {
        let h = harness(FakeProvider::default());

        let gold = h.service.gold_spot_price().await.unwrap().into_value();
        let silver = h.service.silver_spot_price().await.unwrap().into_value();
        assert_eq!(gold.symbol, "XAU");
        assert_eq!(silver.symbol, "XAG");

        let first = h.service.search_symbol("Tesla").await.unwrap();
        let second = h.service.search_symbol("  tesla ").await.unwrap();
        assert_eq!(first.value[0].symbol, "TESLA");
        assert!(second.is_cached());
        assert_eq!(h.provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_mismatched_cache_entry_is_unknown() {
        let provider = Arc::new(FakeProvider::default());
        let cache = Arc::new(InMemoryCache::new());
        let service = MarketDataService::new(provider.clone()).with_cache(cache.clone());

        let quote = MarketDataRequest::Quote(Symbol::parse("AAPL").unwrap());
        let spot = canned(&MarketDataRequest::Spot(Metal::Gold));
        cache.put(quote.cache_key(), spot).await;

        let err = service.stock_price("AAPL").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_reads_report_staleness() {
        let h = harness(FakeProvider::default());
        let cached = |include_stale| h.service.cached_stock_price("AAPL", include_stale);

        assert!(cached(true).await.unwrap().is_none());

        h.service.stock_price("AAPL").await.unwrap();
        let fresh = cached(false).await.unwrap().unwrap();
        assert!(!fresh.stale);
        assert_eq!(fresh.ttl, quotes_core::DEFAULT_TTL);

        h.clock.advance(TimeDelta::seconds(120));
        assert!(cached(false).await.unwrap().is_none());
        let stale = cached(true).await.unwrap().unwrap();
        assert!(stale.stale);
        assert_eq!(stale.value.symbol.as_str(), "AAPL");

        assert_eq!(h.service.purge_expired().await, 1);
        assert!(cached(true).await.unwrap().is_none());
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_overview_and_series() {
        let h = harness(FakeProvider::default());

        h.service.company_overview("IBM").await.unwrap();
        h.service.daily_series("IBM").await.unwrap();

        let overview = h
            .service
            .cached_company_overview("ibm", false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(overview.value.symbol.as_str(), "IBM");

        let series = h
            .service
            .cached_daily_series("IBM", false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.value.len(), 40);
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_observer_sequence() {
        let h = harness(FakeProvider::default());

        h.service.stock_price("AAPL").await.unwrap();
        h.service.stock_price("AAPL").await.unwrap();

        let events = h.observer.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], FetchEvent::Attempt { .. }));
        assert!(matches!(events[1], FetchEvent::Success { .. }));
        assert!(matches!(events[2], FetchEvent::Attempt { .. }));
        assert!(matches!(
            events[3],
            FetchEvent::CacheHit {
                operation: Operation::GlobalQuote,
                ..
            }
        ));
        let keys: Vec<String> = events.iter().map(|e| e.key().to_string()).collect();
        assert!(keys.iter().all(|k| k == "GLOBAL_QUOTE:AAPL"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_keys() {
        let h = harness(FakeProvider::slow(Duration::from_millis(20)));
        let symbols = ["AAPL", "MSFT", "IBM", "TSLA", "NVDA", "AMZN"];
        let requests: Vec<_> = symbols
            .iter()
            .map(|s| MarketDataRequest::Quote(Symbol::parse(s).unwrap()))
            .collect();

        let results = h.service.fetch_many(&requests).await;

        assert_eq!(results.len(), symbols.len());
        for (result, symbol) in results.into_iter().zip(symbols) {
            let quote = result.unwrap().into_value().into_quote().unwrap();
            assert_eq!(quote.symbol.as_str(), symbol);
            assert_eq!(quote.price, 10.0 * symbol.len() as f64);
        }
        assert_eq!(h.provider.calls(), symbols.len());

        for symbol in symbols {
            assert!(h.service.stock_price(symbol).await.unwrap().is_cached());
        }
        assert_eq!(h.provider.calls(), symbols.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_all_succeed() {
        let h = harness(FakeProvider::slow(Duration::from_millis(20)));
        let service = Arc::new(h.service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.stock_price("AAPL").await })
            })
            .collect();

        for handle in handles {
            let quote = handle.await.unwrap().unwrap();
            assert_eq!(quote.value.symbol.as_str(), "AAPL");
        }
        let calls = h.provider.calls();
        assert!((1..=8).contains(&calls));
        assert!(service.stock_price("AAPL").await.unwrap().is_cached());
        assert_eq!(h.provider.calls(), calls);
    }

    #[tokio::test]
    async fn test_fetch_many_keeps_input_order() {
        let h = harness(FakeProvider::default());
        let requests = [
            MarketDataRequest::Spot(Metal::Silver),
            MarketDataRequest::Overview(Symbol::parse("IBM").unwrap()),
            MarketDataRequest::Search(Keywords::parse("tesla").unwrap()),
        ];

        let results = h.service.fetch_many(&requests).await;

        let labels: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().into_value().label())
            .collect();
        assert_eq!(labels, ["spot", "overview", "matches"]);
    }

    #[test]
    fn test_parse_input_keeps_rejection() {
        let rejected = parse_input(Operation::GlobalQuote, "NOT A SYMBOL", Symbol::parse);
        let err = rejected.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("NOT A SYMBOL"));

        let symbol = parse_input(Operation::GlobalQuote, " ibm ", Symbol::parse).unwrap();
        assert_eq!(symbol.as_str(), "IBM");
    }

    #[test]
    fn test_fetched_serializes_origin() {
        let fetched = Fetched {
            value: 1.5,
            origin: Origin::Cache,
        };
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["origin"], "cache");
        assert_eq!(json["value"], 1.5);
    }

    #[cfg(feature = "alphavantage")]
    mod alphavantage {
        use super::*;
        use httpmock::prelude::*;
        use quotes_alphavantage::AlphaVantageProvider;
        use serde_json::json;

        fn service(server: &MockServer) -> MarketDataService {
            let config = crate::Config {
                base_url: server.url("/query"),
                ..crate::Config::new("test_key")
            };
            MarketDataService::from_config(&config)
        }

        #[tokio::test]
        async fn test_quote_end_to_end_hits_upstream_once() {
            let server = MockServer::start_async().await;
            let mock = server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path("/query")
                        .query_param("function", "GLOBAL_QUOTE")
                        .query_param("symbol", "AAPL")
                        .query_param("apikey", "test_key");
                    then.status(200).json_body(json!({
                        "Global Quote": {
                            "01. symbol": "AAPL",
                            "02. open": "189.00",
                            "03. high": "190.50",
                            "04. low": "188.10",
                            "05. price": "190.00",
                            "06. volume": "51000000",
                            "07. latest trading day": "2024-03-15",
                            "08. previous close": "188.50",
                            "09. change": "1.50",
                            "10. change percent": "0.7958%"
                        }
                    }));
                })
                .await;

            let service = service(&server);
            let first = service.stock_price("AAPL").await.unwrap();
            let second = service.stock_price("AAPL").await.unwrap();

            assert_eq!(first.value.price, 190.0);
            assert!(second.is_cached());
            mock.assert_hits_async(1).await;
        }

        #[tokio::test]
        async fn test_rate_limit_note_end_to_end() {
            let server = MockServer::start_async().await;
            let mock = server
                .mock_async(|when, then| {
                    when.method(GET);
                    then.status(200).json_body(json!({
                        "Information": "Our standard API rate limit is 25 requests per day."
                    }));
                })
                .await;

            let base_url = server.url("/query");
            let provider = AlphaVantageProvider::new("test_key").with_base_url(base_url);
            let service = MarketDataService::new(Arc::new(provider));

            for _ in 0..2 {
                let err = service.silver_spot_price().await.unwrap_err();
                assert_eq!(err.status_code(), 429);
            }
            mock.assert_hits_async(2).await;
        }
    }
}
