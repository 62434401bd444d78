//! Price feed contract and the cache-first price service.
//!
//! The feed is an opaque asynchronous source: it either returns the latest
//! raw records or a [`FeedError`]. [`PriceService`] puts a [`PriceCache`] in
//! front of it so re-entering the swap screen does not refetch.
//!
//! ```rust,ignore
//! use swapkit_core::{HttpPriceFeed, PriceService, SwapConfig};
//!
//! let config = SwapConfig::from_env()?;
//! let service = PriceService::new(HttpPriceFeed::from_config(&config), config.cache_ttl());
//! let records = service.get_prices().await?;
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{PriceCache, PriceSnapshot};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{PriceRecord, SwapConfig};

/// Feed failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Transport failed before a response arrived.
    Unavailable,
    /// The request exceeded its timeout.
    Timeout,
    /// Upstream answered with a non-success status.
    Status,
    /// Body was not a JSON array.
    Decode,
}

/// Structured feed error returned instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    kind: FeedErrorKind,
    message: String,
    retryable: bool,
}

impl FeedError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            kind: FeedErrorKind::Status,
            message: format!("price feed returned HTTP {status}"),
            retryable: status == 429 || status >= 500,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::Decode,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FeedErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FeedErrorKind::Unavailable => "feed.unavailable",
            FeedErrorKind::Timeout => "feed.timeout",
            FeedErrorKind::Status => "feed.status",
            FeedErrorKind::Decode => "feed.decode",
        }
    }
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FeedError {}

/// Source of raw price records.
pub trait PriceFeed: Send + Sync {
    fn fetch_prices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceRecord>, FeedError>> + Send + 'a>>;
}

/// Price feed over HTTP returning a JSON array of `{currency, date, price}`.
pub struct HttpPriceFeed {
    url: String,
    timeout_ms: u64,
    http: Arc<dyn HttpClient>,
}

impl HttpPriceFeed {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: 5_000,
            http,
        }
    }

    pub fn from_config(config: &SwapConfig) -> Self {
        Self::new(
            config.price_feed_url.clone(),
            Arc::new(ReqwestHttpClient::default()),
        )
        .with_timeout_ms(config.request_timeout_ms)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpPriceFeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPriceFeed")
            .field("url", &self.url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl PriceFeed for HttpPriceFeed {
    fn fetch_prices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceRecord>, FeedError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(&self.url)
                .with_header("accept", "application/json")
                .with_timeout_ms(self.timeout_ms);

            let response = self
                .http
                .execute(request)
                .await
                .map_err(|e| {
                    if e.timed_out() {
                        FeedError::timeout(e.message())
                    } else {
                        FeedError::unavailable(e.message())
                    }
                })?;

            if !response.is_success() {
                return Err(FeedError::status(response.status));
            }

            decode_price_records(&response.body)
        })
    }
}

/// Decode a feed body, dropping entries that are not valid records.
pub fn decode_price_records(body: &str) -> Result<Vec<PriceRecord>, FeedError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| FeedError::decode(format!("price feed body is not a JSON array: {e}")))?;

    let total = entries.len();
    let records: Vec<PriceRecord> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<PriceRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "dropping malformed price record");
                None
            }
        })
        .collect();

    debug!(total, kept = records.len(), "decoded price feed");
    Ok(records)
}

/// In-memory feed for offline use and tests.
#[derive(Debug, Clone)]
pub struct StaticPriceFeed {
    outcome: Result<Vec<PriceRecord>, FeedError>,
}

impl Default for StaticPriceFeed {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StaticPriceFeed {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self {
            outcome: Ok(records),
        }
    }

    pub fn failing(error: FeedError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

impl PriceFeed for StaticPriceFeed {
    fn fetch_prices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PriceRecord>, FeedError>> + Send + 'a>> {
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Cache-first access to the price feed.
pub struct PriceService {
    feed: Arc<dyn PriceFeed>,
    cache: PriceCache,
}

impl PriceService {
    pub fn new(feed: impl PriceFeed + 'static, ttl: Duration) -> Self {
        Self::with_cache(Arc::new(feed), PriceCache::new(ttl))
    }

    pub fn with_cache(feed: Arc<dyn PriceFeed>, cache: PriceCache) -> Self {
        Self { feed, cache }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Cached prices when fresh, otherwise a fetch; successful fetches are cached.
    pub async fn get_prices(&self) -> Result<PriceSnapshot, FeedError> {
        if let Some(cached) = self.cache.get() {
            debug!(records = cached.len(), "serving prices from cache");
            return Ok(cached);
        }

        self.refresh().await
    }

    /// Fetch unconditionally and replace the cached payload.
    pub async fn refresh(&self) -> Result<PriceSnapshot, FeedError> {
        match self.feed.fetch_prices().await {
            Ok(records) => {
                info!(records = records.len(), "fetched prices");
                Ok(self.cache.set(records))
            }
            Err(error) => {
                warn!(code = error.code(), error = %error, "price fetch failed");
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for PriceService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_feed_and_drops_malformed_entries() {
        let body = r#"[
            {"currency":"BLUR","date":"2023-08-29T07:10:40.000Z","price":0.20811525423728813},
            {"currency":"bNEO","date":"2023-08-29T07:10:50.000Z","price":7.1282679},
            {"currency":"BUSD","date":"not-a-date","price":0.999183113},
            {"date":"2023-08-29T07:10:40.000Z","price":1.0},
            {"currency":"USD","date":"2023-08-29T07:10:30.000Z"}
        ]"#;

        let records = decode_price_records(body).expect("body should decode");
        let currencies: Vec<&str> = records.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(currencies, vec!["BLUR", "bNEO", "USD"]);
        assert_eq!(records[2].price, None);
    }

    #[test]
    fn rejects_non_array_body() {
        let err = decode_price_records(r#"{"error":"down"}"#).expect_err("must fail");
        assert_eq!(err.kind(), FeedErrorKind::Decode);
        assert!(!err.retryable());
    }

    #[test]
    fn classifies_status_errors() {
        assert!(FeedError::status(503).retryable());
        assert!(FeedError::status(429).retryable());
        assert!(!FeedError::status(404).retryable());
        assert_eq!(FeedError::status(404).code(), "feed.status");
    }

    #[test]
    fn timeouts_have_their_own_kind() {
        let err = FeedError::timeout("request timeout");
        assert_eq!(err.kind(), FeedErrorKind::Timeout);
        assert_eq!(err.code(), "feed.timeout");
        assert!(err.retryable());
    }
}
