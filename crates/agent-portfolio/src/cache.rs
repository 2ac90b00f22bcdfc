//! Caching layer for quotes to reduce API calls

use crate::api::Quote;
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key for quote lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Stock symbol
    pub symbol: String,
    /// Trading day, `None` for the latest quote
    pub date: Option<String>,
}

impl CacheKey {
    /// Key for the latest quote of a symbol
    pub fn latest(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            date: None,
        }
    }

    /// Key for a symbol's quote on a given day
    pub fn on_date(symbol: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            date: Some(date.into()),
        }
    }
}

/// Thread-safe, time-bounded quote cache
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct QuoteCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Quote>>>,
}

impl std::fmt::Debug for QuoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteCache").finish_non_exhaustive()
    }
}

impl QuoteCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a quote from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<Quote> {
        // TimedCache evicts on read, so lookups need the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a quote into the cache
    pub async fn insert(&self, key: CacheKey, quote: Quote) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, quote);
    }

    /// Get or fetch a quote using the provided fetcher
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Quote, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Quote, E>>,
    {
        if let Some(quote) = self.get(&key).await {
            debug!(symbol = %key.symbol, date = ?key.date, "Quote cache hit");
            return Ok(quote);
        }

        debug!(symbol = %key.symbol, date = ?key.date, "Quote cache miss");
        let quote = fetcher().await?;
        self.insert(key, quote.clone()).await;

        Ok(quote)
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn quote(symbol: &str, close: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 10, 14, 20, 0, 0).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
            adjclose: close,
        }
    }

    #[tokio::test]
    async fn test_cache_insert_and_get() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let key = CacheKey::latest("MSFT");

        cache.insert(key.clone(), quote("MSFT", 420.0)).await;

        assert_eq!(cache.get(&key).await.map(|q| q.close), Some(420.0));
        assert!(cache.get(&CacheKey::on_date("MSFT", "2025-10-14")).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_get_or_fetch() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let key = CacheKey::latest("AAPL");

        let mut call_count = 0;
        let first = cache
            .get_or_fetch(key.clone(), || {
                call_count += 1;
                async { Ok::<_, String>(quote("AAPL", 250.0)) }
            })
            .await
            .unwrap();
        assert_eq!(first.close, 250.0);

        let second = cache
            .get_or_fetch(key, || {
                call_count += 1;
                async { Ok::<_, String>(quote("AAPL", 1.0)) }
            })
            .await
            .unwrap();
        assert_eq!(second.close, 250.0);
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let key = CacheKey::latest("TSLA");

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<Quote, _>("down") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        for symbol in ["MSFT", "AAPL", "NVDA"] {
            cache.insert(CacheKey::latest(symbol), quote(symbol, 1.0)).await;
        }
        assert_eq!(cache.len().await, 3);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
