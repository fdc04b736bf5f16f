//! Request orchestration and caching
//!
//! Everything that stands between a UI trigger and a metered upstream call:
//! - [`RequestKey`]: identity of a request, built from every parameter
//! - [`InFlight`]: at most one pending request per key
//! - [`ExpiringCache`]: TTL store reporting age and staleness
//! - [`Debouncer`]: coalesces bursts of viewport events
//! - [`Generation`]: discards results of superseded requests
//!
//! [`RequestCache`] ties dedup and the TTL store together. It is the only
//! writer of its store.

pub mod debounce;
pub mod dedup;
pub mod generation;
pub mod key;
pub mod store;

pub use debounce::Debouncer;
pub use dedup::InFlight;
pub use generation::{Generation, RequestToken};
pub use key::RequestKey;
pub use store::{CacheHit, ExpiringCache};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a returned value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Freshness {
    /// Fetched by this call (or a request it joined)
    Fresh,
    /// Served from cache
    Cached { age_ms: u64, is_stale: bool },
}

impl Freshness {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}

/// A value plus its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fetched<T> {
    pub value: T,
    pub freshness: Freshness,
}

impl<T> Fetched<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            freshness: Freshness::Fresh,
        }
    }

    pub fn from_hit(hit: CacheHit<T>) -> Self {
        let freshness = Freshness::Cached {
            age_ms: hit.age_ms(),
            is_stale: hit.is_stale,
        };
        Self {
            value: hit.value,
            freshness,
        }
    }
}

/// What a caller does when the cached value is past its TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Return the stale value now and refresh in the background
    #[default]
    ServeStale,
    /// Wait for a fresh fetch
    Block,
}

impl std::fmt::Display for StalePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServeStale => write!(f, "serve_stale"),
            Self::Block => write!(f, "block"),
        }
    }
}

impl std::str::FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serve_stale" | "serve-stale" | "optimistic" => Ok(Self::ServeStale),
            "block" | "blocking" => Ok(Self::Block),
            _ => Err(format!("Unknown stale policy: {}", s)),
        }
    }
}

/// Deduplicating fetcher backed by a TTL cache
pub struct RequestCache<T> {
    store: Arc<ExpiringCache<T>>,
    in_flight: InFlight<T>,
}

impl<T> RequestCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(ExpiringCache::new(ttl)),
            in_flight: InFlight::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.store.default_ttl()
    }

    /// Fetch through the dedup registry and cache a successful result
    ///
    /// Concurrent calls with the same key share one producer invocation.
    /// Failures are not cached and leave any previous entry in place.
    pub async fn fetch_with_dedup<F, Fut>(&self, key: RequestKey, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let cache_key = key.clone();
        self.in_flight
            .run(key, move || {
                let request = producer();
                async move {
                    let value = request.await?;
                    debug!(key = %cache_key, "caching fetched value");
                    store.insert(cache_key, value.clone()).await;
                    Ok(value)
                }
            })
            .await
    }

    /// Serve from cache when fresh, otherwise fetch according to `policy`
    ///
    /// A stale entry under [`StalePolicy::ServeStale`] is returned as is
    /// while a background task refreshes it; under [`StalePolicy::Block`]
    /// the caller waits for the fresh value.
    pub async fn get_or_fetch<F, Fut>(
        self: &Arc<Self>,
        key: RequestKey,
        policy: StalePolicy,
        producer: F,
    ) -> Result<Fetched<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(hit) = self.get_cached(&key).await {
            if !hit.is_stale {
                debug!(key = %key, age_ms = hit.age_ms(), "cache hit");
                return Ok(Fetched::from_hit(hit));
            }
            if policy == StalePolicy::ServeStale {
                debug!(key = %key, age_ms = hit.age_ms(), "serving stale entry, refreshing");
                let cache = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(e) = cache.fetch_with_dedup(key.clone(), producer).await {
                        warn!(key = %key, error = %e, "background refresh failed");
                    }
                });
                return Ok(Fetched::from_hit(hit));
            }
            debug!(key = %key, "stale entry, waiting for fresh fetch");
        }

        self.fetch_with_dedup(key, producer)
            .await
            .map(Fetched::fresh)
    }

    /// Cached value for `key`, with age and staleness
    pub async fn get_cached(&self, key: &RequestKey) -> Option<CacheHit<T>> {
        self.store.get(key).await
    }

    /// Drop entries stale for longer than one extra TTL
    pub async fn evict_expired(&self) -> usize {
        self.store.evict_expired(self.store.default_ttl()).await
    }

    /// Number of requests currently pending
    pub async fn pending(&self) -> usize {
        self.in_flight.pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &'static str) -> RequestKey {
        RequestKey::builder("test", 4).param("name", name).build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_populates_cache() {
        let cache = RequestCache::new(Duration::from_secs(60));
        assert!(cache.get_cached(&key("a")).await.is_none());

        let value = cache
            .fetch_with_dedup(key("a"), || async { Ok::<_, Error>(vec![1, 2, 3]) })
            .await
            .unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        let hit = cache.get_cached(&key("a")).await.unwrap();
        assert_eq!(hit.value, vec![1, 2, 3]);
        assert!(!hit.is_stale);

        let fetched = Fetched::from_hit(hit);
        assert!(fetched.freshness.is_cached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetch_single_producer() {
        let cache = RequestCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let producer = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, Error>(7u32)
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch_with_dedup(key("a"), producer(Arc::clone(&calls))),
            cache.fetch_with_dedup(key("a"), producer(Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(cache.pending().await, 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_entry() {
        let cache = RequestCache::new(Duration::from_secs(60));
        cache
            .fetch_with_dedup(key("a"), || async { Ok::<_, Error>(1u32) })
            .await
            .unwrap();

        let err = cache
            .fetch_with_dedup(key("a"), || async {
                Err(Error::upstream("parcel lookup", "503"))
            })
            .await;
        assert!(err.is_err());

        assert_eq!(cache.get_cached(&key("a")).await.unwrap().value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_serve_stale_refreshes_in_background() {
        let cache = Arc::new(RequestCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));
        let producer = |calls: Arc<AtomicUsize>| {
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
                Ok::<_, Error>(n)
            }
        };

        let first = cache
            .get_or_fetch(key("a"), StalePolicy::ServeStale, producer(Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(first, Fetched::fresh(0));

        tokio::time::advance(Duration::from_secs(90)).await;

        let stale = cache
            .get_or_fetch(key("a"), StalePolicy::ServeStale, producer(Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(stale.value, 0);
        assert_eq!(
            stale.freshness,
            Freshness::Cached {
                age_ms: 90_000,
                is_stale: true
            }
        );

        // Let the background refresh run
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_cached(&key("a")).await.unwrap().value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_policy_waits_for_fresh() {
        let cache = Arc::new(RequestCache::new(Duration::from_secs(60)));
        cache
            .get_or_fetch(key("a"), StalePolicy::Block, || async { Ok::<_, Error>(1u32) })
            .await
            .unwrap();

        let cached = cache
            .get_or_fetch(key("a"), StalePolicy::Block, || async { Ok::<_, Error>(2u32) })
            .await
            .unwrap();
        assert_eq!(cached.value, 1);
        assert!(cached.freshness.is_cached());

        tokio::time::advance(Duration::from_secs(61)).await;

        let fresh = cache
            .get_or_fetch(key("a"), StalePolicy::Block, || async { Ok::<_, Error>(3u32) })
            .await
            .unwrap();
        assert_eq!(fresh, Fetched::fresh(3));
    }

    #[test]
    fn test_stale_policy_parse() {
        use std::str::FromStr;
        assert_eq!(StalePolicy::from_str("block").unwrap(), StalePolicy::Block);
        assert_eq!(
            StalePolicy::from_str("serve-stale").unwrap(),
            StalePolicy::ServeStale
        );
        assert!(StalePolicy::from_str("never").is_err());
    }

    #[test]
    fn test_freshness_serialization() {
        let json = serde_json::to_value(Freshness::Cached {
            age_ms: 1500,
            is_stale: false,
        })
        .unwrap();
        assert_eq!(json["source"], "cached");
        assert_eq!(json["age_ms"], 1500);

        let json = serde_json::to_value(Freshness::Fresh).unwrap();
        assert_eq!(json["source"], "fresh");
    }
}
