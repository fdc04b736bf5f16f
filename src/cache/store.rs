//! Time-to-live cache
//!
//! A hit reports its age and whether it outlived its TTL. Whether a stale
//! value is served or a fresh fetch is awaited is the caller's decision.

use crate::cache::key::RequestKey;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

/// A cached value with its age
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    pub age: Duration,
    pub is_stale: bool,
}

impl<V> CacheHit<V> {
    pub fn age_ms(&self) -> u64 {
        self.age.as_millis() as u64
    }
}

/// Keyed store with per-entry expiry
///
/// Reads are public; writes are restricted to the orchestration layer.
pub struct ExpiringCache<V> {
    entries: RwLock<HashMap<RequestKey, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store a value under the default TTL
    pub(crate) async fn insert(&self, key: RequestKey, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL, replacing any previous entry
    pub(crate) async fn insert_with_ttl(&self, key: RequestKey, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Look up a value, reporting age and staleness
    pub async fn get(&self, key: &RequestKey) -> Option<CacheHit<V>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let age = entry.stored_at.elapsed();
        Some(CacheHit {
            value: entry.value.clone(),
            age,
            is_stale: age > entry.ttl,
        })
    }

    /// Drop entries that have been stale for longer than `grace`
    pub(crate) async fn evict_expired(&self, grace: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= entry.ttl + grace);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
