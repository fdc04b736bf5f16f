//! In-flight request deduplication
//!
//! While a request for a key is pending, later callers for the same key
//! await the same shared future instead of issuing another network call.

use crate::cache::key::RequestKey;
use crate::error::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Registry of pending requests keyed by [`RequestKey`]
pub struct InFlight<T> {
    pending: Arc<Mutex<HashMap<RequestKey, SharedFetch<T>>>>,
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `producer` unless a request for `key` is already pending
    ///
    /// The producer is only invoked by the first caller. Every caller gets
    /// the same outcome, errors included. The entry is released when the
    /// request settles, so the next call after that starts a new request.
    pub async fn run<F, Fut>(&self, key: RequestKey, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock().await;
            match pending.get(&key) {
                Some(existing) => {
                    debug!(key = %key, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let release_key = key.clone();
                    let request = producer();
                    let shared = async move {
                        let outcome = request.await;
                        registry.lock().await.remove(&release_key);
                        outcome
                    }
                    .boxed()
                    .shared();
                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of requests currently pending
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl<T> Default for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
