//! Trigger debouncing
//!
//! Coalesces bursts of events (map viewport changes) into one downstream
//! call fired `delay` after the last event of the burst.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cancellable delayed task, reset on every event
///
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` after the delay, cancelling any pending timer
    ///
    /// Only the timer is cancellable: once the delay elapses the action is
    /// detached and runs to completion even if new events arrive.
    pub fn call<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action());
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(timer);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drop the pending timer, if any, without firing it
    pub fn cancel(&self) {
        if let Some(timer) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
