//! Request generation tokens
//!
//! Every request issued for an operation takes a token. When the result
//! arrives it is committed only if its token is still the latest; results
//! from superseded or cancelled requests are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token identifying one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Monotonic counter of issued requests for one operation
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding every earlier one
    pub fn next(&self) -> RequestToken {
        RequestToken(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` is the latest issued
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.0.load(Ordering::SeqCst) == token.0
    }

    /// Supersede every outstanding token without issuing a new request
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
