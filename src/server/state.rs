//! Server shared state
//!
//! Holds configuration and the analysis session served over HTTP.

use crate::config::Config;
use crate::provider::DataSources;
use crate::session::{AnalysisSession, SessionSettings};
use std::sync::Arc;
use tokio::time::Instant;

/// Shared state for the HTTP server
pub struct AppState<S: DataSources> {
    /// Configuration
    pub config: Config,

    /// The dashboard session every request acts on
    pub session: Arc<AnalysisSession<S>>,

    started_at: Instant,
}

impl<S: DataSources> AppState<S> {
    /// Create new application state
    pub fn new(config: Config, sources: Arc<S>) -> Self {
        let session = Arc::new(AnalysisSession::new(
            sources,
            SessionSettings::from(&config),
        ));
        Self {
            config,
            session,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
