//! HTTP server for tradescope
//!
//! Exposes the analysis session as a REST API.

pub mod routes;
pub mod state;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{ConfiguredSources, DataSources};
use routes::create_router;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// How often expired cache entries are swept
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Start the HTTP server
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// Never returns unless the server shuts down
pub async fn run(config: Config) -> Result<()> {
    let addr = config.server_addr();
    run_on(&addr, config).await
}

/// Start the HTTP server with a specific address
///
/// Useful for tests or when you want to override config
pub async fn run_on(addr: &str, config: Config) -> Result<()> {
    let sources = Arc::new(ConfiguredSources::from_config(&config.provider)?);
    serve(addr, config, sources).await
}

/// Serve `sources` on `addr` until ctrl-c
pub async fn serve<S: DataSources>(addr: &str, config: Config, sources: Arc<S>) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Server(format!("Invalid server address: {}", e)))?;

    let state = Arc::new(AppState::new(config, sources));
    let session = Arc::clone(&state.session);
    let app = create_router(state);

    let sweeper = tokio::spawn({
        let session = Arc::clone(&session);
        async move {
            let mut interval = tokio::time::interval(EVICTION_INTERVAL);
            loop {
                interval.tick().await;
                let evicted = session.evict_expired().await;
                if evicted > 0 {
                    debug!(evicted, "swept expired cache entries");
                }
            }
        }
    });

    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler: run until killed
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await
        .map_err(|e| Error::Server(format!("Server error: {}", e)));

    sweeper.abort();
    session.close().await;
    served
}
