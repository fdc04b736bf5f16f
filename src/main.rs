//! tradescope CLI entry point
//!
//! Trade-area analysis and opportunity scoring - CLI + web API

use tradescope::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
