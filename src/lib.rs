//! tradescope: Trade-Area Analysis and Opportunity Scoring
//!
//! A library and CLI tool for analyzing the area around a site and ranking
//! candidate properties for development.
//!
//! ## Features
//!
//! - Radius, polygon and isochrone trade areas
//! - POI aggregation by category with polygon trimming
//! - Demographic rings merged into a fixed radius set
//! - Weighted opportunity scoring with filter criteria
//! - Request caching, in-flight deduplication and stale-result suppression
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tradescope::coord::GeoPoint;
//! use tradescope::provider::fixture::{FixtureData, FixtureSources};
//! use tradescope::session::{AnalysisSession, SessionSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> tradescope::Result<()> {
//! let sources = Arc::new(FixtureSources::new(FixtureData::sample()));
//! let session = AnalysisSession::new(sources, SessionSettings::default());
//!
//! let center = GeoPoint::new(41.5868, -93.6250)?; // Des Moines
//! let commit = session.analyze_trade_area(center, 1.0).await?;
//!
//! if let Some(result) = commit.applied() {
//!     println!("{} POIs in the trade area", result.summary_by_category().total());
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod demographics;
pub mod error;
pub mod format;
pub mod provider;
pub mod scoring;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use analysis::{AnalysisResult, PoiCategory, PointOfInterest};
pub use config::Config;
pub use coord::{Bounds, GeoPoint, Polygon, TradeArea};
pub use error::{Error, Result};
pub use scoring::{CandidateProperty, FilterCriteria, OpportunityRanking};
pub use session::AnalysisSession;
