//! Analyze command handler
//!
//! Runs one trade-area analysis and prints the report.

use crate::analysis::PoiCategory;
use crate::cli::{applied, build_session, center, OutputArgs};
use crate::config::Config;
use crate::coord::Polygon;
use crate::error::{Error, Result};
use crate::format::AnalysisReport;
use crate::provider::TravelMode;
use clap::Args;
use std::str::FromStr;

/// Analyze command arguments
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Trade-area radius in miles
    #[arg(long, short = 'r', conflicts_with_all = ["polygon", "minutes"])]
    pub radius: Option<f64>,

    /// GeoJSON file holding the trade-area polygon
    #[arg(long, conflicts_with_all = ["lat", "lng", "minutes"])]
    pub polygon: Option<String>,

    /// Travel time for an isochrone trade area
    #[arg(long)]
    pub minutes: Option<u32>,

    /// Travel mode for the isochrone (driving, walking, cycling)
    #[arg(long, short = 'm', requires = "minutes")]
    pub mode: Option<String>,

    /// Only list these categories in the top places
    #[arg(long, short = 'c', value_delimiter = ',')]
    pub categories: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Run the analyze command
pub async fn run(args: AnalyzeArgs, config: Config) -> Result<()> {
    if args.output.handle_list() {
        return Ok(());
    }

    let categories = args
        .categories
        .iter()
        .map(|c| PoiCategory::from_str(c).map_err(Error::InvalidInput))
        .collect::<Result<Vec<_>>>()?;
    let formatter = args.output.formatter(&config)?;
    let session = build_session(&config)?;

    let commit = if let Some(path) = &args.polygon {
        let content = std::fs::read_to_string(path)?;
        session
            .analyze_polygon(Polygon::from_geojson_str(&content)?)
            .await?
    } else if let Some(minutes) = args.minutes {
        let mode = match &args.mode {
            Some(mode) => TravelMode::from_str(mode).map_err(Error::InvalidInput)?,
            None => TravelMode::default(),
        };
        session
            .analyze_isochrone(center(args.lat, args.lng)?, mode, minutes)
            .await?
    } else {
        let radius = args.radius.unwrap_or(config.analysis.default_radius_miles);
        session
            .analyze_trade_area(center(args.lat, args.lng)?, radius)
            .await?
    };

    let result = applied(commit)?;
    let boundary = session.boundary(&result);
    let report = AnalysisReport::new(
        result,
        boundary,
        (!categories.is_empty()).then_some(categories.as_slice()),
        config.analysis.top_items_limit,
    );

    args.output.write(&formatter.format_analysis(&report)?)
}
