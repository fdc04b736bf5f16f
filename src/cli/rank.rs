//! Rank command handler
//!
//! Ranks candidates from a JSON file, or searches listings inside a
//! bounding box and ranks those.

use crate::cli::{applied, build_session, OutputArgs};
use crate::config::Config;
use crate::coord::Bounds;
use crate::error::{Error, Result};
use crate::scoring::{CandidateProperty, FilterCriteria};
use clap::Args;

/// Rank command arguments
#[derive(Args)]
pub struct RankArgs {
    /// JSON file holding an array of candidate properties
    #[arg(long, conflicts_with = "bounds", required_unless_present_any = ["bounds", "list_formats"])]
    pub candidates: Option<String>,

    /// Search listings inside NORTH,SOUTH,EAST,WEST
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub bounds: Vec<f64>,

    /// Minimum parcel size in acres
    #[arg(long)]
    pub min_acres: Option<f64>,

    /// Maximum parcel size in acres
    #[arg(long)]
    pub max_acres: Option<f64>,

    /// Minimum building size in square feet
    #[arg(long)]
    pub min_sqft: Option<f64>,

    /// Maximum building size in square feet
    #[arg(long)]
    pub max_sqft: Option<f64>,

    /// Property types to leave out (land, retail, office)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl RankArgs {
    /// Configured filters with the command-line overrides applied
    fn criteria(&self, base: &FilterCriteria) -> Result<FilterCriteria> {
        let mut criteria = base.clone();
        if self.min_acres.is_some() {
            criteria.min_parcel_acres = self.min_acres;
        }
        if self.max_acres.is_some() {
            criteria.max_parcel_acres = self.max_acres;
        }
        if self.min_sqft.is_some() {
            criteria.min_building_sqft = self.min_sqft;
        }
        if self.max_sqft.is_some() {
            criteria.max_building_sqft = self.max_sqft;
        }
        for kind in &self.exclude {
            match kind.to_lowercase().as_str() {
                "land" => criteria.include_land = false,
                "retail" => criteria.include_retail = false,
                "office" => criteria.include_office = false,
                other => {
                    return Err(Error::InvalidInput(format!(
                        "Unknown property type: {}. Use land, retail or office",
                        other
                    )))
                }
            }
        }
        Ok(criteria)
    }

    fn search_bounds(&self) -> Result<Option<Bounds>> {
        match self.bounds.as_slice() {
            [] => Ok(None),
            [north, south, east, west] => Ok(Some(Bounds {
                north: *north,
                south: *south,
                east: *east,
                west: *west,
            })),
            _ => Err(Error::InvalidInput(
                "--bounds takes four values: NORTH,SOUTH,EAST,WEST".to_string(),
            )),
        }
    }
}

/// Run the rank command
pub async fn run(args: RankArgs, config: Config) -> Result<()> {
    if args.output.handle_list() {
        return Ok(());
    }

    let criteria = args.criteria(&config.filters)?;
    let formatter = args.output.formatter(&config)?;
    let session = build_session(&config)?;

    let rankings = if let Some(bounds) = args.search_bounds()? {
        applied(session.search_listings(bounds, Some(criteria)).await?)?.rankings
    } else if let Some(path) = &args.candidates {
        let content = std::fs::read_to_string(path)?;
        let candidates: Vec<CandidateProperty> = serde_json::from_str(&content)?;
        applied(session.rank_opportunities(&candidates, Some(criteria)).await?)?
    } else {
        return Err(Error::InvalidInput(
            "Either --candidates or --bounds is required".to_string(),
        ));
    };

    args.output.write(&formatter.format_rankings(&rankings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> RankArgs {
        let mut argv = vec!["tradescope", "rank"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Rank(args) => args,
            _ => panic!("expected rank"),
        }
    }

    #[test]
    fn test_criteria_overrides() {
        let args = parse(&["--candidates", "c.json", "--min-acres", "1.5", "--exclude", "land,office"]);
        let criteria = args.criteria(&FilterCriteria::default()).unwrap();

        assert_eq!(criteria.min_parcel_acres, Some(1.5));
        assert_eq!(criteria.max_parcel_acres, None);
        assert!(!criteria.include_land);
        assert!(criteria.include_retail);
        assert!(!criteria.include_office);
    }

    #[test]
    fn test_criteria_keeps_configured_values() {
        let base = FilterCriteria {
            max_building_sqft: Some(20_000.0),
            ..Default::default()
        };
        let args = parse(&["--candidates", "c.json"]);
        assert_eq!(args.criteria(&base).unwrap(), base);
    }

    #[test]
    fn test_unknown_exclude_rejected() {
        let args = parse(&["--candidates", "c.json", "--exclude", "warehouse"]);
        assert!(args.criteria(&FilterCriteria::default()).is_err());
    }

    #[test]
    fn test_bounds_parsing() {
        let args = parse(&["--bounds", "41.6,41.5,-93.5,-93.7"]);
        let bounds = args.search_bounds().unwrap().unwrap();
        assert_eq!(bounds.north, 41.6);
        assert_eq!(bounds.west, -93.7);

        let args = parse(&["--bounds", "41.6,41.5"]);
        assert!(args.search_bounds().is_err());
    }

    #[test]
    fn test_source_required() {
        assert!(Cli::try_parse_from(["tradescope", "rank"]).is_err());
        assert!(Cli::try_parse_from(["tradescope", "rank", "-F"]).is_ok());
    }
}
