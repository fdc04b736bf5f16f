//! Demographics command handler

use crate::cli::{applied, build_session, center, OutputArgs};
use crate::config::Config;
use crate::error::Result;
use clap::Args;

/// Demographics command arguments
#[derive(Args)]
pub struct DemographicsArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Ring radii in miles (defaults to analysis.demographic_radii)
    #[arg(long, value_delimiter = ',')]
    pub radii: Vec<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Run the demographics command
pub async fn run(args: DemographicsArgs, config: Config) -> Result<()> {
    if args.output.handle_list() {
        return Ok(());
    }

    let formatter = args.output.formatter(&config)?;
    let session = build_session(&config)?;

    let bundle = applied(
        session
            .get_demographics(center(args.lat, args.lng)?, &args.radii)
            .await?,
    )?;

    args.output.write(&formatter.format_demographics(&bundle)?)
}
