//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod analyze;
pub mod config;
pub mod demographics;
pub mod rank;
pub mod serve;

use crate::config::Config;
use crate::coord::GeoPoint;
use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter, OutputFormatter};
use crate::provider::ConfiguredSources;
use crate::session::{AnalysisSession, Commit, SessionSettings};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Trade-area analysis and opportunity scoring
#[derive(Parser)]
#[command(name = "tradescope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a trade area (radius, polygon or isochrone)
    Analyze(analyze::AnalyzeArgs),

    /// Show demographic rings around a point
    Demographics(demographics::DemographicsArgs),

    /// Rank candidate properties
    Rank(rank::RankArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Loads on its own so --path and --reset work with a broken file
    let command = match cli.command {
        Commands::Config(args) => return config::run(args),
        command => command,
    };

    let config = Config::load()?;
    init_logging(&config, cli.verbose, cli.quiet);

    match command {
        Commands::Analyze(args) => analyze::run(args, config).await,
        Commands::Demographics(args) => demographics::run(args, config).await,
        Commands::Rank(args) => rank::run(args, config).await,
        Commands::Serve(args) => serve::run(args, config).await,
        Commands::Config(args) => config::run(args),
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the flags, which win over `logging.level`. Logs go
/// to stderr so command output stays pipeable.
fn init_logging(config: &Config, verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Already installed (tests, embedding) is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Session backed by the configured provider
pub(crate) fn build_session(config: &Config) -> Result<Arc<AnalysisSession<ConfiguredSources>>> {
    let sources = Arc::new(ConfiguredSources::from_config(&config.provider)?);
    Ok(Arc::new(AnalysisSession::new(
        sources,
        SessionSettings::from(config),
    )))
}

pub(crate) fn center(lat: Option<f64>, lng: Option<f64>) -> Result<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng),
        _ => Err(Error::InvalidCoordinates(
            "Both --lat and --lng are required".to_string(),
        )),
    }
}

/// A one-shot CLI call has nothing to be superseded by
pub(crate) fn applied<T>(commit: Commit<T>) -> Result<T> {
    commit
        .applied()
        .ok_or_else(|| Error::Server("Result was superseded".to_string()))
}

/// Output options shared by every reporting command
#[derive(Args)]
pub struct OutputArgs {
    /// Output format (text or json)
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

impl OutputArgs {
    /// Print the format list if asked; returns whether it did
    pub(crate) fn handle_list(&self) -> bool {
        if self.list_formats {
            println!("Available output formats:");
            for format in available_formats() {
                println!("  {:6} - {}", format.name, format.description);
            }
        }
        self.list_formats
    }

    pub(crate) fn formatter(&self, config: &Config) -> Result<Box<dyn OutputFormatter>> {
        let format = self.format.as_deref().unwrap_or(&config.output.format);
        get_formatter(format)
            .ok_or_else(|| Error::Config(format!("Unknown format: {}", format)))
    }

    pub(crate) fn write(&self, output: &str) -> Result<()> {
        if let Some(path) = &self.output {
            std::fs::write(path, output)?;
            eprintln!("Output written to {}", path);
        } else {
            println!("{}", output);
        }
        Ok(())
    }
}
