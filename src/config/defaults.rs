//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants;

/// Default trade-area radius in miles
pub const DEFAULT_RADIUS_MILES: f64 = 1.0;

/// Default polygon fetch-radius inflation factor
pub const DEFAULT_FETCH_RADIUS_INFLATION: f64 = constants::trade_area::FETCH_RADIUS_INFLATION;

/// Default floor on the polygon fetch radius, in miles
pub const DEFAULT_MIN_FETCH_RADIUS_MILES: f64 = constants::trade_area::MIN_FETCH_RADIUS_MILES;

/// Default vertex count for generated circle boundaries
pub const DEFAULT_CIRCLE_VERTICES: usize = constants::geo::MIN_CIRCLE_VERTICES;

/// Default number of POIs listed per analysis
pub const DEFAULT_TOP_ITEMS_LIMIT: usize = 8;

/// Default demographic ring radii in miles
pub const DEFAULT_DEMOGRAPHIC_RADII: [f64; 3] = [1.0, 3.0, 5.0];

/// Default decimals kept for coordinates in cache keys
pub const DEFAULT_COORDINATE_PRECISION: u32 = constants::cache::COORDINATE_PRECISION;

/// Default POI and isochrone cache TTL in seconds
pub const DEFAULT_POI_TTL_SECS: u64 = constants::cache::POI_TTL_SECS;

/// Default listing-search cache TTL in seconds
pub const DEFAULT_LISTING_TTL_SECS: u64 = constants::cache::LISTING_TTL_SECS;

/// Default demographics cache TTL in seconds
pub const DEFAULT_DEMOGRAPHICS_TTL_SECS: u64 = 24 * 60 * 60;

/// Default viewport debounce delay in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 600;

/// Default scoring weights (sum = 1.0)
pub const DEFAULT_WEIGHT_SIZE_FIT: f64 = 0.30;
pub const DEFAULT_WEIGHT_TRAFFIC: f64 = 0.25;
pub const DEFAULT_WEIGHT_COMPETITION: f64 = 0.20;
pub const DEFAULT_WEIGHT_COMPLETENESS: f64 = 0.10;
pub const DEFAULT_WEIGHT_OPPORTUNITY: f64 = 0.15;

/// Traffic volume (AADT) that earns a full traffic score
pub const DEFAULT_REFERENCE_AADT: f64 = 25_000.0;

/// Traffic volume (AADT) labeled a high-traffic corridor
pub const DEFAULT_HIGH_TRAFFIC_AADT: f64 = 20_000.0;

/// Competitor count at which the competition score bottoms out
pub const DEFAULT_COMPETITOR_SATURATION: f64 = 5.0;

/// Size-fit score labeled a strong fit
pub const DEFAULT_STRONG_SIZE_FIT: f64 = 0.8;

/// Component value used when a signal is missing
pub const DEFAULT_NEUTRAL_SIGNAL: f64 = 0.5;

/// Default HTTP request timeout in seconds
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Default log level when RUST_LOG is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default output format
pub const DEFAULT_FORMAT: &str = "text";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "tradescope";
