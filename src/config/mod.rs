//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/tradescope/config.toml

pub mod defaults;

use crate::cache::StalePolicy;
use crate::coord::geometry::FetchRadiusPolicy;
use crate::error::{Error, Result};
use crate::scoring::{FilterCriteria, ScoringPolicy};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Trade-area analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Request cache and debounce settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Opportunity scoring weights and thresholds
    #[serde(default)]
    pub scoring: ScoringPolicy,

    /// Default candidate filter
    #[serde(default)]
    pub filters: FilterCriteria,

    /// Data collaborators
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Log settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CLI output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Trade-area analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Radius used when none is given, in miles
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,

    /// Polygon fetch radius multiplier
    #[serde(default = "default_fetch_radius_inflation")]
    pub fetch_radius_inflation: f64,

    /// Smallest polygon fetch radius, in miles
    #[serde(default = "default_min_fetch_radius_miles")]
    pub min_fetch_radius_miles: f64,

    /// Vertices in generated circle boundaries (never below 64)
    #[serde(default = "default_circle_vertices")]
    pub circle_vertices: usize,

    /// POIs listed per analysis
    #[serde(default = "default_top_items_limit")]
    pub top_items_limit: usize,

    /// Demographic ring radii, in miles
    #[serde(default = "default_demographic_radii")]
    pub demographic_radii: Vec<f64>,
}

/// Request cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Decimals kept for coordinates in cache keys
    #[serde(default = "default_coordinate_precision")]
    pub coordinate_precision: u32,

    /// POI and isochrone TTL in seconds
    #[serde(default = "default_poi_ttl")]
    pub poi_ttl_secs: u64,

    /// Listing-search TTL in seconds
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,

    /// Demographics TTL in seconds
    #[serde(default = "default_demographics_ttl")]
    pub demographics_ttl_secs: u64,

    /// Delay after the last viewport change before searching
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// What listing search does with a stale entry
    #[serde(default)]
    pub stale_policy: StalePolicy,
}

/// Which data collaborators to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local JSON dataset (built-in sample when no path is set)
    #[default]
    Fixture,
    /// JSON gateway over HTTP
    Http,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixture => write!(f, "fixture"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixture" => Ok(Self::Fixture),
            "http" => Ok(Self::Http),
            _ => Err(format!("Unknown provider kind: {}", s)),
        }
    }
}

/// Data collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Gateway base URL (http provider)
    #[serde(default)]
    pub base_url: String,

    /// Gateway API key (http provider)
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds (http provider)
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Dataset path (fixture provider); empty for the built-in sample
    #[serde(default)]
    pub fixture_path: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// CLI output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (text or json)
    #[serde(default = "default_format")]
    pub format: String,
}

// Default value functions for serde
fn default_radius_miles() -> f64 {
    DEFAULT_RADIUS_MILES
}
fn default_fetch_radius_inflation() -> f64 {
    DEFAULT_FETCH_RADIUS_INFLATION
}
fn default_min_fetch_radius_miles() -> f64 {
    DEFAULT_MIN_FETCH_RADIUS_MILES
}
fn default_circle_vertices() -> usize {
    DEFAULT_CIRCLE_VERTICES
}
fn default_top_items_limit() -> usize {
    DEFAULT_TOP_ITEMS_LIMIT
}
fn default_demographic_radii() -> Vec<f64> {
    DEFAULT_DEMOGRAPHIC_RADII.to_vec()
}
fn default_coordinate_precision() -> u32 {
    DEFAULT_COORDINATE_PRECISION
}
fn default_poi_ttl() -> u64 {
    DEFAULT_POI_TTL_SECS
}
fn default_listing_ttl() -> u64 {
    DEFAULT_LISTING_TTL_SECS
}
fn default_demographics_ttl() -> u64 {
    DEFAULT_DEMOGRAPHICS_TTL_SECS
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_radius_miles: default_radius_miles(),
            fetch_radius_inflation: default_fetch_radius_inflation(),
            min_fetch_radius_miles: default_min_fetch_radius_miles(),
            circle_vertices: default_circle_vertices(),
            top_items_limit: default_top_items_limit(),
            demographic_radii: default_demographic_radii(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            coordinate_precision: default_coordinate_precision(),
            poi_ttl_secs: default_poi_ttl(),
            listing_ttl_secs: default_listing_ttl(),
            demographics_ttl_secs: default_demographics_ttl(),
            debounce_ms: default_debounce_ms(),
            stale_policy: StalePolicy::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: default_provider_timeout(),
            fixture_path: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl AnalysisConfig {
    pub fn fetch_policy(&self) -> FetchRadiusPolicy {
        FetchRadiusPolicy {
            inflation: self.fetch_radius_inflation,
            floor_miles: self.min_fetch_radius_miles,
        }
    }
}

impl CacheConfig {
    pub fn poi_ttl(&self) -> Duration {
        Duration::from_secs(self.poi_ttl_secs)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn demographics_ttl(&self) -> Duration {
        Duration::from_secs(self.demographics_ttl_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Parse an optional bound; "none" or an empty string clears it
fn parse_optional(key: &str, value: &str) -> Result<Option<f64>> {
    match value.trim().to_lowercase().as_str() {
        "" | "none" => Ok(None),
        _ => parse_value(key, value).map(Some),
    }
}

fn parse_radii(key: &str, value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_value(key, part))
        .collect()
}

fn show_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            let config: Config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;

        let analysis = &self.analysis;
        if !(analysis.default_radius_miles > 0.0) {
            return Err(Error::Config(
                "analysis.default_radius_miles must be positive".to_string(),
            ));
        }
        if !(analysis.fetch_radius_inflation >= 1.0) {
            return Err(Error::Config(
                "analysis.fetch_radius_inflation must be at least 1.0".to_string(),
            ));
        }
        if !(analysis.min_fetch_radius_miles >= 0.0) {
            return Err(Error::Config(
                "analysis.min_fetch_radius_miles must not be negative".to_string(),
            ));
        }
        crate::demographics::radius_set(&analysis.demographic_radii)
            .map_err(|e| Error::Config(format!("analysis.demographic_radii: {}", e)))?;

        if self.cache.coordinate_precision > 8 {
            return Err(Error::Config(
                "cache.coordinate_precision must be at most 8".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key" (or "scoring.weights.key")
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["analysis", "default_radius_miles"] => {
                Some(self.analysis.default_radius_miles.to_string())
            }
            ["analysis", "fetch_radius_inflation"] => {
                Some(self.analysis.fetch_radius_inflation.to_string())
            }
            ["analysis", "min_fetch_radius_miles"] => {
                Some(self.analysis.min_fetch_radius_miles.to_string())
            }
            ["analysis", "circle_vertices"] => Some(self.analysis.circle_vertices.to_string()),
            ["analysis", "top_items_limit"] => Some(self.analysis.top_items_limit.to_string()),
            ["analysis", "demographic_radii"] => Some(
                self.analysis
                    .demographic_radii
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),

            ["cache", "coordinate_precision"] => {
                Some(self.cache.coordinate_precision.to_string())
            }
            ["cache", "poi_ttl_secs"] => Some(self.cache.poi_ttl_secs.to_string()),
            ["cache", "listing_ttl_secs"] => Some(self.cache.listing_ttl_secs.to_string()),
            ["cache", "demographics_ttl_secs"] => {
                Some(self.cache.demographics_ttl_secs.to_string())
            }
            ["cache", "debounce_ms"] => Some(self.cache.debounce_ms.to_string()),
            ["cache", "stale_policy"] => Some(self.cache.stale_policy.to_string()),

            ["scoring", "weights", "size_fit"] => Some(self.scoring.weights.size_fit.to_string()),
            ["scoring", "weights", "traffic"] => Some(self.scoring.weights.traffic.to_string()),
            ["scoring", "weights", "competition"] => {
                Some(self.scoring.weights.competition.to_string())
            }
            ["scoring", "weights", "completeness"] => {
                Some(self.scoring.weights.completeness.to_string())
            }
            ["scoring", "weights", "opportunity"] => {
                Some(self.scoring.weights.opportunity.to_string())
            }
            ["scoring", "thresholds", "reference_aadt"] => {
                Some(self.scoring.thresholds.reference_aadt.to_string())
            }
            ["scoring", "thresholds", "high_traffic_aadt"] => {
                Some(self.scoring.thresholds.high_traffic_aadt.to_string())
            }
            ["scoring", "thresholds", "competitor_saturation"] => {
                Some(self.scoring.thresholds.competitor_saturation.to_string())
            }
            ["scoring", "thresholds", "strong_size_fit"] => {
                Some(self.scoring.thresholds.strong_size_fit.to_string())
            }
            ["scoring", "thresholds", "neutral"] => {
                Some(self.scoring.thresholds.neutral.to_string())
            }

            ["filters", "min_parcel_acres"] => Some(show_optional(self.filters.min_parcel_acres)),
            ["filters", "max_parcel_acres"] => Some(show_optional(self.filters.max_parcel_acres)),
            ["filters", "min_building_sqft"] => {
                Some(show_optional(self.filters.min_building_sqft))
            }
            ["filters", "max_building_sqft"] => {
                Some(show_optional(self.filters.max_building_sqft))
            }
            ["filters", "include_land"] => Some(self.filters.include_land.to_string()),
            ["filters", "include_retail"] => Some(self.filters.include_retail.to_string()),
            ["filters", "include_office"] => Some(self.filters.include_office.to_string()),

            ["provider", "kind"] => Some(self.provider.kind.to_string()),
            ["provider", "base_url"] => Some(self.provider.base_url.clone()),
            ["provider", "api_key"] => Some(self.provider.api_key.clone()),
            ["provider", "timeout_secs"] => Some(self.provider.timeout_secs.to_string()),
            ["provider", "fixture_path"] => Some(self.provider.fixture_path.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["logging", "level"] => Some(self.logging.level.clone()),

            ["output", "format"] => Some(self.output.format.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid, the value has the wrong type, or
    /// the resulting config fails validation
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let mut updated = self.clone();

        match parts.as_slice() {
            ["analysis", "default_radius_miles"] => {
                updated.analysis.default_radius_miles = parse_value(key, value)?;
            }
            ["analysis", "fetch_radius_inflation"] => {
                updated.analysis.fetch_radius_inflation = parse_value(key, value)?;
            }
            ["analysis", "min_fetch_radius_miles"] => {
                updated.analysis.min_fetch_radius_miles = parse_value(key, value)?;
            }
            ["analysis", "circle_vertices"] => {
                updated.analysis.circle_vertices = parse_value(key, value)?;
            }
            ["analysis", "top_items_limit"] => {
                updated.analysis.top_items_limit = parse_value(key, value)?;
            }
            ["analysis", "demographic_radii"] => {
                updated.analysis.demographic_radii = parse_radii(key, value)?;
            }

            ["cache", "coordinate_precision"] => {
                updated.cache.coordinate_precision = parse_value(key, value)?;
            }
            ["cache", "poi_ttl_secs"] => {
                updated.cache.poi_ttl_secs = parse_value(key, value)?;
            }
            ["cache", "listing_ttl_secs"] => {
                updated.cache.listing_ttl_secs = parse_value(key, value)?;
            }
            ["cache", "demographics_ttl_secs"] => {
                updated.cache.demographics_ttl_secs = parse_value(key, value)?;
            }
            ["cache", "debounce_ms"] => {
                updated.cache.debounce_ms = parse_value(key, value)?;
            }
            ["cache", "stale_policy"] => {
                updated.cache.stale_policy = parse_value(key, value)?;
            }

            ["scoring", "weights", "size_fit"] => {
                updated.scoring.weights.size_fit = parse_value(key, value)?;
            }
            ["scoring", "weights", "traffic"] => {
                updated.scoring.weights.traffic = parse_value(key, value)?;
            }
            ["scoring", "weights", "competition"] => {
                updated.scoring.weights.competition = parse_value(key, value)?;
            }
            ["scoring", "weights", "completeness"] => {
                updated.scoring.weights.completeness = parse_value(key, value)?;
            }
            ["scoring", "weights", "opportunity"] => {
                updated.scoring.weights.opportunity = parse_value(key, value)?;
            }
            ["scoring", "thresholds", "reference_aadt"] => {
                updated.scoring.thresholds.reference_aadt = parse_value(key, value)?;
            }
            ["scoring", "thresholds", "high_traffic_aadt"] => {
                updated.scoring.thresholds.high_traffic_aadt = parse_value(key, value)?;
            }
            ["scoring", "thresholds", "competitor_saturation"] => {
                updated.scoring.thresholds.competitor_saturation = parse_value(key, value)?;
            }
            ["scoring", "thresholds", "strong_size_fit"] => {
                updated.scoring.thresholds.strong_size_fit = parse_value(key, value)?;
            }
            ["scoring", "thresholds", "neutral"] => {
                updated.scoring.thresholds.neutral = parse_value(key, value)?;
            }

            ["filters", "min_parcel_acres"] => {
                updated.filters.min_parcel_acres = parse_optional(key, value)?;
            }
            ["filters", "max_parcel_acres"] => {
                updated.filters.max_parcel_acres = parse_optional(key, value)?;
            }
            ["filters", "min_building_sqft"] => {
                updated.filters.min_building_sqft = parse_optional(key, value)?;
            }
            ["filters", "max_building_sqft"] => {
                updated.filters.max_building_sqft = parse_optional(key, value)?;
            }
            ["filters", "include_land"] => {
                updated.filters.include_land = parse_value(key, value)?;
            }
            ["filters", "include_retail"] => {
                updated.filters.include_retail = parse_value(key, value)?;
            }
            ["filters", "include_office"] => {
                updated.filters.include_office = parse_value(key, value)?;
            }

            ["provider", "kind"] => {
                updated.provider.kind = parse_value(key, value)?;
            }
            ["provider", "base_url"] => {
                updated.provider.base_url = value.to_string();
            }
            ["provider", "api_key"] => {
                updated.provider.api_key = value.to_string();
            }
            ["provider", "timeout_secs"] => {
                updated.provider.timeout_secs = parse_value(key, value)?;
            }
            ["provider", "fixture_path"] => {
                updated.provider.fixture_path = value.to_string();
            }

            ["server", "host"] => {
                updated.server.host = value.to_string();
            }
            ["server", "port"] => {
                updated.server.port = parse_value(key, value)?;
            }

            ["logging", "level"] => {
                updated.logging.level = value.to_string();
            }

            ["output", "format"] => {
                updated.output.format = value.to_string();
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "analysis.default_radius_miles",
            "analysis.fetch_radius_inflation",
            "analysis.min_fetch_radius_miles",
            "analysis.circle_vertices",
            "analysis.top_items_limit",
            "analysis.demographic_radii",
            "cache.coordinate_precision",
            "cache.poi_ttl_secs",
            "cache.listing_ttl_secs",
            "cache.demographics_ttl_secs",
            "cache.debounce_ms",
            "cache.stale_policy",
            "scoring.weights.size_fit",
            "scoring.weights.traffic",
            "scoring.weights.competition",
            "scoring.weights.completeness",
            "scoring.weights.opportunity",
            "scoring.thresholds.reference_aadt",
            "scoring.thresholds.high_traffic_aadt",
            "scoring.thresholds.competitor_saturation",
            "scoring.thresholds.strong_size_fit",
            "scoring.thresholds.neutral",
            "filters.min_parcel_acres",
            "filters.max_parcel_acres",
            "filters.min_building_sqft",
            "filters.max_building_sqft",
            "filters.include_land",
            "filters.include_retail",
            "filters.include_office",
            "provider.kind",
            "provider.base_url",
            "provider.api_key",
            "provider.timeout_secs",
            "provider.fixture_path",
            "server.host",
            "server.port",
            "logging.level",
            "output.format",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.analysis.default_radius_miles, 1.0);
        assert_eq!(config.analysis.demographic_radii, vec![1.0, 3.0, 5.0]);
        assert_eq!(config.cache.listing_ttl_secs, 86_400);
        assert_eq!(config.cache.poi_ttl_secs, 3_600);
        assert_eq!(config.cache.debounce_ms, 600);
        assert_eq!(config.cache.coordinate_precision, 4);
        assert_eq!(config.provider.kind, ProviderKind::Fixture);
        assert_eq!(config.server.port, 7878);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        assert_eq!(config.get("cache.stale_policy"), Some("serve_stale".to_string()));
        config.set("cache.stale_policy", "block").unwrap();
        assert_eq!(config.cache.stale_policy, StalePolicy::Block);

        config.set("scoring.weights.traffic", "0.4").unwrap();
        assert_eq!(config.get("scoring.weights.traffic"), Some("0.4".to_string()));
        assert_eq!(config.scoring.weights.traffic, 0.4);

        config.set("analysis.demographic_radii", "1, 2.5,10").unwrap();
        assert_eq!(config.analysis.demographic_radii, vec![1.0, 2.5, 10.0]);
        assert_eq!(config.get("analysis.demographic_radii"), Some("1,2.5,10".to_string()));
    }

    #[test]
    fn test_optional_filter_bounds() {
        let mut config = Config::default();
        assert_eq!(config.get("filters.min_parcel_acres"), Some("none".to_string()));

        config.set("filters.min_parcel_acres", "2.5").unwrap();
        assert_eq!(config.filters.min_parcel_acres, Some(2.5));

        config.set("filters.min_parcel_acres", "none").unwrap();
        assert_eq!(config.filters.min_parcel_acres, None);
    }

    #[test]
    fn test_get_invalid_key() {
        let config = Config::default();
        assert_eq!(config.get("invalid.key"), None);
    }

    #[test]
    fn test_set_invalid_key() {
        let mut config = Config::default();
        let result = config.set("invalid.key", "value");
        assert!(result.is_err());
    }

    #[test]
    fn test_set_invalid_value() {
        let mut config = Config::default();
        assert!(config.set("analysis.default_radius_miles", "not_a_number").is_err());
        assert!(config.set("provider.kind", "carrier_pigeon").is_err());
    }

    #[test]
    fn test_set_rejects_invalid_config() {
        let mut config = Config::default();
        assert!(config.set("scoring.weights.size_fit", "-1").is_err());
        assert!(config.set("analysis.demographic_radii", "1,0").is_err());
        assert!(config.set("analysis.fetch_radius_inflation", "0.5").is_err());
        assert!(config.set("scoring.thresholds.neutral", "5").is_err());
        assert!(config.set("scoring.thresholds.reference_aadt", "NaN").is_err());

        // Rejected values leave the config unchanged
        assert_eq!(config.scoring.weights.size_fit, DEFAULT_WEIGHT_SIZE_FIT);
        assert_eq!(config.scoring.thresholds.neutral, DEFAULT_NEUTRAL_SIGNAL);
        assert_eq!(config.analysis.demographic_radii, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tradescope").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.provider.kind = ProviderKind::Http;
        config.provider.base_url = "https://gateway.example".to_string();
        config.filters.max_building_sqft = Some(20_000.0);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider.kind, ProviderKind::Http);
        assert_eq!(loaded.provider.base_url, "https://gateway.example");
        assert_eq!(loaded.filters.max_building_sqft, Some(20_000.0));
        assert_eq!(loaded.filters.min_building_sqft, None);
    }

    #[test]
    fn test_load_creates_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 7878);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[scoring.weights]\ntraffic = -2.0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.cache.debounce_ms, 600);
        assert!(config.filters.include_office);
    }

    #[test]
    fn test_serialization_format() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();

        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[scoring.weights]"));
        assert!(toml.contains("[filters]"));
        assert!(toml.contains("[provider]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[logging]"));

        let loaded: Config = toml::from_str(&toml).unwrap();
        assert_eq!(loaded.scoring, config.scoring);
        assert_eq!(loaded.filters, config.filters);
    }

    #[test]
    fn test_every_key_readable() {
        let config = Config::default();
        for key in Config::available_keys() {
            assert!(config.get(key).is_some(), "unreadable key {}", key);
        }
    }

    #[test]
    fn test_server_addr() {
        let config = Config::default();
        assert_eq!(config.server_addr(), "127.0.0.1:7878");
    }
}
