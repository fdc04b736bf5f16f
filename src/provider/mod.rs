//! External data collaborators
//!
//! POI search, demographics, parcel lookup and isochrones are third-party
//! services. Only the shapes of their requests and responses live here;
//! [`http::HttpSources`] talks to a JSON gateway and
//! [`fixture::FixtureSources`] serves a local dataset.

pub mod fixture;
pub mod http;

use crate::analysis::PointOfInterest;
use crate::config::{ProviderConfig, ProviderKind};
use crate::coord::{Bounds, EffectiveCircle, GeoPoint, Polygon};
use crate::demographics::{DemographicMetrics, RadiusKey};
use crate::error::{Error, Result};
use crate::scoring::{CandidateProperty, FilterCriteria};
use self::fixture::{FixtureData, FixtureSources};
use self::http::HttpSources;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Travel mode for isochrones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Cycling,
}

impl TravelMode {
    /// Typical urban speed, used when only an approximation is available
    pub fn nominal_speed_mph(&self) -> f64 {
        match self {
            Self::Driving => 25.0,
            Self::Walking => 3.0,
            Self::Cycling => 10.0,
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driving => write!(f, "driving"),
            Self::Walking => write!(f, "walking"),
            Self::Cycling => write!(f, "cycling"),
        }
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "driving" | "drive" | "car" => Ok(Self::Driving),
            "walking" | "walk" => Ok(Self::Walking),
            "cycling" | "bike" | "bicycle" => Ok(Self::Cycling),
            _ => Err(format!("Unknown travel mode: {}", s)),
        }
    }
}

/// Area searched for candidate properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParcelArea {
    Bounds(Bounds),
    Circle(EffectiveCircle),
}

impl ParcelArea {
    pub fn contains(&self, point: GeoPoint) -> bool {
        match self {
            Self::Bounds(bounds) => bounds.contains(point),
            Self::Circle(circle) => {
                crate::coord::geometry::haversine_miles(circle.center, point) <= circle.radius_miles
            }
        }
    }
}

/// A parcel search: an area plus the filter knobs the upstream honors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelQuery {
    pub area: ParcelArea,
    pub criteria: FilterCriteria,
}

/// Points of interest around a center
pub trait PoiSource: Send + Sync {
    /// POIs within the circle, in upstream relevance order
    fn search_pois(
        &self,
        circle: EffectiveCircle,
    ) -> impl Future<Output = Result<Vec<PointOfInterest>>> + Send;
}

/// Demographic rings around a center
pub trait DemographicsSource: Send + Sync {
    /// Metrics for every radius in one call
    fn fetch_demographics(
        &self,
        center: GeoPoint,
        radii: &[RadiusKey],
    ) -> impl Future<Output = Result<BTreeMap<RadiusKey, DemographicMetrics>>> + Send;
}

/// Candidate properties in an area
pub trait ParcelSource: Send + Sync {
    fn search_parcels(
        &self,
        query: &ParcelQuery,
    ) -> impl Future<Output = Result<Vec<CandidateProperty>>> + Send;
}

/// Travel-time polygons
pub trait IsochroneSource: Send + Sync {
    fn isochrone(
        &self,
        center: GeoPoint,
        mode: TravelMode,
        minutes: u32,
    ) -> impl Future<Output = Result<Polygon>> + Send;
}

/// Every collaborator a session needs
pub trait DataSources:
    PoiSource + DemographicsSource + ParcelSource + IsochroneSource + 'static
{
}

impl<T> DataSources for T where
    T: PoiSource + DemographicsSource + ParcelSource + IsochroneSource + 'static
{
}

/// The collaborators selected by `[provider]`
#[derive(Debug)]
pub enum ConfiguredSources {
    Fixture(FixtureSources),
    Http(HttpSources),
}

impl ConfiguredSources {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config.kind {
            ProviderKind::Fixture if config.fixture_path.is_empty() => {
                info!("using built-in sample dataset");
                Ok(Self::Fixture(FixtureSources::new(FixtureData::sample())))
            }
            ProviderKind::Fixture => {
                info!(path = %config.fixture_path, "loading fixture dataset");
                Ok(Self::Fixture(FixtureSources::load(Path::new(
                    &config.fixture_path,
                ))?))
            }
            ProviderKind::Http => {
                if config.base_url.is_empty() {
                    return Err(Error::Config(
                        "provider.base_url is required for the http provider".to_string(),
                    ));
                }
                info!(base_url = %config.base_url, "using HTTP gateway");
                let api_key = Some(config.api_key.clone());
                let timeout = Duration::from_secs(config.timeout_secs);
                Ok(Self::Http(HttpSources::new(&config.base_url, api_key, timeout)?))
            }
        }
    }
}

impl PoiSource for ConfiguredSources {
    async fn search_pois(&self, circle: EffectiveCircle) -> Result<Vec<PointOfInterest>> {
        match self {
            Self::Fixture(sources) => sources.search_pois(circle).await,
            Self::Http(sources) => sources.search_pois(circle).await,
        }
    }
}

impl DemographicsSource for ConfiguredSources {
    async fn fetch_demographics(
        &self,
        center: GeoPoint,
        radii: &[RadiusKey],
    ) -> Result<BTreeMap<RadiusKey, DemographicMetrics>> {
        match self {
            Self::Fixture(sources) => sources.fetch_demographics(center, radii).await,
            Self::Http(sources) => sources.fetch_demographics(center, radii).await,
        }
    }
}

impl ParcelSource for ConfiguredSources {
    async fn search_parcels(&self, query: &ParcelQuery) -> Result<Vec<CandidateProperty>> {
        match self {
            Self::Fixture(sources) => sources.search_parcels(query).await,
            Self::Http(sources) => sources.search_parcels(query).await,
        }
    }
}

impl IsochroneSource for ConfiguredSources {
    async fn isochrone(&self, center: GeoPoint, mode: TravelMode, minutes: u32) -> Result<Polygon> {
        match self {
            Self::Fixture(sources) => sources.isochrone(center, mode, minutes).await,
            Self::Http(sources) => sources.isochrone(center, mode, minutes).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_travel_mode_parse() {
        assert_eq!(TravelMode::from_str("walk").unwrap(), TravelMode::Walking);
        assert_eq!(TravelMode::from_str("DRIVING").unwrap(), TravelMode::Driving);
        assert!(TravelMode::from_str("teleport").is_err());
    }

    #[test]
    fn test_parcel_area_contains() {
        let center = GeoPoint::new(41.5868, -93.6250).unwrap();
        let circle = ParcelArea::Circle(EffectiveCircle {
            center,
            radius_miles: 1.0,
        });
        assert!(circle.contains(GeoPoint::new(41.59, -93.625).unwrap()));
        assert!(!circle.contains(GeoPoint::new(41.70, -93.625).unwrap()));
    }

    #[test]
    fn test_configured_sources_default_is_sample() {
        let sources = ConfiguredSources::from_config(&ProviderConfig::default()).unwrap();
        match sources {
            ConfiguredSources::Fixture(fixture) => {
                assert_eq!(fixture.data(), &FixtureData::sample());
            }
            ConfiguredSources::Http(_) => panic!("expected fixture sources"),
        }
    }

    #[test]
    fn test_http_provider_requires_base_url() {
        let config = ProviderConfig {
            kind: ProviderKind::Http,
            ..ProviderConfig::default()
        };
        let err = ConfiguredSources::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_missing_fixture_file_is_config_error() {
        let config = ProviderConfig {
            fixture_path: "/nonexistent/tradescope/fixture.json".to_string(),
            ..ProviderConfig::default()
        };
        assert!(ConfiguredSources::from_config(&config).is_err());
    }
}
