//! In-memory data sources
//!
//! Serves a JSON dataset as if it came from the upstream services: POIs are
//! filtered by great-circle distance, parcels by area and criteria,
//! demographics by requested ring. Every call is counted, and latency or
//! failures can be injected, so the orchestration layer can be exercised
//! without a network.

use crate::analysis::{PoiCategory, PointOfInterest};
use crate::coord::geometry::{circle_polygon, haversine_miles};
use crate::coord::{EffectiveCircle, GeoPoint, Polygon};
use crate::demographics::{DemographicMetrics, RadiusKey};
use crate::error::{Error, Result};
use crate::provider::{
    DemographicsSource, IsochroneSource, ParcelQuery, ParcelSource, PoiSource, TravelMode,
};
use crate::scoring::{CandidateProperty, ListingType, PropertyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Collaborator identity, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Pois,
    Demographics,
    Parcels,
    Isochrone,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pois => "poi search",
            Self::Demographics => "demographics",
            Self::Parcels => "parcel lookup",
            Self::Isochrone => "isochrone",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// A canned isochrone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureIsochrone {
    pub mode: TravelMode,
    pub minutes: u32,
    pub polygon: Polygon,
}

/// The dataset behind [`FixtureSources`]
///
/// Demographic rings apply to any center.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub pois: Vec<PointOfInterest>,
    pub demographics: BTreeMap<RadiusKey, DemographicMetrics>,
    pub properties: Vec<CandidateProperty>,
    pub isochrones: Vec<FixtureIsochrone>,
}

impl FixtureData {
    /// Read a dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read fixture file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse fixture file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Built-in demo dataset around downtown Des Moines
    ///
    /// Within one mile of [`FixtureData::SAMPLE_CENTER`] there are 12
    /// anchors, 5 quick-service, no restaurants and 3 retail POIs; a few more
    /// sit between 2 and 4.5 miles out.
    pub fn sample() -> Self {
        let (lat, lng) = Self::SAMPLE_CENTER;

        let mut pois: Vec<PointOfInterest> = (0..20)
            .filter_map(|i| {
                let category = match i {
                    3 | 11 | 19 => PoiCategory::Retail,
                    _ if i % 4 == 1 => PoiCategory::QuickService,
                    _ => PoiCategory::Anchors,
                };
                let distance = 0.05 + 0.04 * i as f64;
                sample_poi(i, category, lat, lng, distance, i as f64 * 137.5)
            })
            .collect();
        pois.extend((0..6).filter_map(|i| {
            let category = if i % 2 == 0 {
                PoiCategory::Restaurants
            } else {
                PoiCategory::Retail
            };
            sample_poi(20 + i, category, lat, lng, 2.0 + 0.5 * i as f64, i as f64 * 60.0)
        }));

        let demographics = [(1.0, 1.0), (3.0, 6.5), (5.0, 14.0), (10.0, 38.0)]
            .into_iter()
            .filter_map(|(radius, scale)| {
                let key = RadiusKey::from_miles(radius)?;
                Some((key, sample_metrics(scale)))
            })
            .collect();

        let properties = [
            sample_property("opp-001", PropertyType::Land, ListingType::Opportunity, 0.3, 45.0, Some(2.4), None, Some(28_500.0), Some(0.0)),
            sample_property("opp-002", PropertyType::Retail, ListingType::Opportunity, 0.8, 200.0, Some(1.1), Some(4_800.0), Some(18_200.0), Some(1.0)),
            sample_property("lst-101", PropertyType::Retail, ListingType::ActiveListing, 0.5, 310.0, None, Some(6_200.0), Some(22_000.0), Some(3.0)),
            sample_property("lst-102", PropertyType::Office, ListingType::ActiveListing, 1.2, 90.0, None, Some(12_500.0), Some(9_400.0), None),
            sample_property("lst-103", PropertyType::Land, ListingType::ActiveListing, 2.6, 150.0, Some(7.5), None, None, Some(0.0)),
            sample_property("lst-104", PropertyType::Other, ListingType::ActiveListing, 1.8, 270.0, Some(0.9), Some(3_100.0), Some(14_000.0), Some(2.0)),
            sample_property("lst-105", PropertyType::Retail, ListingType::ActiveListing, 3.4, 20.0, Some(1.6), Some(2_400.0), Some(31_000.0), Some(5.0)),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            pois,
            demographics,
            properties,
            isochrones: Vec::new(),
        }
    }

    /// Center of the sample dataset
    pub const SAMPLE_CENTER: (f64, f64) = (41.5868, -93.6250);
}

/// Point `miles` from (lat, lng) at `bearing_deg`, flat-earth approximation
fn offset(lat: f64, lng: f64, miles: f64, bearing_deg: f64) -> (f64, f64) {
    let bearing = bearing_deg.to_radians();
    let dlat = miles * bearing.cos() / 69.0;
    let dlng = miles * bearing.sin() / (69.0 * lat.to_radians().cos());
    (lat + dlat, lng + dlng)
}

fn sample_poi(
    i: usize,
    category: PoiCategory,
    lat: f64,
    lng: f64,
    miles: f64,
    bearing: f64,
) -> Option<PointOfInterest> {
    let (plat, plng) = offset(lat, lng, miles, bearing);
    Some(PointOfInterest {
        id: format!("poi-{:03}", i),
        name: format!("{} #{}", category.label(), i),
        category,
        location: GeoPoint::new(plat, plng).ok()?,
        address: Some(format!("{} Grand Ave", 100 + i * 10)),
        rating: Some(3.5 + (i % 4) as f64 * 0.4),
    })
}

fn sample_metrics(scale: f64) -> DemographicMetrics {
    DemographicMetrics {
        population: Some((8_200.0 * scale).round()),
        households: Some((3_600.0 * scale).round()),
        median_age: Some(34.2),
        median_household_income: Some(58_400.0),
        per_capita_income: Some(31_900.0),
        households_income_under_50k: Some((1_700.0 * scale).round()),
        households_income_50k_100k: Some((1_250.0 * scale).round()),
        households_income_over_100k: Some((650.0 * scale).round()),
        total_businesses: Some((910.0 * scale).round()),
        total_employees: Some((14_300.0 * scale).round()),
        spending_food_away: Some((12_100_000.0 * scale).round()),
        spending_apparel: Some((6_800_000.0 * scale).round()),
        spending_entertainment: Some((9_300_000.0 * scale).round()),
        spending_household: Some((8_100_000.0 * scale).round()),
        spending_retail_goods: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_property(
    id: &str,
    property_type: PropertyType,
    listing_type: ListingType,
    miles: f64,
    bearing: f64,
    acres: Option<f64>,
    sqft: Option<f64>,
    aadt: Option<f64>,
    competitors: Option<f64>,
) -> Option<CandidateProperty> {
    let (lat, lng) = FixtureData::SAMPLE_CENTER;
    let (plat, plng) = offset(lat, lng, miles, bearing);
    let mut raw_signals = BTreeMap::new();
    if let Some(aadt) = aadt {
        raw_signals.insert(crate::scoring::SIGNAL_TRAFFIC_AADT.to_string(), aadt);
    }
    if let Some(n) = competitors {
        raw_signals.insert(crate::scoring::SIGNAL_COMPETITORS_NEARBY.to_string(), n);
    }

    Some(CandidateProperty {
        id: id.to_string(),
        location: GeoPoint::new(plat, plng).ok()?,
        address: Some(format!("{} Locust St", 200 + (bearing as usize))),
        city: Some("Des Moines".to_string()),
        state: Some("IA".to_string()),
        zip: (listing_type == ListingType::ActiveListing).then(|| "50309".to_string()),
        property_type,
        parcel_acres: acres,
        building_sqft: sqft,
        listing_type,
        raw_signals,
    })
}

/// Data sources backed by a [`FixtureData`] set
#[derive(Debug)]
pub struct FixtureSources {
    data: FixtureData,
    latency: Option<Duration>,
    calls: [AtomicUsize; 4],
    failing: [AtomicBool; 4],
}

impl FixtureSources {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data,
            latency: None,
            calls: Default::default(),
            failing: Default::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(FixtureData::load(path)?))
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call to `service` fail until reset
    pub fn set_failing(&self, service: Service, failing: bool) {
        self.failing[service.index()].store(failing, Ordering::SeqCst);
    }

    /// Number of calls `service` has received
    pub fn calls(&self, service: Service) -> usize {
        self.calls[service.index()].load(Ordering::SeqCst)
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }

    async fn enter(&self, service: Service) -> Result<()> {
        self.calls[service.index()].fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing[service.index()].load(Ordering::SeqCst) {
            return Err(Error::upstream(service.name(), "fixture configured to fail"));
        }
        Ok(())
    }
}

impl PoiSource for FixtureSources {
    async fn search_pois(&self, circle: EffectiveCircle) -> Result<Vec<PointOfInterest>> {
        self.enter(Service::Pois).await?;
        Ok(self
            .data
            .pois
            .iter()
            .filter(|poi| haversine_miles(circle.center, poi.location) <= circle.radius_miles)
            .cloned()
            .collect())
    }
}

impl DemographicsSource for FixtureSources {
    async fn fetch_demographics(
        &self,
        _center: GeoPoint,
        radii: &[RadiusKey],
    ) -> Result<BTreeMap<RadiusKey, DemographicMetrics>> {
        self.enter(Service::Demographics).await?;
        Ok(radii
            .iter()
            .filter_map(|key| self.data.demographics.get(key).map(|m| (*key, m.clone())))
            .collect())
    }
}

impl ParcelSource for FixtureSources {
    async fn search_parcels(&self, query: &ParcelQuery) -> Result<Vec<CandidateProperty>> {
        self.enter(Service::Parcels).await?;
        Ok(self
            .data
            .properties
            .iter()
            .filter(|p| query.area.contains(p.location) && query.criteria.accepts(p))
            .cloned()
            .collect())
    }
}

impl IsochroneSource for FixtureSources {
    /// A canned polygon when one matches, else a circle at the mode's
    /// nominal speed
    async fn isochrone(&self, center: GeoPoint, mode: TravelMode, minutes: u32) -> Result<Polygon> {
        self.enter(Service::Isochrone).await?;
        if let Some(canned) = self
            .data
            .isochrones
            .iter()
            .find(|iso| iso.mode == mode && iso.minutes == minutes)
        {
            return Ok(canned.polygon.clone());
        }

        let radius_miles = mode.nominal_speed_mph() * minutes as f64 / 60.0;
        circle_polygon(center, radius_miles).ok_or_else(|| {
            Error::InvalidRadius(format!("No isochrone for {} minutes", minutes))
        })
    }
}
