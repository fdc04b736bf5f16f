//! Multi-radius demographic metrics
//!
//! The demographics collaborator answers for a center and a set of radii at
//! once. Its answer is held as a [`DemographicsBundle`], keyed by
//! [`RadiusKey`] so a lookup never lands on a neighboring radius.

pub mod merger;

pub use merger::DemographicsMerger;

use crate::coord::GeoPoint;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Metrics for one ring around a center
///
/// Every field is nullable: the upstream may have no coverage for a metric
/// in a given geography.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicMetrics {
    pub population: Option<f64>,
    pub households: Option<f64>,
    pub median_age: Option<f64>,
    pub median_household_income: Option<f64>,
    pub per_capita_income: Option<f64>,

    // Household income tiers
    pub households_income_under_50k: Option<f64>,
    pub households_income_50k_100k: Option<f64>,
    pub households_income_over_100k: Option<f64>,

    pub total_businesses: Option<f64>,
    pub total_employees: Option<f64>,

    // Annual consumer spending
    pub spending_food_away: Option<f64>,
    pub spending_apparel: Option<f64>,
    pub spending_entertainment: Option<f64>,
    pub spending_household: Option<f64>,
    pub spending_retail_goods: Option<f64>,
}

impl DemographicMetrics {
    /// Metric names paired with their values, in display order
    pub fn fields(&self) -> [(&'static str, Option<f64>); 15] {
        [
            ("population", self.population),
            ("households", self.households),
            ("median_age", self.median_age),
            ("median_household_income", self.median_household_income),
            ("per_capita_income", self.per_capita_income),
            ("households_income_under_50k", self.households_income_under_50k),
            ("households_income_50k_100k", self.households_income_50k_100k),
            ("households_income_over_100k", self.households_income_over_100k),
            ("total_businesses", self.total_businesses),
            ("total_employees", self.total_employees),
            ("spending_food_away", self.spending_food_away),
            ("spending_apparel", self.spending_apparel),
            ("spending_entertainment", self.spending_entertainment),
            ("spending_household", self.spending_household),
            ("spending_retail_goods", self.spending_retail_goods),
        ]
    }

    /// Number of metrics with a value
    pub fn coverage(&self) -> usize {
        self.fields().iter().filter(|(_, v)| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.coverage() == 0
    }
}

/// A ring radius, held in hundredths of a mile
///
/// Radii off the hundredth-mile grid are rejected rather than rounded, so
/// two different requested radii can never collapse onto one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RadiusKey(u32);

impl RadiusKey {
    pub fn from_miles(miles: f64) -> Option<Self> {
        if !miles.is_finite() || miles <= 0.0 {
            return None;
        }
        let hundredths = miles * 100.0;
        let rounded = hundredths.round();
        if (hundredths - rounded).abs() > 1e-6 || rounded > u32::MAX as f64 {
            return None;
        }
        Some(Self(rounded as u32))
    }

    pub fn miles(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for RadiusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.miles())
    }
}

impl FromStr for RadiusKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(Self::from_miles)
            .ok_or_else(|| Error::InvalidRadius(format!("Invalid ring radius: {}", s)))
    }
}

impl TryFrom<String> for RadiusKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<RadiusKey> for String {
    fn from(key: RadiusKey) -> Self {
        key.to_string()
    }
}

/// Normalize a requested radius list into a deduplicated key set
pub fn radius_set(radii: &[f64]) -> Result<BTreeSet<RadiusKey>> {
    if radii.is_empty() {
        return Err(Error::InvalidRadius(
            "At least one demographic radius is required".to_string(),
        ));
    }
    radii
        .iter()
        .map(|r| {
            RadiusKey::from_miles(*r).ok_or_else(|| {
                Error::InvalidRadius(format!(
                    "Radius {} must be positive and a whole number of hundredths of a mile",
                    r
                ))
            })
        })
        .collect()
}

/// Metrics for every ring fetched around one center
///
/// Built whole from one upstream answer and never patched afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsBundle {
    pub center: GeoPoint,
    pub radii: BTreeMap<RadiusKey, DemographicMetrics>,
    pub fetched_at: DateTime<Utc>,
}

impl DemographicsBundle {
    /// Shape an upstream answer into a bundle for exactly `requested`
    ///
    /// Requested rings the upstream left out are recorded with every metric
    /// null; rings nobody asked for are dropped.
    pub fn assemble(
        center: GeoPoint,
        requested: &BTreeSet<RadiusKey>,
        mut upstream: BTreeMap<RadiusKey, DemographicMetrics>,
    ) -> Self {
        let radii = requested
            .iter()
            .map(|key| {
                let metrics = upstream.remove(key).unwrap_or_else(|| {
                    warn!(radius = %key, "demographics upstream returned no ring for radius");
                    DemographicMetrics::default()
                });
                (*key, metrics)
            })
            .collect();

        Self {
            center,
            radii,
            fetched_at: Utc::now(),
        }
    }

    /// Whether every requested ring is present
    pub fn covers(&self, requested: &BTreeSet<RadiusKey>) -> bool {
        requested.iter().all(|key| self.radii.contains_key(key))
    }
}

/// Metrics for exactly `radius_miles`, if that ring was fetched
///
/// Never falls back to a neighboring ring.
pub fn select_radius(bundle: &DemographicsBundle, radius_miles: f64) -> Option<&DemographicMetrics> {
    RadiusKey::from_miles(radius_miles).and_then(|key| bundle.radii.get(&key))
}
