//! Opportunity scoring and ranking
//!
//! Candidate properties come from the parcel collaborator (or a caller's
//! payload). They are filtered by [`FilterCriteria`], scored by a
//! configurable weight table and ranked densely.

pub mod rank;
pub mod weights;

pub use rank::{is_emphasized, rank, OpportunityRanking, ScoreBreakdown, Scorer};
pub use weights::{ScoringPolicy, SignalThresholds, WeightTable};

use crate::cache::key::RequestKeyBuilder;
use crate::coord::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw signal: annual average daily traffic on the adjacent corridor
pub const SIGNAL_TRAFFIC_AADT: &str = "traffic_aadt";

/// Raw signal: number of same-brand competitors nearby
pub const SIGNAL_COMPETITORS_NEARBY: &str = "competitors_nearby";

/// Property use class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Land,
    Retail,
    Office,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Land => write!(f, "land"),
            Self::Retail => write!(f, "retail"),
            Self::Office => write!(f, "office"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// How the property came to be a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    /// Flagged by analysis, not on the market
    Opportunity,
    ActiveListing,
}

/// A site under consideration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProperty {
    pub id: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel_acres: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_sqft: Option<f64>,
    pub listing_type: ListingType,
    #[serde(default)]
    pub raw_signals: BTreeMap<String, f64>,
}

impl CandidateProperty {
    pub fn signal(&self, name: &str) -> Option<f64> {
        self.raw_signals.get(name).copied().filter(|v| v.is_finite())
    }
}

/// Which candidates the user wants to see
///
/// Absent bounds are open. Defaults include every property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_parcel_acres: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parcel_acres: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_building_sqft: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_building_sqft: Option<f64>,
    pub include_land: bool,
    pub include_retail: bool,
    pub include_office: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_parcel_acres: None,
            max_parcel_acres: None,
            min_building_sqft: None,
            max_building_sqft: None,
            include_land: true,
            include_retail: true,
            include_office: true,
        }
    }
}

impl FilterCriteria {
    /// Whether `property` passes both the type gate and the size gate
    pub fn accepts(&self, property: &CandidateProperty) -> bool {
        self.accepts_type(property.property_type) && self.accepts_size(property)
    }

    /// Unclassified properties pass only when nothing is excluded
    fn accepts_type(&self, property_type: PropertyType) -> bool {
        match property_type {
            PropertyType::Land => self.include_land,
            PropertyType::Retail => self.include_retail,
            PropertyType::Office => self.include_office,
            PropertyType::Other => self.include_land && self.include_retail && self.include_office,
        }
    }

    /// Each present, nonzero size attribute must fall in its range
    fn accepts_size(&self, property: &CandidateProperty) -> bool {
        within(
            property.parcel_acres,
            self.min_parcel_acres,
            self.max_parcel_acres,
        ) && within(
            property.building_sqft,
            self.min_building_sqft,
            self.max_building_sqft,
        )
    }

    /// Add every criterion to a request key
    pub fn key_params(&self, builder: RequestKeyBuilder) -> RequestKeyBuilder {
        builder
            .opt_param("min_acres", self.min_parcel_acres)
            .opt_param("max_acres", self.max_parcel_acres)
            .opt_param("min_sqft", self.min_building_sqft)
            .opt_param("max_sqft", self.max_building_sqft)
            .param("land", self.include_land)
            .param("retail", self.include_retail)
            .param("office", self.include_office)
    }
}

fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    match value {
        None => true,
        Some(v) if v == 0.0 => true,
        Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
    }
}

/// Candidates passing `criteria`, in input order
pub fn filter_candidates(
    properties: &[CandidateProperty],
    criteria: &FilterCriteria,
) -> Vec<CandidateProperty> {
    properties
        .iter()
        .filter(|p| criteria.accepts(p))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn candidate(
        id: &str,
        property_type: PropertyType,
        acres: Option<f64>,
        sqft: Option<f64>,
    ) -> CandidateProperty {
        CandidateProperty {
            id: id.to_string(),
            location: GeoPoint::new(41.5868, -93.6250).unwrap(),
            address: Some(format!("{} Main St", id)),
            city: Some("Des Moines".to_string()),
            state: Some("IA".to_string()),
            zip: Some("50309".to_string()),
            property_type,
            parcel_acres: acres,
            building_sqft: sqft,
            listing_type: ListingType::ActiveListing,
            raw_signals: BTreeMap::new(),
        }
    }

    #[test]
    fn test_type_gate() {
        let criteria = FilterCriteria {
            include_office: false,
            ..Default::default()
        };
        assert!(criteria.accepts(&candidate("a", PropertyType::Land, None, None)));
        assert!(criteria.accepts(&candidate("b", PropertyType::Retail, None, None)));
        assert!(!criteria.accepts(&candidate("c", PropertyType::Office, None, None)));
        assert!(!criteria.accepts(&candidate("d", PropertyType::Other, None, None)));

        assert!(FilterCriteria::default().accepts(&candidate("d", PropertyType::Other, None, None)));
    }

    #[test]
    fn test_size_gate_absent_attributes_pass() {
        let criteria = FilterCriteria {
            min_parcel_acres: Some(1.0),
            max_parcel_acres: Some(5.0),
            min_building_sqft: Some(2_000.0),
            max_building_sqft: Some(10_000.0),
            ..Default::default()
        };

        // Land checked on acreage only
        assert!(criteria.accepts(&candidate("a", PropertyType::Land, Some(2.5), None)));
        assert!(!criteria.accepts(&candidate("b", PropertyType::Land, Some(8.0), None)));

        // Improved property checked on building area only
        assert!(criteria.accepts(&candidate("c", PropertyType::Retail, None, Some(4_000.0))));
        assert!(!criteria.accepts(&candidate("d", PropertyType::Retail, None, Some(500.0))));

        // Zero means unknown
        assert!(criteria.accepts(&candidate("e", PropertyType::Retail, Some(0.0), Some(4_000.0))));

        // Both present: both must fit
        assert!(criteria.accepts(&candidate("f", PropertyType::Retail, Some(2.0), Some(4_000.0))));
        assert!(!criteria.accepts(&candidate("g", PropertyType::Retail, Some(9.0), Some(4_000.0))));
    }

    #[test]
    fn test_open_bounds() {
        let criteria = FilterCriteria {
            min_parcel_acres: Some(1.0),
            ..Default::default()
        };
        assert!(criteria.accepts(&candidate("a", PropertyType::Land, Some(500.0), None)));
        assert!(!criteria.accepts(&candidate("b", PropertyType::Land, Some(0.5), None)));
    }

    #[test]
    fn test_filter_preserves_order() {
        let props = vec![
            candidate("z", PropertyType::Land, None, None),
            candidate("x", PropertyType::Office, None, None),
            candidate("y", PropertyType::Land, None, None),
        ];
        let criteria = FilterCriteria {
            include_office: false,
            ..Default::default()
        };
        let ids: Vec<_> = filter_candidates(&props, &criteria)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["z", "y"]);
    }

    #[test]
    fn test_unknown_property_type_parses_as_other() {
        let json = r#"{
            "id": "p1",
            "location": {"lat": 41.6, "lng": -93.6},
            "property_type": "industrial",
            "listing_type": "opportunity"
        }"#;
        let property: CandidateProperty = serde_json::from_str(json).unwrap();
        assert_eq!(property.property_type, PropertyType::Other);
        assert!(property.raw_signals.is_empty());
    }

    #[test]
    fn test_criteria_change_key() {
        use crate::cache::RequestKey;
        let base = || RequestKey::builder("listings", 4);
        let all = FilterCriteria::default().key_params(base()).build();
        let no_land = FilterCriteria {
            include_land: false,
            ..Default::default()
        }
        .key_params(base())
        .build();
        assert_ne!(all, no_land);
    }
}
