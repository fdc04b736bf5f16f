//! Trade-area analysis results
//!
//! Points of interest come back from the POI collaborator for an effective
//! circle; this module turns them into an [`AnalysisResult`] whose category
//! summary always matches its member list.

pub mod aggregate;

use crate::coord::{EffectiveCircle, GeoPoint, TradeArea};
use aggregate::{aggregate, filter_by_polygon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// POI category
///
/// The set is closed; display color-coding and scoring both key off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiCategory {
    Anchors,
    QuickService,
    Restaurants,
    Retail,
}

impl PoiCategory {
    pub const ALL: [PoiCategory; 4] = [
        PoiCategory::Anchors,
        PoiCategory::QuickService,
        PoiCategory::Restaurants,
        PoiCategory::Retail,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anchors => "Anchor stores",
            Self::QuickService => "Quick-service restaurants",
            Self::Restaurants => "Restaurants",
            Self::Retail => "Retail",
        }
    }
}

impl std::fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anchors => write!(f, "anchors"),
            Self::QuickService => write!(f, "quick_service"),
            Self::Restaurants => write!(f, "restaurants"),
            Self::Retail => write!(f, "retail"),
        }
    }
}

impl std::str::FromStr for PoiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anchors" | "anchor" => Ok(Self::Anchors),
            "quick_service" | "quick-service" | "qsr" => Ok(Self::QuickService),
            "restaurants" | "restaurant" => Ok(Self::Restaurants),
            "retail" => Ok(Self::Retail),
            _ => Err(format!("Unknown POI category: {}", s)),
        }
    }
}

/// A categorized nearby place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    pub category: PoiCategory,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Count of POIs per category
///
/// Every category is present, zero counts included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySummary(BTreeMap<PoiCategory, usize>);

impl CategorySummary {
    /// A summary with every category at zero
    pub fn zeroed() -> Self {
        Self(PoiCategory::ALL.iter().map(|c| (*c, 0)).collect())
    }

    pub(crate) fn increment(&mut self, category: PoiCategory) {
        *self.0.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: PoiCategory) -> usize {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoiCategory, usize)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}

impl Default for CategorySummary {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Outcome of analyzing one trade area
///
/// `pois` and `summary_by_category` are only ever set together, so the
/// summary cannot go stale when membership changes.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    id: String,
    trade_area: TradeArea,
    center: GeoPoint,
    radius_miles: f64,
    pois: Vec<PointOfInterest>,
    summary_by_category: CategorySummary,
    /// How many POIs the upstream returned before polygon trimming
    fetched_count: usize,
    analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Build a result from a raw radius fetch
    ///
    /// For polygon trade areas the over-fetched radius result is trimmed to
    /// true polygon membership first; the summary is computed on the trimmed
    /// list.
    pub fn from_fetch(
        trade_area: TradeArea,
        circle: EffectiveCircle,
        fetched: Vec<PointOfInterest>,
    ) -> Self {
        let fetched_count = fetched.len();
        let pois = match trade_area.polygon() {
            Some(polygon) => filter_by_polygon(&fetched, polygon),
            None => fetched,
        };
        let summary_by_category = aggregate(&pois);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            trade_area,
            center: circle.center,
            radius_miles: circle.radius_miles,
            pois,
            summary_by_category,
            fetched_count,
            analyzed_at: Utc::now(),
        }
    }

    /// Replace the member list, recomputing the summary
    pub fn with_membership(mut self, pois: Vec<PointOfInterest>) -> Self {
        self.summary_by_category = aggregate(&pois);
        self.pois = pois;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trade_area(&self) -> &TradeArea {
        &self.trade_area
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_miles(&self) -> f64 {
        self.radius_miles
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn summary_by_category(&self) -> &CategorySummary {
        &self.summary_by_category
    }

    pub fn fetched_count(&self) -> usize {
        self.fetched_count
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::geometry::circle_polygon;
    use std::str::FromStr;

    fn poi(id: &str, category: PoiCategory, lat: f64, lng: f64) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            name: format!("Place {}", id),
            category,
            location: GeoPoint::new(lat, lng).unwrap(),
            address: None,
            rating: None,
        }
    }

    #[test]
    fn test_category_parse_and_display() {
        for category in PoiCategory::ALL {
            assert_eq!(PoiCategory::from_str(&category.to_string()).unwrap(), category);
        }
        assert_eq!(PoiCategory::from_str("QSR").unwrap(), PoiCategory::QuickService);
        assert!(PoiCategory::from_str("gas").is_err());
    }

    #[test]
    fn test_summary_serializes_every_category() {
        let json = serde_json::to_value(CategorySummary::zeroed()).unwrap();
        assert_eq!(json["anchors"], 0);
        assert_eq!(json["quick_service"], 0);
        assert_eq!(json["restaurants"], 0);
        assert_eq!(json["retail"], 0);
    }

    #[test]
    fn test_circle_result_keeps_everything() {
        let center = GeoPoint::new(41.5868, -93.6250).unwrap();
        let area = TradeArea::Circle {
            center,
            radius_miles: 1.0,
        };
        let circle = EffectiveCircle {
            center,
            radius_miles: 1.0,
        };
        let pois = vec![
            poi("a", PoiCategory::Anchors, 41.59, -93.62),
            poi("b", PoiCategory::Retail, 41.80, -93.62),
        ];

        let result = AnalysisResult::from_fetch(area, circle, pois);
        assert_eq!(result.pois().len(), 2);
        assert_eq!(result.fetched_count(), 2);
        assert_eq!(result.summary_by_category().total(), 2);
    }

    #[test]
    fn test_polygon_result_summarizes_filtered_members() {
        let center = GeoPoint::new(41.5868, -93.6250).unwrap();
        let polygon = circle_polygon(center, 1.0).unwrap();
        let area = TradeArea::Polygon { polygon };
        let circle = EffectiveCircle {
            center,
            radius_miles: 1.3,
        };
        let pois = vec![
            poi("in-1", PoiCategory::Anchors, 41.5868, -93.6250),
            poi("in-2", PoiCategory::Retail, 41.5900, -93.6250),
            // ~1.2 mi north: inside the fetch radius, outside the polygon
            poi("out", PoiCategory::Anchors, 41.6042, -93.6250),
        ];

        let result = AnalysisResult::from_fetch(area, circle, pois);
        assert_eq!(result.fetched_count(), 3);
        assert_eq!(result.pois().len(), 2);
        assert_eq!(result.summary_by_category().get(PoiCategory::Anchors), 1);
        assert_eq!(result.summary_by_category().get(PoiCategory::Retail), 1);
        assert_eq!(result.summary_by_category().total(), result.pois().len());
    }

    #[test]
    fn test_with_membership_recomputes_summary() {
        let center = GeoPoint::new(41.5868, -93.6250).unwrap();
        let area = TradeArea::Circle {
            center,
            radius_miles: 1.0,
        };
        let circle = EffectiveCircle {
            center,
            radius_miles: 1.0,
        };
        let result = AnalysisResult::from_fetch(
            area,
            circle,
            vec![
                poi("a", PoiCategory::Anchors, 41.59, -93.62),
                poi("b", PoiCategory::Anchors, 41.59, -93.62),
            ],
        );
        assert_eq!(result.summary_by_category().get(PoiCategory::Anchors), 2);

        let trimmed = result.with_membership(vec![poi("c", PoiCategory::Retail, 41.59, -93.62)]);
        assert_eq!(trimmed.summary_by_category().get(PoiCategory::Anchors), 0);
        assert_eq!(trimmed.summary_by_category().get(PoiCategory::Retail), 1);
    }
}
