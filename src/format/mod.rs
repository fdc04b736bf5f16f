//! Output formatters
//!
//! Provides trait-based output formatting for analyses, demographics and
//! opportunity rankings.

pub mod json;
pub mod text;

use crate::analysis::aggregate::{top_items, visible_pois};
use crate::analysis::{AnalysisResult, PoiCategory, PointOfInterest};
use crate::cache::Fetched;
use crate::coord::Polygon;
use crate::demographics::DemographicsBundle;
use crate::error::Result;
use crate::scoring::OpportunityRanking;
use serde::{Deserialize, Serialize};

/// Information about an output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Format name
    pub name: String,
    /// Format description
    pub description: String,
}

/// An analysis as presented to a reader
///
/// Adds the drawn boundary, the bounded top-items list and, when a
/// category filter is given, the POIs to draw. The summary is the result's
/// own and ignores the category filter.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Polygon>,
    pub top_items: Vec<PointOfInterest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_pois: Option<Vec<PointOfInterest>>,
}

impl AnalysisReport {
    pub fn new(
        result: AnalysisResult,
        boundary: Option<Polygon>,
        categories: Option<&[PoiCategory]>,
        limit: usize,
    ) -> Self {
        let top_items = top_items(result.pois(), categories, limit);
        let visible_pois =
            categories.map(|visible| visible_pois(&result, visible).cloned().collect());
        Self {
            result,
            boundary,
            top_items,
            visible_pois,
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Get the format name
    fn name(&self) -> &str;

    /// Get the format description
    fn description(&self) -> &str;

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String>;

    fn format_demographics(&self, bundle: &Fetched<DemographicsBundle>) -> Result<String>;

    /// Format rankings in rank order
    fn format_rankings(&self, rankings: &[OpportunityRanking]) -> Result<String>;
}

/// Get a formatter by name
pub fn get_formatter(name: &str) -> Option<Box<dyn OutputFormatter>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(json::JsonFormatter)),
        "text" => Some(Box::new(text::TextFormatter)),
        _ => None,
    }
}

/// List all available formatters
pub fn available_formats() -> Vec<FormatInfo> {
    vec![
        FormatInfo {
            name: "json".to_string(),
            description: "Full JSON output".to_string(),
        },
        FormatInfo {
            name: "text".to_string(),
            description: "Human-readable text".to_string(),
        },
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coord::geometry::circle_polygon;
    use crate::coord::{EffectiveCircle, GeoPoint, TradeArea};
    use crate::demographics::{radius_set, DemographicMetrics};
    use crate::provider::fixture::FixtureData;
    use crate::scoring::{rank, FilterCriteria, ScoringPolicy};
    use std::collections::BTreeMap;

    pub(crate) fn sample_report() -> AnalysisReport {
        let data = FixtureData::sample();
        let (lat, lng) = FixtureData::SAMPLE_CENTER;
        let center = GeoPoint::new(lat, lng).unwrap();
        let pois = data.pois[..20].to_vec();
        let result = AnalysisResult::from_fetch(
            TradeArea::Circle {
                center,
                radius_miles: 1.0,
            },
            EffectiveCircle {
                center,
                radius_miles: 1.0,
            },
            pois,
        );
        AnalysisReport::new(result, circle_polygon(center, 1.0), None, 8)
    }

    pub(crate) fn sample_demographics() -> Fetched<DemographicsBundle> {
        let data = FixtureData::sample();
        let (lat, lng) = FixtureData::SAMPLE_CENTER;
        let requested = radius_set(&[1.0, 3.0]).unwrap();
        let mut upstream: BTreeMap<_, DemographicMetrics> = data.demographics.clone();
        upstream.retain(|key, _| key.miles() != 3.0);
        Fetched::fresh(DemographicsBundle::assemble(
            GeoPoint::new(lat, lng).unwrap(),
            &requested,
            upstream,
        ))
    }

    pub(crate) fn sample_rankings() -> Vec<OpportunityRanking> {
        rank(
            &FixtureData::sample().properties,
            &FilterCriteria::default(),
            &ScoringPolicy::default(),
        )
    }

    #[test]
    fn test_get_formatter() {
        assert!(get_formatter("json").is_some());
        assert!(get_formatter("text").is_some());
        assert!(get_formatter("gpx").is_none());
    }

    #[test]
    fn test_get_formatter_case_insensitive() {
        assert!(get_formatter("JSON").is_some());
        assert!(get_formatter("Text").is_some());
    }

    #[test]
    fn test_available_formats() {
        let formats = available_formats();
        assert_eq!(formats.len(), 2);
        for format in formats {
            assert!(get_formatter(&format.name).is_some());
        }
    }

    #[test]
    fn test_report_top_items_bounded() {
        let report = sample_report();
        assert_eq!(report.top_items.len(), 8);
        assert_eq!(report.top_items[..], report.result.pois()[..8]);
    }

    #[test]
    fn test_report_category_filter_leaves_summary() {
        let report = sample_report();
        let retail_only = AnalysisReport::new(
            report.result.clone(),
            None,
            Some(&[PoiCategory::Retail]),
            8,
        );

        assert_eq!(retail_only.top_items.len(), 3);
        assert!(report.visible_pois.is_none());
        let visible = retail_only.visible_pois.as_ref().unwrap();
        assert_eq!(visible.len(), 3);
        assert!(visible.iter().all(|poi| poi.category == PoiCategory::Retail));
        assert_eq!(
            retail_only.result.summary_by_category(),
            report.result.summary_by_category()
        );
    }
}
