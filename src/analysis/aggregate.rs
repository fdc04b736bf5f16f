//! Aggregation over points of interest
//!
//! Counting, polygon membership trimming and "top items" selection. None of
//! these re-sort: the upstream order carries its relevance ranking.

use crate::analysis::{AnalysisResult, CategorySummary, PoiCategory, PointOfInterest};
use crate::coord::geometry::point_in_polygon;
use crate::coord::Polygon;

/// Count POIs per category, zero counts included
pub fn aggregate(pois: &[PointOfInterest]) -> CategorySummary {
    let mut summary = CategorySummary::zeroed();
    for poi in pois {
        summary.increment(poi.category);
    }
    summary
}

/// Keep the POIs whose location lies inside `polygon`, in original order
///
/// Used after a radius fetch when the trade area was really a polygon. A
/// degenerate polygon keeps nothing.
pub fn filter_by_polygon(pois: &[PointOfInterest], polygon: &Polygon) -> Vec<PointOfInterest> {
    pois.iter()
        .filter(|poi| point_in_polygon(poi.location, polygon))
        .cloned()
        .collect()
}

/// Up to `limit` POIs matching an optional category allow-list
///
/// Preserves fetch order; filters and truncates only.
pub fn top_items(
    pois: &[PointOfInterest],
    category_filter: Option<&[PoiCategory]>,
    limit: usize,
) -> Vec<PointOfInterest> {
    pois.iter()
        .filter(|poi| category_filter.map_or(true, |allowed| allowed.contains(&poi.category)))
        .take(limit)
        .cloned()
        .collect()
}

/// POIs to draw given the categories toggled visible
///
/// Display-only: the result's category summary is unaffected.
pub fn visible_pois<'a>(
    result: &'a AnalysisResult,
    visible: &'a [PoiCategory],
) -> impl Iterator<Item = &'a PointOfInterest> + 'a {
    result
        .pois()
        .iter()
        .filter(move |poi| visible.contains(&poi.category))
}
