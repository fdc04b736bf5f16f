//! Geometry utilities
//!
//! Pure functions used in the hot path of map interaction. Malformed input
//! (too few vertices, non-finite coordinates, non-positive radius) yields a
//! sentinel (`None` or `false`) instead of an error or a panic.

use crate::constants::geo::{EARTH_RADIUS_METERS, METERS_PER_MILE, MIN_CIRCLE_VERTICES};
use crate::constants::trade_area::{FETCH_RADIUS_INFLATION, MIN_FETCH_RADIUS_MILES};
use crate::coord::{GeoPoint, Polygon};
use geo::{Centroid, ChamberlainDuquetteArea, Contains, Coord, LineString};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How a polygon's equivalent radius becomes the radius actually fetched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetchRadiusPolicy {
    /// Multiplier applied to the equivalent radius
    pub inflation: f64,
    /// Smallest radius ever issued, in miles
    pub floor_miles: f64,
}

impl Default for FetchRadiusPolicy {
    fn default() -> Self {
        Self {
            inflation: FETCH_RADIUS_INFLATION,
            floor_miles: MIN_FETCH_RADIUS_MILES,
        }
    }
}

/// Generate a closed ring approximating a circle
///
/// Uses [`MIN_CIRCLE_VERTICES`] vertices. See [`circle_polygon_with_vertices`].
pub fn circle_polygon(center: GeoPoint, radius_miles: f64) -> Option<Polygon> {
    circle_polygon_with_vertices(center, radius_miles, MIN_CIRCLE_VERTICES)
}

/// Generate a closed ring approximating a circle with `vertices` points
///
/// # Algorithm
/// Each vertex is the spherical destination from `center` at bearing
/// `2π·i/n` and angular distance `radius / R`. Bearings increase
/// monotonically, so the ring never self-intersects for radii well below
/// a quarter of the Earth's circumference.
///
/// `vertices` is raised to [`MIN_CIRCLE_VERTICES`] if smaller. Returns `None`
/// for a non-finite or non-positive radius.
pub fn circle_polygon_with_vertices(
    center: GeoPoint,
    radius_miles: f64,
    vertices: usize,
) -> Option<Polygon> {
    if !radius_miles.is_finite() || radius_miles <= 0.0 {
        return None;
    }

    let vertices = vertices.max(MIN_CIRCLE_VERTICES);
    let angular = radius_miles * METERS_PER_MILE / EARTH_RADIUS_METERS;
    if angular >= PI / 2.0 {
        return None;
    }

    let lat1 = center.latitude().to_radians();
    let lng1 = center.longitude().to_radians();

    let ring: Vec<Coord<f64>> = (0..vertices)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / vertices as f64;
            let lat2 = (lat1.sin() * angular.cos()
                + lat1.cos() * angular.sin() * bearing.cos())
            .asin();
            let lng2 = lng1
                + (bearing.sin() * angular.sin() * lat1.cos())
                    .atan2(angular.cos() - lat1.sin() * lat2.sin());
            Coord {
                x: normalize_longitude(lng2.to_degrees()),
                y: lat2.to_degrees(),
            }
        })
        .collect();

    Some(geo::Polygon::new(LineString::from(ring), vec![]).into())
}

fn normalize_longitude(lng: f64) -> f64 {
    (lng + 540.0) % 360.0 - 180.0
}

/// Whether a polygon is unusable for containment/area/centroid
///
/// Degenerate means a non-finite coordinate anywhere, or an exterior ring
/// with fewer than three distinct vertices.
pub fn is_degenerate(polygon: &Polygon) -> bool {
    let geo_polygon = polygon.as_geo();
    let all_finite = std::iter::once(geo_polygon.exterior())
        .chain(geo_polygon.interiors())
        .flat_map(|ring| ring.coords())
        .all(|c| c.x.is_finite() && c.y.is_finite());
    if !all_finite {
        return true;
    }

    let mut distinct: Vec<Coord<f64>> = Vec::new();
    for coord in polygon.exterior() {
        if !distinct.contains(&coord) {
            distinct.push(coord);
            if distinct.len() >= 3 {
                return false;
            }
        }
    }
    true
}

/// Point-in-polygon containment
///
/// Points exactly on the boundary are outside. Degenerate polygons contain
/// nothing.
pub fn point_in_polygon(point: GeoPoint, polygon: &Polygon) -> bool {
    if is_degenerate(polygon) {
        return false;
    }
    polygon.as_geo().contains(&point.to_geo())
}

/// Area-weighted centroid of a polygon
pub fn centroid(polygon: &Polygon) -> Option<GeoPoint> {
    if is_degenerate(polygon) {
        return None;
    }
    polygon
        .as_geo()
        .centroid()
        .and_then(|p| GeoPoint::from_geo(p).ok())
}

/// Polygon area on the sphere, in square meters
///
/// Returns `None` for degenerate polygons, including collinear rings whose
/// area is zero.
pub fn area(polygon: &Polygon) -> Option<f64> {
    if is_degenerate(polygon) {
        return None;
    }
    let square_meters = polygon.as_geo().chamberlain_duquette_unsigned_area();
    (square_meters.is_finite() && square_meters > 0.0).then_some(square_meters)
}

/// Radius of the circle with the same area: `sqrt(area / π) / 1609.34`
pub fn equivalent_radius_miles(area_square_meters: f64) -> Option<f64> {
    if !area_square_meters.is_finite() || area_square_meters < 0.0 {
        return None;
    }
    Some((area_square_meters / PI).sqrt() / METERS_PER_MILE)
}

/// Conservative fetch radius for a polygon of the given area
///
/// `max(equivalent_radius × inflation, floor)`. Only used to size the
/// upstream request; membership always uses the true polygon.
pub fn fetch_radius_miles(area_square_meters: f64, policy: &FetchRadiusPolicy) -> Option<f64> {
    equivalent_radius_miles(area_square_meters)
        .map(|radius| (radius * policy.inflation).max(policy.floor_miles))
}

/// Great-circle distance in meters (Haversine formula)
pub fn haversine_meters(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.latitude().to_radians();
    let lat2 = p2.latitude().to_radians();
    let delta_lat = (p2.latitude() - p1.latitude()).to_radians();
    let delta_lng = (p2.longitude() - p1.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Great-circle distance in miles
pub fn haversine_miles(p1: GeoPoint, p2: GeoPoint) -> f64 {
    haversine_meters(p1, p2) / METERS_PER_MILE
}
