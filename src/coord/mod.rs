//! Geographic value types and geometry
//!
//! This module handles:
//! - Validated coordinates and map viewport bounds
//! - Trade areas defined by a radius or a drawn polygon
//! - Circle generation, containment, centroid and area (see [`geometry`])

pub mod geometry;
pub mod polygon;

pub use polygon::Polygon;

use crate::error::{Error, Result};
use geometry::{centroid, fetch_radius_miles, FetchRadiusPolicy};
use serde::{Deserialize, Serialize};

/// A geographic coordinate
///
/// Construction validates the range, so every `GeoPoint` in the system is
/// within latitude [-90, 90] and longitude [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

/// Unvalidated wire form of [`GeoPoint`]
#[derive(Deserialize)]
struct RawGeoPoint {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = Error;

    fn try_from(raw: RawGeoPoint) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Create a validated coordinate
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Convert to a `geo` point (x = longitude, y = latitude)
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }

    /// Convert from a `geo` point, validating the range
    pub fn from_geo(point: geo::Point<f64>) -> Result<Self> {
        Self::new(point.y(), point.x())
    }

    /// Stable textual key with coordinates rounded to `precision` decimals
    ///
    /// Two points that round to the same key are treated as the same
    /// location by every cache in the crate.
    pub fn key(&self, precision: u32) -> String {
        let p = precision as usize;
        // -0.0 and 0.0 must produce the same key
        let lat = round_to(self.latitude, precision) + 0.0;
        let lng = round_to(self.longitude, precision) + 0.0;
        format!("{:.*},{:.*}", p, lat, p, lng)
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Map viewport bounds, as emitted on pan/zoom end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Validate edge ordering and ranges
    ///
    /// Viewports crossing the antimeridian are rejected.
    pub fn validate(&self) -> Result<()> {
        GeoPoint::new(self.north, self.east)?;
        GeoPoint::new(self.south, self.west)?;
        if self.north < self.south {
            return Err(Error::InvalidCoordinates(format!(
                "North edge {} is below south edge {}",
                self.north, self.south
            )));
        }
        if self.east < self.west {
            return Err(Error::InvalidCoordinates(format!(
                "East edge {} is west of west edge {}",
                self.east, self.west
            )));
        }
        Ok(())
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude())
            && (self.west..=self.east).contains(&point.longitude())
    }

    pub fn center(&self) -> Result<GeoPoint> {
        GeoPoint::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Cache key with each edge rounded to `precision` decimals
    pub fn key(&self, precision: u32) -> String {
        let p = precision as usize;
        format!(
            "{:.*},{:.*},{:.*},{:.*}",
            p,
            round_to(self.north, precision) + 0.0,
            p,
            round_to(self.south, precision) + 0.0,
            p,
            round_to(self.east, precision) + 0.0,
            p,
            round_to(self.west, precision) + 0.0
        )
    }
}

/// The circle actually sent to radius-based collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveCircle {
    pub center: GeoPoint,
    pub radius_miles: f64,
}

/// A trade area: a radius around a site, or a drawn/derived polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeArea {
    Circle { center: GeoPoint, radius_miles: f64 },
    Polygon { polygon: Polygon },
}

impl TradeArea {
    /// Resolve to the circle used for fetching
    ///
    /// Polygons resolve to their centroid and an inflated equivalent radius.
    /// Returns `None` for a non-positive radius or a degenerate polygon.
    pub fn effective_circle(&self, policy: &FetchRadiusPolicy) -> Option<EffectiveCircle> {
        match self {
            Self::Circle {
                center,
                radius_miles,
            } => (radius_miles.is_finite() && *radius_miles > 0.0).then_some(EffectiveCircle {
                center: *center,
                radius_miles: *radius_miles,
            }),
            Self::Polygon { polygon } => Some(EffectiveCircle {
                center: centroid(polygon)?,
                radius_miles: fetch_radius_miles(geometry::area(polygon)?, policy)?,
            }),
        }
    }

    /// The polygon membership predicate, if this area has one
    pub fn polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Circle { .. } => None,
            Self::Polygon { polygon } => Some(polygon),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(41.5868, -93.6250).is_ok());
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_geo_point_deserialize_aliases() {
        let p: GeoPoint = serde_json::from_str(r#"{"lat": 41.5, "lng": -93.6}"#).unwrap();
        assert_eq!(p.latitude(), 41.5);
        assert_eq!(p.longitude(), -93.6);

        let err = serde_json::from_str::<GeoPoint>(r#"{"latitude": 123.0, "longitude": 0}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_key_rounding() {
        let a = GeoPoint::new(41.58681, -93.62504).unwrap();
        let b = GeoPoint::new(41.58679, -93.62496).unwrap();
        assert_eq!(a.key(4), "41.5868,-93.6250");
        assert_eq!(a.key(4), b.key(4));
        assert_ne!(a.key(5), b.key(5));
    }

    #[test]
    fn test_key_negative_zero() {
        let a = GeoPoint::new(-0.00001, 0.00001).unwrap();
        assert_eq!(a.key(2), "0.00,0.00");
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds {
            north: 41.7,
            south: 41.5,
            east: -93.5,
            west: -93.7,
        };
        bounds.validate().unwrap();
        assert!(bounds.contains(GeoPoint::new(41.6, -93.6).unwrap()));
        assert!(!bounds.contains(GeoPoint::new(41.8, -93.6).unwrap()));

        let center = bounds.center().unwrap();
        assert!((center.latitude() - 41.6).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_inverted() {
        let bounds = Bounds {
            north: 41.5,
            south: 41.7,
            east: -93.5,
            west: -93.7,
        };
        assert!(bounds.validate().is_err());
    }

    #[test]
    fn test_circle_trade_area() {
        let center = GeoPoint::new(41.5868, -93.6250).unwrap();
        let area = TradeArea::Circle {
            center,
            radius_miles: 3.0,
        };
        let circle = area.effective_circle(&FetchRadiusPolicy::default()).unwrap();
        assert_eq!(circle.radius_miles, 3.0);
        assert_eq!(circle.center, center);

        let zero = TradeArea::Circle {
            center,
            radius_miles: 0.0,
        };
        assert!(zero.effective_circle(&FetchRadiusPolicy::default()).is_none());
    }

    #[test]
    fn test_trade_area_serialization() {
        let area = TradeArea::Circle {
            center: GeoPoint::new(41.0, -93.0).unwrap(),
            radius_miles: 1.0,
        };
        let json = serde_json::to_value(&area).unwrap();
        assert_eq!(json["type"], "circle");
        assert_eq!(json["center"]["latitude"], 41.0);
    }
}
