//! Polygon wrapper with GeoJSON wire format

use crate::coord::GeoPoint;
use crate::error::{Error, Result};
use geo::{Coord, LineString};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

/// A simple polygon in geographic coordinates
///
/// Serialized as a GeoJSON `Polygon` geometry. Construction does not reject
/// degenerate rings; the geometry functions treat those as sentinels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "geojson::Geometry", into = "geojson::Geometry")]
pub struct Polygon(geo::Polygon<f64>);

impl Polygon {
    /// Build a polygon from an exterior ring; the ring is closed automatically
    pub fn from_ring(ring: &[GeoPoint]) -> Self {
        let coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|p| Coord {
                x: p.longitude(),
                y: p.latitude(),
            })
            .collect();
        Self(geo::Polygon::new(LineString::from(coords), vec![]))
    }

    /// Parse a GeoJSON document holding a single polygon
    ///
    /// Accepts a bare geometry, a feature, or a feature collection whose
    /// first feature is a polygon (drawing tools emit all three).
    pub fn from_geojson_str(input: &str) -> Result<Self> {
        let geojson: GeoJson = input
            .parse()
            .map_err(|e| Error::InvalidGeometry(format!("Unparseable GeoJSON: {}", e)))?;
        Self::from_geojson(geojson)
    }

    /// Extract the single polygon from a parsed GeoJSON document
    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let geometry = match geojson {
            GeoJson::Geometry(geometry) => Some(geometry),
            GeoJson::Feature(feature) => feature.geometry,
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .next()
                .and_then(|feature| feature.geometry),
        };

        geometry
            .ok_or_else(|| Error::InvalidGeometry("GeoJSON contains no geometry".to_string()))?
            .try_into()
    }

    pub fn as_geo(&self) -> &geo::Polygon<f64> {
        &self.0
    }

    /// Exterior ring vertices, including the closing vertex
    pub fn exterior(&self) -> impl Iterator<Item = Coord<f64>> + '_ {
        self.0.exterior().coords().copied()
    }
}

impl From<geo::Polygon<f64>> for Polygon {
    fn from(polygon: geo::Polygon<f64>) -> Self {
        Self(polygon)
    }
}

impl TryFrom<geojson::Geometry> for Polygon {
    type Error = Error;

    fn try_from(geometry: geojson::Geometry) -> Result<Self> {
        let converted: geo::Geometry<f64> = geometry
            .try_into()
            .map_err(|e| Error::InvalidGeometry(format!("Bad GeoJSON geometry: {}", e)))?;

        match converted {
            geo::Geometry::Polygon(polygon) => Ok(Self(polygon)),
            geo::Geometry::MultiPolygon(multi) if multi.0.len() == 1 => {
                Ok(Self(multi.0.into_iter().next().ok_or_else(|| {
                    Error::InvalidGeometry("Empty multipolygon".to_string())
                })?))
            }
            _ => Err(Error::InvalidGeometry(
                "Expected a single Polygon geometry".to_string(),
            )),
        }
    }
}

impl From<Polygon> for geojson::Geometry {
    fn from(polygon: Polygon) -> Self {
        geojson::Geometry::new(geojson::Value::from(&polygon.0))
    }
}
