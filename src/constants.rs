//! Centralized constants for the tradescope crate
//!
//! Values shared by several modules live here so geometry, caching and
//! scoring agree on the same numbers.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in meters (IUGG mean radius)
    pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

    /// Meters in one statute mile, as used for radius conversions
    pub const METERS_PER_MILE: f64 = 1609.34;

    /// Meters per degree of latitude (approximate, varies slightly with latitude)
    pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

    /// Fewest vertices a generated circle ring may have
    pub const MIN_CIRCLE_VERTICES: usize = 64;
}

/// Trade-area resolution
pub mod trade_area {
    /// Polygon fetch radius is inflated by this factor so edge points survive
    /// until client-side containment filtering
    pub const FETCH_RADIUS_INFLATION: f64 = 1.3;

    /// Smallest radius (miles) ever issued to the POI search for a polygon
    pub const MIN_FETCH_RADIUS_MILES: f64 = 0.5;
}

/// Opportunity ranking
pub mod ranking {
    /// Rankings at or above this position are emphasized by the view
    pub const EMPHASIS_TOP_K: u32 = 5;
}

/// Cache settings
pub mod cache {
    /// Listing-search results stay fresh for a day
    pub const LISTING_TTL_SECS: u64 = 24 * 60 * 60;

    /// POI search results stay fresh for an hour
    pub const POI_TTL_SECS: u64 = 60 * 60;

    /// Decimal places kept when a coordinate becomes part of a cache key
    pub const COORDINATE_PRECISION: u32 = 4;
}
