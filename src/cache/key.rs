//! Cache and dedup keys
//!
//! A key must carry every parameter that changes the upstream answer;
//! leaving one out serves a materially different query from cache. The
//! builder makes each parameter explicit and sorts them so insertion order
//! never matters.

use crate::coord::{Bounds, GeoPoint};
use std::fmt;

/// Identity of an upstream request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    /// Start a key for the given request kind
    ///
    /// `precision` is the number of decimals kept for coordinates.
    pub fn builder(kind: &'static str, precision: u32) -> RequestKeyBuilder {
        RequestKeyBuilder {
            kind,
            precision,
            parts: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for [`RequestKey`]
#[derive(Debug, Clone)]
pub struct RequestKeyBuilder {
    kind: &'static str,
    precision: u32,
    parts: Vec<(&'static str, String)>,
}

impl RequestKeyBuilder {
    /// A coordinate, rounded to the key precision
    pub fn point(mut self, name: &'static str, point: GeoPoint) -> Self {
        self.parts.push((name, point.key(self.precision)));
        self
    }

    /// Viewport bounds, each edge rounded to the key precision
    pub fn bounds(mut self, name: &'static str, bounds: &Bounds) -> Self {
        self.parts.push((name, bounds.key(self.precision)));
        self
    }

    /// A distance in miles, kept to a thousandth of a mile
    pub fn miles(mut self, name: &'static str, miles: f64) -> Self {
        self.parts.push((name, format!("{:.3}", miles)));
        self
    }

    /// Any other parameter
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.parts.push((name, value.to_string()));
        self
    }

    /// An optional parameter; absence is recorded explicitly
    pub fn opt_param(self, name: &'static str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self.param(name, "-"),
        }
    }

    pub fn build(mut self) -> RequestKey {
        self.parts.sort();
        let params = self
            .parts
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");
        RequestKey(format!("{}?{}", self.kind, params))
    }
}
