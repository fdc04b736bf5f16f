//! JSON gateway adapter
//!
//! Talks to a single gateway exposing the four collaborators:
//!
//! | Collaborator  | Request                                         |
//! |---------------|-------------------------------------------------|
//! | POI search    | `GET  {base}/pois?lat&lng&radius_miles`         |
//! | Demographics  | `POST {base}/demographics {center, radii}`      |
//! | Parcels       | `POST {base}/parcels {area, criteria}`          |
//! | Isochrones    | `GET  {base}/isochrone?lat&lng&mode&minutes`    |
//!
//! Transport failures, non-2xx statuses and malformed payloads all become
//! [`Error::Upstream`] naming the collaborator.

use crate::analysis::PointOfInterest;
use crate::coord::{EffectiveCircle, GeoPoint, Polygon};
use crate::demographics::{DemographicMetrics, RadiusKey};
use crate::error::{Error, Result};
use crate::provider::{
    DemographicsSource, IsochroneSource, ParcelQuery, ParcelSource, PoiSource, TravelMode,
};
use crate::scoring::CandidateProperty;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("tradescope/", env!("CARGO_PKG_VERSION"));

/// HTTP-backed data sources
#[derive(Debug, Clone)]
pub struct HttpSources {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// POI results, decoded record by record
#[derive(Debug, Deserialize)]
struct PoiResponse {
    results: Vec<serde_json::Value>,
}

impl PoiResponse {
    /// Records that don't decode (unknown category, bad location) are
    /// skipped rather than failing the whole search
    fn into_pois(self) -> Vec<PointOfInterest> {
        let total = self.results.len();
        let pois: Vec<PointOfInterest> = self
            .results
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(poi) => Some(poi),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable POI record");
                    None
                }
            })
            .collect();
        if pois.len() < total {
            warn!(skipped = total - pois.len(), total, "POI search returned bad records");
        }
        pois
    }
}

#[derive(Debug, Serialize)]
struct DemographicsRequest<'a> {
    center: GeoPoint,
    radii: &'a [RadiusKey],
}

#[derive(Debug, Deserialize)]
struct DemographicsRing {
    radius_miles: f64,
    #[serde(default)]
    metrics: DemographicMetrics,
}

#[derive(Debug, Deserialize)]
struct DemographicsResponse {
    rings: Vec<DemographicsRing>,
}

#[derive(Debug, Deserialize)]
struct ParcelResponse {
    properties: Vec<CandidateProperty>,
}

impl HttpSources {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(service, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::upstream(
                service,
                format!("returned status: {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::upstream(service, format!("malformed payload: {}", e)))
    }
}

impl PoiSource for HttpSources {
    async fn search_pois(&self, circle: EffectiveCircle) -> Result<Vec<PointOfInterest>> {
        debug!(radius_miles = circle.radius_miles, "requesting POI search");
        let request = self.client.get(self.url("pois")).query(&[
            ("lat", circle.center.latitude()),
            ("lng", circle.center.longitude()),
            ("radius_miles", circle.radius_miles),
        ]);
        let response: PoiResponse = self.send("poi search", request).await?;
        Ok(response.into_pois())
    }
}

impl DemographicsSource for HttpSources {
    async fn fetch_demographics(
        &self,
        center: GeoPoint,
        radii: &[RadiusKey],
    ) -> Result<BTreeMap<RadiusKey, DemographicMetrics>> {
        let request = self
            .client
            .post(self.url("demographics"))
            .json(&DemographicsRequest { center, radii });
        let response: DemographicsResponse = self.send("demographics", request).await?;

        response
            .rings
            .into_iter()
            .map(|ring| {
                let key = RadiusKey::from_miles(ring.radius_miles).ok_or_else(|| {
                    Error::upstream(
                        "demographics",
                        format!("malformed payload: ring radius {}", ring.radius_miles),
                    )
                })?;
                Ok((key, ring.metrics))
            })
            .collect()
    }
}

impl ParcelSource for HttpSources {
    async fn search_parcels(&self, query: &ParcelQuery) -> Result<Vec<CandidateProperty>> {
        let request = self.client.post(self.url("parcels")).json(query);
        let response: ParcelResponse = self.send("parcel lookup", request).await?;
        Ok(response.properties)
    }
}

impl IsochroneSource for HttpSources {
    async fn isochrone(&self, center: GeoPoint, mode: TravelMode, minutes: u32) -> Result<Polygon> {
        let request = self.client.get(self.url("isochrone")).query(&[
            ("lat", center.latitude().to_string()),
            ("lng", center.longitude().to_string()),
            ("mode", mode.to_string()),
            ("minutes", minutes.to_string()),
        ]);
        let geojson: geojson::GeoJson = self.send("isochrone", request).await?;
        Polygon::from_geojson(geojson)
            .map_err(|e| Error::upstream("isochrone", format!("malformed payload: {}", e)))
    }
}
