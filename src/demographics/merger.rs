//! Fetch-once demographics cache
//!
//! Bundles are cached by rounded center. A request is served from cache
//! only when the cached bundle covers every requested radius; otherwise the
//! whole radius set is fetched in one upstream call and the bundle for that
//! center is replaced.

use crate::cache::{Fetched, InFlight, RequestKey};
use crate::cache::store::ExpiringCache;
use crate::coord::GeoPoint;
use crate::demographics::{radius_set, DemographicsBundle};
use crate::error::Result;
use crate::provider::DemographicsSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lazy, deduplicated access to demographic bundles
pub struct DemographicsMerger<S> {
    source: Arc<S>,
    bundles: Arc<ExpiringCache<DemographicsBundle>>,
    in_flight: InFlight<DemographicsBundle>,
    precision: u32,
}

impl<S> DemographicsMerger<S>
where
    S: DemographicsSource + 'static,
{
    pub fn new(source: Arc<S>, ttl: Duration, precision: u32) -> Self {
        Self {
            source,
            bundles: Arc::new(ExpiringCache::new(ttl)),
            in_flight: InFlight::new(),
            precision,
        }
    }

    fn bundle_key(&self, center: GeoPoint) -> RequestKey {
        RequestKey::builder("demographics", self.precision)
            .point("center", center)
            .build()
    }

    /// Return the bundle for `center` covering every radius in `radii`
    ///
    /// A failed fetch returns the error and leaves any cached bundle as it
    /// was. Concurrent calls for the same center and radius set share one
    /// upstream request.
    pub async fn get_or_fetch(
        &self,
        center: GeoPoint,
        radii: &[f64],
    ) -> Result<Fetched<DemographicsBundle>> {
        let requested = radius_set(radii)?;
        let bundle_key = self.bundle_key(center);

        if let Some(hit) = self.bundles.get(&bundle_key).await {
            if !hit.is_stale && hit.value.covers(&requested) {
                debug!(key = %bundle_key, age_ms = hit.age_ms(), "demographics cache hit");
                return Ok(Fetched::from_hit(hit));
            }
        }

        let radii_param = requested
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let fetch_key = RequestKey::builder("demographics", self.precision)
            .point("center", center)
            .param("radii", radii_param)
            .build();

        let source = Arc::clone(&self.source);
        let bundles = Arc::clone(&self.bundles);
        let bundle = self
            .in_flight
            .run(fetch_key, move || async move {
                let keys: Vec<_> = requested.iter().copied().collect();
                info!(center = %center.key(4), rings = keys.len(), "fetching demographics");
                let upstream = source.fetch_demographics(center, &keys).await?;
                let bundle = DemographicsBundle::assemble(center, &requested, upstream);
                bundles.insert(bundle_key, bundle.clone()).await;
                Ok(bundle)
            })
            .await?;

        Ok(Fetched::fresh(bundle))
    }

    /// The cached bundle for `center`, if any, without fetching
    pub async fn cached(&self, center: GeoPoint) -> Option<DemographicsBundle> {
        self.bundles
            .get(&self.bundle_key(center))
            .await
            .map(|hit| hit.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::select_radius;
    use crate::provider::fixture::{FixtureData, FixtureSources, Service};

    fn center() -> GeoPoint {
        GeoPoint::new(41.5868, -93.6250).unwrap()
    }

    fn merger(sources: &Arc<FixtureSources>) -> DemographicsMerger<FixtureSources> {
        DemographicsMerger::new(Arc::clone(sources), Duration::from_secs(3600), 4)
    }

    #[tokio::test]
    async fn test_fetch_once_then_cached() {
        let sources = Arc::new(FixtureSources::new(FixtureData::sample()));
        let merger = merger(&sources);

        let first = merger.get_or_fetch(center(), &[1.0, 3.0, 5.0]).await.unwrap();
        assert!(!first.freshness.is_cached());
        assert_eq!(first.value.radii.len(), 3);

        // Subset of an already-fetched set is a hit
        let second = merger.get_or_fetch(center(), &[3.0]).await.unwrap();
        assert!(second.freshness.is_cached());
        assert_eq!(sources.calls(Service::Demographics), 1);

        // Nearby center rounding to the same key is a hit
        let nearby = GeoPoint::new(41.58681, -93.62502).unwrap();
        merger.get_or_fetch(nearby, &[1.0]).await.unwrap();
        assert_eq!(sources.calls(Service::Demographics), 1);
    }

    #[tokio::test]
    async fn test_new_radius_refetches_whole_set() {
        let sources = Arc::new(FixtureSources::new(FixtureData::sample()));
        let merger = merger(&sources);

        merger.get_or_fetch(center(), &[1.0, 3.0]).await.unwrap();
        let bundle = merger.get_or_fetch(center(), &[1.0, 10.0]).await.unwrap().value;
        assert_eq!(sources.calls(Service::Demographics), 2);

        // The bundle is replaced, not merged
        assert!(select_radius(&bundle, 3.0).is_none());
        assert!(select_radius(&bundle, 10.0).is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_cached_bundle() {
        let sources = Arc::new(FixtureSources::new(FixtureData::sample()));
        let merger = merger(&sources);

        merger.get_or_fetch(center(), &[1.0]).await.unwrap();
        sources.set_failing(Service::Demographics, true);

        let err = merger.get_or_fetch(center(), &[1.0, 3.0]).await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");

        let cached = merger.cached(center()).await.unwrap();
        assert_eq!(cached.radii.len(), 1);
        assert!(select_radius(&cached, 1.0).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_fetch() {
        let sources = Arc::new(
            FixtureSources::new(FixtureData::sample()).with_latency(Duration::from_millis(50)),
        );
        let merger = merger(&sources);

        let (a, b) = tokio::join!(
            merger.get_or_fetch(center(), &[1.0, 3.0]),
            merger.get_or_fetch(center(), &[3.0, 1.0]),
        );
        assert_eq!(a.unwrap().value, b.unwrap().value);
        assert_eq!(sources.calls(Service::Demographics), 1);
    }

    #[tokio::test]
    async fn test_invalid_radius() {
        let sources = Arc::new(FixtureSources::new(FixtureData::sample()));
        let merger = merger(&sources);

        let err = merger.get_or_fetch(center(), &[]).await.unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(sources.calls(Service::Demographics), 0);
    }
}
