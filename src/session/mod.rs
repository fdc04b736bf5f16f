//! Analysis session
//!
//! The state a dashboard view reads: the current trade-area analysis,
//! demographics, opportunity rankings and listing search, each with its own
//! [`OperationStatus`]. A session is owned by the composition root (the CLI
//! or the server) and shared behind an `Arc`.
//!
//! Every operation takes a [`RequestToken`] from its own [`Generation`]
//! before issuing upstream work. A result is committed only if its token is
//! still current when it arrives; otherwise it is dropped and the caller
//! gets [`Commit::Superseded`]. Failures set that operation's status to
//! `error` and leave every other piece of state alone.

use crate::analysis::{AnalysisResult, PointOfInterest};
use crate::cache::{
    Debouncer, Fetched, Freshness, Generation, RequestCache, RequestKey, RequestToken,
    StalePolicy,
};
use crate::config::Config;
use crate::coord::geometry::{circle_polygon_with_vertices, is_degenerate, FetchRadiusPolicy};
use crate::coord::{Bounds, EffectiveCircle, GeoPoint, Polygon, TradeArea};
use crate::demographics::{radius_set, DemographicsBundle, DemographicsMerger};
use crate::error::{Error, Result};
use crate::provider::{DataSources, ParcelArea, ParcelQuery, TravelMode};
use crate::scoring::{rank, CandidateProperty, FilterCriteria, OpportunityRanking, ScoringPolicy};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Knobs a session runs with, taken from [`Config`]
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub default_radius_miles: f64,
    pub fetch_policy: FetchRadiusPolicy,
    pub circle_vertices: usize,
    pub top_items_limit: usize,
    pub demographic_radii: Vec<f64>,
    pub coordinate_precision: u32,
    pub poi_ttl: Duration,
    pub listing_ttl: Duration,
    pub demographics_ttl: Duration,
    pub debounce: Duration,
    pub stale_policy: StalePolicy,
    pub scoring: ScoringPolicy,
    pub criteria: FilterCriteria,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_radius_miles: config.analysis.default_radius_miles,
            fetch_policy: config.analysis.fetch_policy(),
            circle_vertices: config.analysis.circle_vertices,
            top_items_limit: config.analysis.top_items_limit,
            demographic_radii: config.analysis.demographic_radii.clone(),
            coordinate_precision: config.cache.coordinate_precision,
            poi_ttl: config.cache.poi_ttl(),
            listing_ttl: config.cache.listing_ttl(),
            demographics_ttl: config.cache.demographics_ttl(),
            debounce: config.cache.debounce(),
            stale_policy: config.cache.stale_policy,
            scoring: config.scoring.clone(),
            criteria: config.filters.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Lifecycle of one operation, as shown by the view
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    Loading,
    Error {
        message: String,
    },
}

/// Outcome of an operation whose result may have been overtaken
#[derive(Debug, Clone, PartialEq)]
pub enum Commit<T> {
    /// The result is now the session's current state
    Applied(T),
    /// A newer request was issued (or the operation was closed) meanwhile
    Superseded,
}

impl<T> Commit<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Current value and status of one operation
#[derive(Debug)]
struct Slot<T> {
    status: OperationStatus,
    value: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            status: OperationStatus::Idle,
            value: None,
        }
    }
}

/// What the latest issued analysis is for
///
/// Set when a request is issued, before its result arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Circle { center: GeoPoint, radius_miles: f64 },
    Area,
}

/// Result of a bounds-triggered listing search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSearch {
    pub bounds: Bounds,
    pub freshness: Freshness,
    pub candidates: Vec<CandidateProperty>,
    pub rankings: Vec<OpportunityRanking>,
}

/// Snapshot of every operation's status
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub analysis: OperationStatus,
    pub demographics: OperationStatus,
    pub rankings: OperationStatus,
    pub listings: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    pub radius_miles: f64,
    pub pending_requests: usize,
}

/// Explicit application state for one dashboard
pub struct AnalysisSession<S: DataSources> {
    settings: SessionSettings,
    sources: Arc<S>,

    pois: Arc<RequestCache<Vec<PointOfInterest>>>,
    isochrones: Arc<RequestCache<Polygon>>,
    listings_cache: Arc<RequestCache<Vec<CandidateProperty>>>,
    demographics_merger: DemographicsMerger<S>,

    analysis: RwLock<Slot<AnalysisResult>>,
    demographics: RwLock<Slot<Fetched<DemographicsBundle>>>,
    rankings: RwLock<Slot<Vec<OpportunityRanking>>>,
    listings: RwLock<Slot<ListingSearch>>,

    analysis_gen: Generation,
    demographics_gen: Generation,
    rankings_gen: Generation,
    listings_gen: Generation,

    target: RwLock<Option<Target>>,
    criteria: RwLock<FilterCriteria>,
    radius_miles: RwLock<f64>,
    debouncer: Debouncer,
}

fn validate_radius(radius_miles: f64) -> Result<()> {
    if !radius_miles.is_finite() || radius_miles <= 0.0 {
        return Err(Error::InvalidRadius(format!(
            "Radius must be a positive number of miles, got {}",
            radius_miles
        )));
    }
    Ok(())
}

/// Mark `slot` loading and take a token for the request about to start
async fn begin<T>(slot: &RwLock<Slot<T>>, generation: &Generation) -> RequestToken {
    let mut slot = slot.write().await;
    slot.status = OperationStatus::Loading;
    generation.next()
}

/// Record a request rejected before it was issued
///
/// The slot value and its generation are untouched, so a request already
/// in flight still commits.
async fn reject<T>(operation: &'static str, slot: &RwLock<Slot<T>>, e: Error) -> Error {
    warn!(operation, error = %e, "request rejected");
    slot.write().await.status = OperationStatus::Error {
        message: e.to_string(),
    };
    e
}

/// Apply `outcome` to `slot` if `token` is still current
///
/// Superseded outcomes, successful or not, are dropped without touching
/// the slot.
async fn commit<T: Clone>(
    operation: &'static str,
    slot: &RwLock<Slot<T>>,
    generation: &Generation,
    token: RequestToken,
    outcome: Result<T>,
) -> Result<Commit<T>> {
    let mut slot = slot.write().await;
    if !generation.is_current(token) {
        debug!(operation, "dropping superseded result");
        return Ok(Commit::Superseded);
    }

    match outcome {
        Ok(value) => {
            slot.status = OperationStatus::Idle;
            slot.value = Some(value.clone());
            Ok(Commit::Applied(value))
        }
        Err(e) => {
            warn!(operation, error = %e, "operation failed");
            slot.status = OperationStatus::Error {
                message: e.to_string(),
            };
            Err(e)
        }
    }
}

impl<S: DataSources> AnalysisSession<S> {
    pub fn new(sources: Arc<S>, settings: SessionSettings) -> Self {
        let demographics_merger = DemographicsMerger::new(
            Arc::clone(&sources),
            settings.demographics_ttl,
            settings.coordinate_precision,
        );

        Self {
            pois: Arc::new(RequestCache::new(settings.poi_ttl)),
            isochrones: Arc::new(RequestCache::new(settings.poi_ttl)),
            listings_cache: Arc::new(RequestCache::new(settings.listing_ttl)),
            demographics_merger,
            analysis: RwLock::default(),
            demographics: RwLock::default(),
            rankings: RwLock::default(),
            listings: RwLock::default(),
            analysis_gen: Generation::new(),
            demographics_gen: Generation::new(),
            rankings_gen: Generation::new(),
            listings_gen: Generation::new(),
            target: RwLock::new(None),
            criteria: RwLock::new(settings.criteria.clone()),
            radius_miles: RwLock::new(settings.default_radius_miles),
            debouncer: Debouncer::new(settings.debounce),
            sources,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ---- trade-area analysis ----

    /// Analyze the circle of `radius_miles` around `center`
    pub async fn analyze_trade_area(
        &self,
        center: GeoPoint,
        radius_miles: f64,
    ) -> Result<Commit<AnalysisResult>> {
        let area = TradeArea::Circle {
            center,
            radius_miles,
        };
        let circle = match validate_radius(radius_miles).and_then(|()| self.resolve(&area)) {
            Ok(circle) => circle,
            Err(e) => return Err(reject("analysis", &self.analysis, e).await),
        };
        *self.radius_miles.write().await = radius_miles;

        let token = self
            .issue_analysis(Target::Circle {
                center,
                radius_miles,
            })
            .await;
        let outcome = self.fetch_analysis(area, circle).await;
        commit("analysis", &self.analysis, &self.analysis_gen, token, outcome).await
    }

    /// Analyze a drawn polygon
    ///
    /// POIs are fetched for the polygon's effective circle, then trimmed to
    /// the polygon before they are summarized.
    pub async fn analyze_polygon(&self, polygon: Polygon) -> Result<Commit<AnalysisResult>> {
        let resolved = if is_degenerate(&polygon) {
            Err(Error::InvalidGeometry(
                "Polygon needs at least 3 distinct finite vertices".to_string(),
            ))
        } else {
            let area = TradeArea::Polygon { polygon };
            self.resolve(&area).map(|circle| (area, circle))
        };
        let (area, circle) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return Err(reject("analysis", &self.analysis, e).await),
        };

        let token = self.issue_analysis(Target::Area).await;
        let outcome = self.fetch_analysis(area, circle).await;
        commit("analysis", &self.analysis, &self.analysis_gen, token, outcome).await
    }

    /// Analyze the area reachable from `center` within `minutes` by `mode`
    pub async fn analyze_isochrone(
        &self,
        center: GeoPoint,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Commit<AnalysisResult>> {
        if minutes == 0 {
            let e = Error::InvalidInput(
                "Isochrone travel time must be at least one minute".to_string(),
            );
            return Err(reject("analysis", &self.analysis, e).await);
        }

        let token = self.issue_analysis(Target::Area).await;
        let outcome = async {
            let polygon = self.fetch_isochrone(center, mode, minutes).await?;
            let area = TradeArea::Polygon { polygon };
            let circle = self.resolve(&area)?;
            self.fetch_analysis(area, circle).await
        }
        .await;
        commit("analysis", &self.analysis, &self.analysis_gen, token, outcome).await
    }

    /// Change the working radius
    ///
    /// Re-runs the analysis when the latest one issued is a circle of a
    /// different radius, around that circle's center even if its result has
    /// not arrived yet. Returns `None` when nothing was re-run.
    pub async fn set_radius(&self, radius_miles: f64) -> Result<Option<Commit<AnalysisResult>>> {
        validate_radius(radius_miles)?;
        *self.radius_miles.write().await = radius_miles;

        let rerun = match *self.target.read().await {
            Some(Target::Circle {
                center,
                radius_miles: current,
            }) if current != radius_miles => Some(center),
            _ => None,
        };

        match rerun {
            Some(center) => {
                info!(radius_miles, "radius changed, re-running analysis");
                self.analyze_trade_area(center, radius_miles).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Forget the current analysis; in-flight analysis results are dropped
    pub async fn close_analysis(&self) {
        let mut slot = self.analysis.write().await;
        self.analysis_gen.invalidate();
        *self.target.write().await = None;
        *slot = Slot::default();
    }

    /// Take an analysis token and record what it is for
    async fn issue_analysis(&self, target: Target) -> RequestToken {
        let mut slot = self.analysis.write().await;
        slot.status = OperationStatus::Loading;
        *self.target.write().await = Some(target);
        self.analysis_gen.next()
    }

    pub async fn current_analysis(&self) -> Option<AnalysisResult> {
        self.analysis.read().await.value.clone()
    }

    /// The ring drawn for `result`: the polygon itself, or the generated circle
    pub fn boundary(&self, result: &AnalysisResult) -> Option<Polygon> {
        match result.trade_area() {
            TradeArea::Circle {
                center,
                radius_miles,
            } => circle_polygon_with_vertices(*center, *radius_miles, self.settings.circle_vertices),
            TradeArea::Polygon { polygon } => Some(polygon.clone()),
        }
    }

    fn resolve(&self, area: &TradeArea) -> Result<EffectiveCircle> {
        area.effective_circle(&self.settings.fetch_policy)
            .ok_or_else(|| {
                Error::InvalidGeometry("Trade area has no usable center or radius".to_string())
            })
    }

    async fn fetch_analysis(
        &self,
        area: TradeArea,
        circle: EffectiveCircle,
    ) -> Result<AnalysisResult> {
        let fetched = self.fetch_pois(circle).await?;
        let result = AnalysisResult::from_fetch(area, circle, fetched.value);
        info!(
            id = result.id(),
            fetched = result.fetched_count(),
            members = result.pois().len(),
            "analysis complete"
        );
        Ok(result)
    }

    async fn fetch_pois(&self, circle: EffectiveCircle) -> Result<Fetched<Vec<PointOfInterest>>> {
        let key = RequestKey::builder("pois", self.settings.coordinate_precision)
            .point("center", circle.center)
            .miles("radius", circle.radius_miles)
            .build();
        let sources = Arc::clone(&self.sources);

        self.pois
            .get_or_fetch(key, StalePolicy::Block, move || async move {
                debug!(radius_miles = circle.radius_miles, "issuing POI search");
                sources.search_pois(circle).await
            })
            .await
    }

    async fn fetch_isochrone(
        &self,
        center: GeoPoint,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Polygon> {
        let key = RequestKey::builder("isochrone", self.settings.coordinate_precision)
            .point("center", center)
            .param("mode", mode)
            .param("minutes", minutes)
            .build();
        let sources = Arc::clone(&self.sources);

        let fetched = self
            .isochrones
            .get_or_fetch(key, StalePolicy::Block, move || async move {
                debug!(%mode, minutes, "issuing isochrone request");
                sources.isochrone(center, mode, minutes).await
            })
            .await?;
        Ok(fetched.value)
    }

    // ---- demographics ----

    /// Demographic rings around `center`
    ///
    /// An empty `radii` means the configured default rings. Nothing is
    /// fetched until this is called.
    pub async fn get_demographics(
        &self,
        center: GeoPoint,
        radii: &[f64],
    ) -> Result<Commit<Fetched<DemographicsBundle>>> {
        let radii = if radii.is_empty() {
            self.settings.demographic_radii.as_slice()
        } else {
            radii
        };
        if let Err(e) = radius_set(radii) {
            return Err(reject("demographics", &self.demographics, e).await);
        }

        let token = begin(&self.demographics, &self.demographics_gen).await;
        let outcome = self.demographics_merger.get_or_fetch(center, radii).await;
        commit(
            "demographics",
            &self.demographics,
            &self.demographics_gen,
            token,
            outcome,
        )
        .await
    }

    pub async fn current_demographics(&self) -> Option<Fetched<DemographicsBundle>> {
        self.demographics.read().await.value.clone()
    }

    // ---- opportunities ----

    /// Rank `candidates`, replacing the current rankings wholesale
    ///
    /// `criteria`, when given, becomes the session's filter.
    pub async fn rank_opportunities(
        &self,
        candidates: &[CandidateProperty],
        criteria: Option<FilterCriteria>,
    ) -> Result<Commit<Vec<OpportunityRanking>>> {
        let criteria = self.use_criteria(criteria).await;
        let rankings = rank(candidates, &criteria, &self.settings.scoring);
        debug!(
            candidates = candidates.len(),
            ranked = rankings.len(),
            "ranked opportunities"
        );
        self.publish_rankings(rankings).await
    }

    async fn publish_rankings(
        &self,
        rankings: Vec<OpportunityRanking>,
    ) -> Result<Commit<Vec<OpportunityRanking>>> {
        let token = begin(&self.rankings, &self.rankings_gen).await;
        commit("rankings", &self.rankings, &self.rankings_gen, token, Ok(rankings)).await
    }

    pub async fn current_rankings(&self) -> Option<Vec<OpportunityRanking>> {
        self.rankings.read().await.value.clone()
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.criteria.read().await.clone()
    }

    async fn use_criteria(&self, criteria: Option<FilterCriteria>) -> FilterCriteria {
        match criteria {
            Some(criteria) => {
                *self.criteria.write().await = criteria.clone();
                criteria
            }
            None => self.criteria.read().await.clone(),
        }
    }

    // ---- listing search ----

    /// Search candidate properties inside `bounds` and rank them
    ///
    /// Results are cached per rounded bounds and filter. A stale entry is
    /// handled per the configured [`StalePolicy`]. Applied results also
    /// replace the session's rankings, unless rankings were published after
    /// this search was issued.
    pub async fn search_listings(
        &self,
        bounds: Bounds,
        criteria: Option<FilterCriteria>,
    ) -> Result<Commit<ListingSearch>> {
        if let Err(e) = bounds.validate() {
            return Err(reject("listings", &self.listings, e).await);
        }
        let criteria = self.use_criteria(criteria).await;

        let token = begin(&self.listings, &self.listings_gen).await;
        let rankings_token = self.rankings_gen.next();
        let outcome = self
            .fetch_listings(bounds, &criteria)
            .await
            .map(|fetched| ListingSearch {
                bounds,
                freshness: fetched.freshness,
                rankings: rank(&fetched.value, &criteria, &self.settings.scoring),
                candidates: fetched.value,
            });

        let committed = commit("listings", &self.listings, &self.listings_gen, token, outcome).await?;
        if let Commit::Applied(search) = &committed {
            info!(
                candidates = search.candidates.len(),
                cached = search.freshness.is_cached(),
                "listing search applied"
            );
            commit(
                "rankings",
                &self.rankings,
                &self.rankings_gen,
                rankings_token,
                Ok(search.rankings.clone()),
            )
            .await?;
        }
        Ok(committed)
    }

    async fn fetch_listings(
        &self,
        bounds: Bounds,
        criteria: &FilterCriteria,
    ) -> Result<Fetched<Vec<CandidateProperty>>> {
        let key = criteria
            .key_params(
                RequestKey::builder("listings", self.settings.coordinate_precision)
                    .bounds("bounds", &bounds),
            )
            .build();
        let sources = Arc::clone(&self.sources);
        let query = ParcelQuery {
            area: ParcelArea::Bounds(bounds),
            criteria: criteria.clone(),
        };

        self.listings_cache
            .get_or_fetch(key, self.settings.stale_policy, move || async move {
                debug!("issuing parcel search");
                sources.search_parcels(&query).await
            })
            .await
    }

    /// Viewport moved; search listings once the map settles
    ///
    /// Bursts of calls collapse into one search fired after the debounce
    /// delay. The pending search is dropped if the session goes away.
    pub fn on_viewport_change(self: &Arc<Self>, bounds: Bounds) -> Result<()> {
        bounds.validate()?;
        let session: Weak<Self> = Arc::downgrade(self);

        self.debouncer.call(move || async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            match session.search_listings(bounds, None).await {
                Ok(Commit::Applied(_)) => {}
                Ok(Commit::Superseded) => debug!("viewport search superseded"),
                Err(e) => warn!(error = %e, "viewport search failed"),
            }
        });
        Ok(())
    }

    pub async fn current_listings(&self) -> Option<ListingSearch> {
        self.listings.read().await.value.clone()
    }

    // ---- lifecycle ----

    pub async fn status(&self) -> SessionStatus {
        let analysis = self.analysis.read().await;
        let pending_requests = self.pois.pending().await
            + self.isochrones.pending().await
            + self.listings_cache.pending().await;

        SessionStatus {
            analysis: analysis.status.clone(),
            analysis_id: analysis.value.as_ref().map(|r| r.id().to_string()),
            demographics: self.demographics.read().await.status.clone(),
            rankings: self.rankings.read().await.status.clone(),
            listings: self.listings.read().await.status.clone(),
            radius_miles: *self.radius_miles.read().await,
            pending_requests,
        }
    }

    /// Drop cache entries stale for more than one extra TTL
    pub async fn evict_expired(&self) -> usize {
        self.pois.evict_expired().await
            + self.isochrones.evict_expired().await
            + self.listings_cache.evict_expired().await
    }

    /// Cancel the pending viewport search and reset every operation
    pub async fn close(&self) {
        self.debouncer.cancel();
        self.close_analysis().await;

        let mut demographics = self.demographics.write().await;
        self.demographics_gen.invalidate();
        *demographics = Slot::default();
        drop(demographics);

        let mut rankings = self.rankings.write().await;
        self.rankings_gen.invalidate();
        *rankings = Slot::default();
        drop(rankings);

        let mut listings = self.listings.write().await;
        self.listings_gen.invalidate();
        *listings = Slot::default();
    }
}
