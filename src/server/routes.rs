//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::analysis::{AnalysisResult, PoiCategory};
use crate::cache::Fetched;
use crate::coord::{Bounds, GeoPoint, Polygon};
use crate::demographics::DemographicsBundle;
use crate::error::Error;
use crate::format::AnalysisReport;
use crate::provider::{DataSources, TravelMode};
use crate::scoring::{CandidateProperty, FilterCriteria, OpportunityRanking};
use crate::server::state::AppState;
use crate::session::{Commit, ListingSearch, SessionStatus};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router<S: DataSources>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route(
            "/api/analysis",
            post(analyze_handler::<S>).get(current_analysis_handler::<S>),
        )
        .route("/api/analysis/polygon", post(polygon_handler::<S>))
        .route("/api/analysis/isochrone", post(isochrone_handler::<S>))
        .route("/api/analysis/radius", put(radius_handler::<S>))
        .route("/api/demographics", post(demographics_handler::<S>))
        .route("/api/opportunities/rank", post(rank_handler::<S>))
        .route("/api/listings/search", post(listings_handler::<S>))
        .route("/api/status", get(status_handler::<S>))
        .route("/api/categories", get(categories_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip)]
    status: Option<StatusCode>,
}

impl ApiError {
    fn not_found(message: &str) -> Self {
        Self {
            error: message.to_string(),
            code: "NOT_FOUND".to_string(),
            status: Some(StatusCode::NOT_FOUND),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status.unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_input_error() {
            StatusCode::BAD_REQUEST
        } else if err.code() == "UPSTREAM_ERROR" {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError {
            error: err.to_string(),
            code: err.code().to_string(),
            status: Some(status),
        }
    }
}

/// Result of an operation that may have been overtaken by a newer request
#[derive(Debug, Serialize)]
pub struct CommitResponse<T> {
    pub superseded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> CommitResponse<T> {
    fn from_commit<U>(commit: Commit<U>, f: impl FnOnce(U) -> T) -> Self {
        match commit {
            Commit::Applied(value) => Self {
                superseded: false,
                result: Some(f(value)),
            },
            Commit::Superseded => Self {
                superseded: true,
                result: None,
            },
        }
    }
}

impl<T> From<Commit<T>> for CommitResponse<T> {
    fn from(commit: Commit<T>) -> Self {
        Self::from_commit(commit, |value| value)
    }
}

fn report<S: DataSources>(state: &AppState<S>, result: AnalysisResult) -> AnalysisReport {
    filtered_report(state, result, None)
}

fn filtered_report<S: DataSources>(
    state: &AppState<S>,
    result: AnalysisResult,
    categories: Option<&[PoiCategory]>,
) -> AnalysisReport {
    let boundary = state.session.boundary(&result);
    AnalysisReport::new(
        result,
        boundary,
        categories,
        state.session.settings().top_items_limit,
    )
}

/// Circle analysis request body
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Trade-area radius in miles (configured default when absent)
    pub radius_miles: Option<f64>,
}

/// Analyze a circular trade area
///
/// POST /api/analysis
async fn analyze_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<CommitResponse<AnalysisReport>>, ApiError> {
    let center = GeoPoint::new(req.lat, req.lng)?;
    let radius = req
        .radius_miles
        .unwrap_or(state.session.settings().default_radius_miles);

    let commit = state.session.analyze_trade_area(center, radius).await?;
    Ok(Json(CommitResponse::from_commit(commit, |r| report(&state, r))))
}

/// Polygon analysis request body
#[derive(Debug, Deserialize)]
pub struct PolygonRequest {
    /// GeoJSON polygon geometry
    pub polygon: Polygon,
}

/// Analyze a drawn polygon
///
/// POST /api/analysis/polygon
async fn polygon_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PolygonRequest>,
) -> Result<Json<CommitResponse<AnalysisReport>>, ApiError> {
    let commit = state.session.analyze_polygon(req.polygon).await?;
    Ok(Json(CommitResponse::from_commit(commit, |r| report(&state, r))))
}

/// Isochrone analysis request body
#[derive(Debug, Deserialize)]
pub struct IsochroneRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub mode: TravelMode,
    pub minutes: u32,
}

/// Analyze the area reachable within a travel time
///
/// POST /api/analysis/isochrone
async fn isochrone_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<IsochroneRequest>,
) -> Result<Json<CommitResponse<AnalysisReport>>, ApiError> {
    let center = GeoPoint::new(req.lat, req.lng)?;
    let commit = state
        .session
        .analyze_isochrone(center, req.mode, req.minutes)
        .await?;
    Ok(Json(CommitResponse::from_commit(commit, |r| report(&state, r))))
}

/// Radius change request body
#[derive(Debug, Deserialize)]
pub struct RadiusRequest {
    pub radius_miles: f64,
}

/// Radius change response
#[derive(Debug, Serialize)]
pub struct RadiusResponse {
    pub radius_miles: f64,
    /// Present when the current analysis was re-run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CommitResponse<AnalysisReport>>,
}

/// Change the working radius
///
/// PUT /api/analysis/radius
async fn radius_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RadiusRequest>,
) -> Result<Json<RadiusResponse>, ApiError> {
    let rerun = state.session.set_radius(req.radius_miles).await?;
    Ok(Json(RadiusResponse {
        radius_miles: req.radius_miles,
        analysis: rerun.map(|commit| CommitResponse::from_commit(commit, |r| report(&state, r))),
    }))
}

/// Current analysis query
#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    /// Comma-separated categories to show (all when absent)
    pub categories: Option<String>,
}

impl AnalysisQuery {
    fn categories(&self) -> Result<Option<Vec<PoiCategory>>, Error> {
        self.categories
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| name.parse().map_err(Error::InvalidInput))
                    .collect::<Result<Vec<PoiCategory>, Error>>()
            })
            .transpose()
    }
}

/// Current analysis
///
/// GET /api/analysis?categories=anchors,retail
async fn current_analysis_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let categories = query.categories()?;
    let result = state
        .session
        .current_analysis()
        .await
        .ok_or_else(|| ApiError::not_found("No analysis is open"))?;
    Ok(Json(filtered_report(&state, result, categories.as_deref())))
}

/// Demographics request body
#[derive(Debug, Deserialize)]
pub struct DemographicsRequest {
    pub lat: f64,
    pub lng: f64,
    /// Ring radii in miles (configured defaults when empty)
    #[serde(default)]
    pub radii: Vec<f64>,
}

/// Fetch (or serve cached) demographic rings
///
/// POST /api/demographics
async fn demographics_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<DemographicsRequest>,
) -> Result<Json<CommitResponse<Fetched<DemographicsBundle>>>, ApiError> {
    let center = GeoPoint::new(req.lat, req.lng)?;
    let commit = state.session.get_demographics(center, &req.radii).await?;
    Ok(Json(commit.into()))
}

/// Ranking request body
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub candidates: Vec<CandidateProperty>,
    /// Replaces the session's filter when present
    pub criteria: Option<FilterCriteria>,
}

/// Rank candidate properties
///
/// POST /api/opportunities/rank
async fn rank_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RankRequest>,
) -> Result<Json<CommitResponse<Vec<OpportunityRanking>>>, ApiError> {
    let commit = state
        .session
        .rank_opportunities(&req.candidates, req.criteria)
        .await?;
    Ok(Json(commit.into()))
}

/// Listing search request body
#[derive(Debug, Deserialize)]
pub struct ListingSearchRequest {
    pub bounds: Bounds,
    pub criteria: Option<FilterCriteria>,
}

/// Search and rank listings inside map bounds
///
/// POST /api/listings/search
async fn listings_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ListingSearchRequest>,
) -> Result<Json<CommitResponse<ListingSearch>>, ApiError> {
    let commit = state
        .session
        .search_listings(req.bounds, req.criteria)
        .await?;
    Ok(Json(commit.into()))
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Configured provider kind
    pub provider: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Per-operation status
    pub session: SessionStatus,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler<S: DataSources>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.config.provider.kind.to_string(),
        uptime_secs: state.uptime_secs(),
        session: state.session.status().await,
    })
}

/// Categories list response
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub label: String,
}

/// List POI categories
///
/// GET /api/categories
async fn categories_handler() -> Json<CategoriesResponse> {
    let categories = PoiCategory::ALL
        .iter()
        .map(|c| CategoryInfo {
            name: c.to_string(),
            label: c.label().to_string(),
        })
        .collect();

    Json(CategoriesResponse { categories })
}
