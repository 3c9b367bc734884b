//! HTTP handlers for the REST API.
//!
//! Gated handlers receive the ready [`ImageryContext`] as a request
//! extension inserted by the readiness middleware, and delegate to the
//! service layer.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use tracing::warn;

use super::dto::{
    AnalyzeRequest, DownloadQuery, DownloadResponse, EnhancementsResponse, HealthResponse,
    RegionNamesResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::enhancement::ENHANCEMENTS;
use crate::models::MapResult;
use crate::remote::bounded;
use crate::services::{self, regions::RegionGeoJson, ImageryContext};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Answers even while the imagery client is still initializing. Once ready,
/// probes the imagery service.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let remote = match state.context() {
        None => "initializing",
        Some(ctx) => {
            match bounded("health_check", ctx.timeout, ctx.service.health_check()).await {
                Ok(true) => "ready",
                Ok(false) => "unreachable",
                Err(e) => {
                    warn!(error = %e, "Imagery service health probe failed");
                    "unreachable"
                }
            }
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        remote: remote.to_string(),
    })
}

// =============================================================================
// Regions
// =============================================================================

/// GET /regions
pub async fn list_regions(
    Extension(ctx): Extension<ImageryContext>,
) -> HandlerResult<RegionNamesResponse> {
    let names = services::regions::region_names(&ctx).await?;
    Ok(Json(RegionNamesResponse { names }))
}

/// GET /regions/geojson
///
/// Every region feature, each tagged with a display colour.
pub async fn region_geojson(
    State(state): State<AppState>,
    Extension(ctx): Extension<ImageryContext>,
) -> HandlerResult<RegionGeoJson> {
    let geojson = services::regions::region_geojson(&ctx, &state.palette).await?;
    Ok(Json(geojson))
}

/// GET /download/geojson?countyName=
pub async fn download_geojson(
    Extension(ctx): Extension<ImageryContext>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> HandlerResult<DownloadResponse> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let download_url =
        services::regions::download_url(&ctx, query.county_name.as_deref()).await?;
    Ok(Json(DownloadResponse { download_url }))
}

// =============================================================================
// Analysis
// =============================================================================

/// POST /analyze
pub async fn analyze(
    Extension(ctx): Extension<ImageryContext>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> HandlerResult<MapResult> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = body.validate()?;
    let result = services::run_analysis(&ctx, &request).await?;
    Ok(Json(result))
}

/// GET /enhancements
pub async fn list_enhancements() -> Json<EnhancementsResponse> {
    Json(EnhancementsResponse {
        enhancements: &ENHANCEMENTS,
    })
}
