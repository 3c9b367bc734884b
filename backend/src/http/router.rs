//! Router configuration for the HTTP API.
//!
//! Sets up all routes, the readiness gate, and middleware (CORS,
//! compression, tracing).

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::error::AppError;
use super::handlers;
use super::state::AppState;
use crate::error::AnalysisError;

/// Analysis request bodies are small.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Reject requests with 503 until the imagery client is ready, otherwise
/// hand the ready context to the handler.
async fn require_ready(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.context() {
        Some(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        None => AppError::from(AnalysisError::ServiceNotReady).into_response(),
    }
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gated = Router::new()
        .route("/regions", get(handlers::list_regions))
        .route("/regions/geojson", get(handlers::region_geojson))
        .route("/download/geojson", get(handlers::download_geojson))
        .route("/analyze", post(handlers::analyze))
        .route("/enhancements", get(handlers::list_enhancements))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_ready));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(gated)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
