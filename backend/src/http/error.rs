//! HTTP error handling and response types.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::AnalysisError;

/// Seconds a client should wait before retrying while the service initializes.
const NOT_READY_RETRY_AFTER_SECS: &str = "5";

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request that never reached the analysis layer
    BadRequest(String),
    Analysis(AnalysisError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Analysis(err) => match err {
                AnalysisError::MissingParameters(_)
                | AnalysisError::InvalidParameter { .. }
                | AnalysisError::InvalidEnhancement(_)
                | AnalysisError::InvalidBands { .. } => StatusCode::BAD_REQUEST,
                AnalysisError::RegionNotFound(_) | AnalysisError::NoImageryFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                AnalysisError::TileGenerationFailed(_) | AnalysisError::Remote(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                AnalysisError::ServiceNotReady => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn body(&self) -> ApiError {
        match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg.clone()),
            AppError::Analysis(err) => {
                let body = ApiError::new(err.code(), err.to_string());
                match err {
                    AnalysisError::TileGenerationFailed(source) | AnalysisError::Remote(source) => {
                        body.with_details(source.context().to_string())
                    }
                    _ => body,
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        if status.is_server_error() {
            error!(status = status.as_u16(), code = %body.code, error = %body.error, details = ?body.details, "Request failed");
        } else {
            warn!(status = status.as_u16(), code = %body.code, error = %body.error, "Request rejected");
        }

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return (
                status,
                [(header::RETRY_AFTER, NOT_READY_RETRY_AFTER_SECS)],
                Json(body),
            )
                .into_response();
        }
        (status, Json(body)).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Analysis(err)
    }
}

impl From<crate::remote::RemoteError> for AppError {
    fn from(err: crate::remote::RemoteError) -> Self {
        AppError::Analysis(err.into())
    }
}
