//! Error taxonomy for the analysis pipeline.

use crate::remote::RemoteError;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors produced while validating and executing an analysis request.
///
/// Each variant maps to exactly one HTTP status in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// One or more required request fields were absent.
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    /// A field was present but unusable.
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Invalid enhancement type: {0}")]
    InvalidEnhancement(String),

    #[error("Invalid bands for {enhancement}: {reason}")]
    InvalidBands { enhancement: String, reason: String },

    #[error("County '{0}' not found")]
    RegionNotFound(String),

    #[error("No imagery found for {county} in {year} with cloud cover below {cloud_cover}%")]
    NoImageryFound {
        year: i32,
        county: String,
        cloud_cover: f64,
    },

    #[error("Tile generation failed: {0}")]
    TileGenerationFailed(#[source] RemoteError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Imagery service is not ready yet, retry shortly")]
    ServiceNotReady,
}

impl AnalysisError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::MissingParameters(_) => "MISSING_PARAMETERS",
            AnalysisError::InvalidParameter { .. } => "INVALID_PARAMETER",
            AnalysisError::InvalidEnhancement(_) => "INVALID_ENHANCEMENT",
            AnalysisError::InvalidBands { .. } => "INVALID_BANDS",
            AnalysisError::RegionNotFound(_) => "REGION_NOT_FOUND",
            AnalysisError::NoImageryFound { .. } => "NO_IMAGERY_FOUND",
            AnalysisError::TileGenerationFailed(_) => "TILE_GENERATION_FAILED",
            AnalysisError::Remote(_) => "REMOTE_SERVICE_ERROR",
            AnalysisError::ServiceNotReady => "SERVICE_NOT_READY",
        }
    }
}
