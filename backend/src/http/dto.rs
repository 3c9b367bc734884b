//! Data Transfer Objects for the HTTP API.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::enhancement::EnhancementSpec;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::AnalysisRequest;

/// Body of `POST /analyze`, before presence checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub year: Option<i32>,
    /// Display bands for composite modes
    #[serde(default)]
    pub bands: Option<Vec<String>>,
    #[serde(default)]
    pub enhancement: Option<String>,
    #[serde(default)]
    pub county_name: Option<String>,
    /// Upper bound on scene cloud cover, in percent
    #[serde(default)]
    pub cloud_cover: Option<f64>,
}

impl AnalyzeRequest {
    /// Check every required field is present, naming all that are not.
    ///
    /// `bands` is required even for index modes, which ignore it.
    pub fn validate(self) -> AnalysisResult<AnalysisRequest> {
        let mut missing = Vec::new();
        if self.year.is_none() {
            missing.push("year");
        }
        if self.bands.is_none() {
            missing.push("bands");
        }
        if self.enhancement.is_none() {
            missing.push("enhancement");
        }
        if self.cloud_cover.is_none() {
            missing.push("cloudCover");
        }

        match (self.year, self.bands, self.enhancement, self.cloud_cover) {
            (Some(year), Some(bands), Some(enhancement), Some(cloud_cover)) => {
                Ok(AnalysisRequest {
                    year,
                    bands,
                    enhancement,
                    county_name: self.county_name,
                    cloud_cover,
                })
            }
            _ => Err(AnalysisError::MissingParameters(missing)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionNamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    #[serde(default)]
    pub county_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_url: String,
}

/// The static enhancement table.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementsResponse {
    pub enhancements: &'static [EnhancementSpec],
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Imagery client status: "initializing", "ready" or "unreachable"
    pub remote: String,
}
