//! The `/analyze` pipeline: region, enhancement, then imagery query.

use tracing::info;

use super::{ImageryContext, RegionFallback};
use crate::enhancement;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AnalysisRequest, MapResult};

/// Cloud cover is a percentage.
fn validate_cloud_cover(value: f64) -> AnalysisResult<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidParameter {
            field: "cloudCover",
            reason: format!("expected a percentage between 0 and 100, got {}", value),
        })
    }
}

/// Produce a tile handle and legend for one validated request.
///
/// The region is resolved before the enhancement is looked up, so an
/// unknown county wins over an unknown enhancement.
pub async fn run_analysis(
    ctx: &ImageryContext,
    request: &AnalysisRequest,
) -> AnalysisResult<MapResult> {
    validate_cloud_cover(request.cloud_cover)?;

    let area = ctx
        .regions()
        .resolve(request.county_name.as_deref(), RegionFallback::BufferedPoint)
        .await?;
    let enhancement = enhancement::resolve(&request.enhancement, &request.bands)?;

    info!(
        year = request.year,
        enhancement = %enhancement.spec.name,
        area = %area.describe(),
        cloud_cover = request.cloud_cover,
        "Running analysis"
    );
    ctx.queries()
        .build(&area, request.year, request.cloud_cover, &enhancement)
        .await
}
