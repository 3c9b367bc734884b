//! Imagery query builder.
//!
//! Turns an area, a year and a cloud-cover bound into a filtered scene
//! collection, checks the collection is not empty, and asks the remote
//! service for a tile handle of the enhanced median composite.

use tracing::{debug, info};

use super::ImageryContext;
use crate::config::ImagerySettings;
use crate::enhancement::{EnhancementKind, ResolvedEnhancement};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    AreaOfInterest, DateRange, ImageExpression, MapResult, Reducer, SceneFilter,
    VisualizationRequest,
};
use crate::remote::bounded;

/// Scene filter for one calendar year over `area`.
pub fn scene_filter(
    settings: &ImagerySettings,
    area: &AreaOfInterest,
    year: i32,
    max_cloud_cover: f64,
) -> AnalysisResult<SceneFilter> {
    let date_range = DateRange::for_year(year).ok_or_else(|| AnalysisError::InvalidParameter {
        field: "year",
        reason: format!("{} is not a representable calendar year", year),
    })?;

    Ok(SceneFilter {
        collection: settings.collection.clone(),
        region: area.clone(),
        date_range,
        cloud_property: settings.cloud_property.clone(),
        max_cloud_cover,
    })
}

/// Median composite of `filter`, clipped to its area, with the enhancement
/// applied.
pub fn visualization_request(
    filter: SceneFilter,
    enhancement: &ResolvedEnhancement,
) -> VisualizationRequest {
    let region = filter.region.clone();
    let composite = ImageExpression::Clip {
        image: Box::new(ImageExpression::Composite {
            filter,
            reducer: Reducer::Median,
        }),
        region,
    };

    let image = match &enhancement.spec.kind {
        EnhancementKind::Composite { .. } => composite,
        EnhancementKind::NormalizedDifference { bands, output } => ImageExpression::Rename {
            image: Box::new(ImageExpression::NormalizedDifference {
                image: Box::new(composite),
                bands: [bands[0].to_string(), bands[1].to_string()],
            }),
            name: output.to_string(),
        },
    };

    VisualizationRequest {
        image,
        vis_params: enhancement.vis_params(),
    }
}

pub struct QueryBuilder<'a> {
    ctx: &'a ImageryContext,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(ctx: &'a ImageryContext) -> Self {
        Self { ctx }
    }

    /// Build and submit the visualization for `area`.
    ///
    /// Fails with [`AnalysisError::NoImageryFound`] without requesting a
    /// composite when no scene matches the filter.
    pub async fn build(
        &self,
        area: &AreaOfInterest,
        year: i32,
        max_cloud_cover: f64,
        enhancement: &ResolvedEnhancement,
    ) -> AnalysisResult<MapResult> {
        let filter = scene_filter(&self.ctx.settings, area, year, max_cloud_cover)?;

        let count = bounded(
            "count_scenes",
            self.ctx.timeout,
            self.ctx.service.count_scenes(&filter),
        )
        .await?;
        debug!(area = %area.describe(), year, max_cloud_cover, count, "Counted matching scenes");

        if count == 0 {
            return Err(AnalysisError::NoImageryFound {
                year,
                county: area.describe(),
                cloud_cover: max_cloud_cover,
            });
        }

        let request = visualization_request(filter, enhancement);
        let map_id = bounded("get_map", self.ctx.timeout, self.ctx.service.get_map(&request))
            .await
            .map_err(AnalysisError::TileGenerationFailed)?;

        info!(
            enhancement = %enhancement.spec.name,
            area = %area.describe(),
            scenes = count,
            mapid = %map_id.mapid,
            "Generated map"
        );
        Ok(MapResult {
            map_id,
            legend_info: enhancement.spec.legend,
        })
    }
}
