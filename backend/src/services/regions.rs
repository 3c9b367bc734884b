//! Region listing, boundary export and download links.

use serde::Serialize;

use super::{ColorCycle, ImageryContext, RegionFallback};
use crate::error::AnalysisResult;
use crate::remote::{bounded, RemoteError};

/// Region boundaries decorated with display colours.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionGeoJson {
    pub geojson: serde_json::Value,
    pub county_list: Vec<String>,
}

/// Region names in ascending order.
pub async fn region_names(ctx: &ImageryContext) -> AnalysisResult<Vec<String>> {
    Ok(bounded("region_names", ctx.timeout, ctx.service.region_names()).await?)
}

/// Every region feature with a `color` property, plus the sorted names.
pub async fn region_geojson(
    ctx: &ImageryContext,
    colors: &ColorCycle,
) -> AnalysisResult<RegionGeoJson> {
    let mut geojson = bounded("region_features", ctx.timeout, ctx.service.region_features()).await?;
    let field = ctx.settings.region_name_field.as_str();

    let features = geojson
        .get_mut("features")
        .and_then(|f| f.as_array_mut())
        .ok_or_else(|| {
            RemoteError::invalid_response("Region collection has no features array")
                .with_operation("region_features")
        })?;

    let mut county_list = Vec::with_capacity(features.len());
    for feature in features.iter_mut() {
        if let Some(name) = feature["properties"][field].as_str() {
            county_list.push(name.to_string());
        }
        if let Some(properties) = feature
            .as_object_mut()
            .map(|f| f.entry("properties").or_insert_with(|| serde_json::json!({})))
            .and_then(|p| p.as_object_mut())
        {
            properties.insert("color".to_string(), colors.next_color().into());
        }
    }
    county_list.sort();

    Ok(RegionGeoJson {
        geojson,
        county_list,
    })
}

/// Download link for one region, or for the whole region table when no
/// region is named.
pub async fn download_url(ctx: &ImageryContext, county: Option<&str>) -> AnalysisResult<String> {
    let area = ctx
        .regions()
        .resolve(county, RegionFallback::WholeCollection)
        .await?;
    Ok(bounded("download_url", ctx.timeout, ctx.service.download_url(&area)).await?)
}
