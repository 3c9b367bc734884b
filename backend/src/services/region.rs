//! Region resolver: county name to area of interest.

use tracing::debug;

use super::ImageryContext;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::AreaOfInterest;
use crate::remote::bounded;

/// Region name clients send to mean "no particular region".
pub const WHOLE_AREA_LABEL: &str = "All Counties";

/// What to use when no specific region was requested.
///
/// The endpoints disagree on this: analysis falls back to a buffered point,
/// table downloads fall back to the whole region collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFallback {
    BufferedPoint,
    WholeCollection,
}

/// True for an absent, blank, or whole-area region name.
pub fn is_whole_area(name: Option<&str>) -> bool {
    match name.map(str::trim) {
        None | Some("") => true,
        Some(name) => name.eq_ignore_ascii_case(WHOLE_AREA_LABEL),
    }
}

pub struct RegionResolver<'a> {
    ctx: &'a ImageryContext,
}

impl<'a> RegionResolver<'a> {
    pub fn new(ctx: &'a ImageryContext) -> Self {
        Self { ctx }
    }

    /// Resolve `name` against the region collection, or apply `fallback`.
    pub async fn resolve(
        &self,
        name: Option<&str>,
        fallback: RegionFallback,
    ) -> AnalysisResult<AreaOfInterest> {
        let name = match name {
            Some(name) if !is_whole_area(Some(name)) => name,
            _ => return Ok(self.fallback(fallback)),
        };

        let geometry = bounded(
            "find_region",
            self.ctx.timeout,
            self.ctx.service.find_region(name),
        )
        .await
        .map_err(|e| e.with_entity("region", name))?
        .ok_or_else(|| AnalysisError::RegionNotFound(name.to_string()))?;

        debug!(region = name, "Resolved region geometry");
        Ok(AreaOfInterest::Region {
            name: name.to_string(),
            geometry,
        })
    }

    fn fallback(&self, fallback: RegionFallback) -> AreaOfInterest {
        let settings = &self.ctx.settings;
        match fallback {
            RegionFallback::BufferedPoint => AreaOfInterest::BufferedPoint {
                lon: settings.default_lon,
                lat: settings.default_lat,
                radius_meters: settings.default_buffer_meters,
            },
            RegionFallback::WholeCollection => AreaOfInterest::Collection {
                collection: settings.region_collection.clone(),
            },
        }
    }
}
