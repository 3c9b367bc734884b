//! Domain types shared by the resolvers, the query builder and the remote
//! service clients.
//!
//! The query types ([`SceneFilter`], [`ImageExpression`],
//! [`VisualizationRequest`]) are a description of work for the remote
//! service. They serialize to the JSON the production client posts, and the
//! in-memory service interprets them directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enhancement::Legend;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Axis-aligned bounds in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Approximate bounds of a circle around a point.
    pub fn around_point(lon: f64, lat: f64, radius_meters: f64) -> Self {
        let dlat = radius_meters / METERS_PER_DEGREE;
        let cos_lat = lat.to_radians().cos().abs().max(1e-6);
        let dlon = radius_meters / (METERS_PER_DEGREE * cos_lat);
        Self::new(lon - dlon, lat - dlat, lon + dlon, lat + dlat)
    }

    /// Bounds of every coordinate pair found in a GeoJSON geometry.
    ///
    /// Returns `None` when the geometry holds no coordinates.
    pub fn from_geometry(geometry: &serde_json::Value) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        collect_positions(geometry.get("coordinates")?, &mut |lon, lat| {
            bounds = Some(match bounds {
                None => Self::new(lon, lat, lon, lat),
                Some(b) => Self::new(
                    b.min_lon.min(lon),
                    b.min_lat.min(lat),
                    b.max_lon.max(lon),
                    b.max_lat.max(lat),
                ),
            });
        });
        bounds
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Closed polygon ring as a GeoJSON geometry.
    pub fn to_geometry(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [self.min_lon, self.min_lat],
                [self.max_lon, self.min_lat],
                [self.max_lon, self.max_lat],
                [self.min_lon, self.max_lat],
                [self.min_lon, self.min_lat],
            ]]
        })
    }
}

fn collect_positions(value: &serde_json::Value, visit: &mut impl FnMut(f64, f64)) {
    let Some(items) = value.as_array() else {
        return;
    };
    match (items.first().and_then(|v| v.as_f64()), items.get(1).and_then(|v| v.as_f64())) {
        (Some(lon), Some(lat)) => visit(lon, lat),
        _ => {
            for item in items {
                collect_positions(item, visit);
            }
        }
    }
}

/// Geometry used to spatially restrict an imagery query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AreaOfInterest {
    /// Geometry of a single named region.
    Region {
        name: String,
        geometry: serde_json::Value,
    },
    /// Fixed point expanded by a buffer radius.
    BufferedPoint {
        lon: f64,
        lat: f64,
        radius_meters: f64,
    },
    /// Every feature of the region collection, unfiltered.
    Collection { collection: String },
}

impl AreaOfInterest {
    /// Short human-readable description used in logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            AreaOfInterest::Region { name, .. } => name.clone(),
            AreaOfInterest::BufferedPoint {
                lon,
                lat,
                radius_meters,
            } => format!("point ({}, {}) +{}m", lon, lat, radius_meters),
            AreaOfInterest::Collection { collection } => format!("all of {}", collection),
        }
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// January 1st through December 31st of `year`.
    pub fn for_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Filter applied to the imagery collection before compositing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFilter {
    pub collection: String,
    pub region: AreaOfInterest,
    pub date_range: DateRange,
    /// Scene attribute holding the cloud-cover percentage.
    pub cloud_property: String,
    /// Exclusive upper bound on `cloud_property`.
    pub max_cloud_cover: f64,
}

/// Per-pixel reducer used to collapse a collection into one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Median,
}

/// Image computation evaluated by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageExpression {
    Composite {
        filter: SceneFilter,
        reducer: Reducer,
    },
    Clip {
        image: Box<ImageExpression>,
        region: AreaOfInterest,
    },
    /// `(a - b) / (a + b)` per pixel.
    NormalizedDifference {
        image: Box<ImageExpression>,
        bands: [String; 2],
    },
    Rename {
        image: Box<ImageExpression>,
        name: String,
    },
}

impl ImageExpression {
    /// The scene filter at the root of the expression.
    pub fn filter(&self) -> &SceneFilter {
        match self {
            ImageExpression::Composite { filter, .. } => filter,
            ImageExpression::Clip { image, .. }
            | ImageExpression::NormalizedDifference { image, .. }
            | ImageExpression::Rename { image, .. } => image.filter(),
        }
    }
}

/// Display scaling for a tile request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
}

/// Image plus visualization parameters, ready for a tile handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationRequest {
    pub image: ImageExpression,
    pub vis_params: VisParams,
}

/// Opaque tile-serving handle returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapId {
    pub mapid: String,
    #[serde(default)]
    pub token: String,
    pub url_format: String,
}

/// Successful analysis response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResult {
    pub map_id: MapId,
    pub legend_info: Legend,
}

/// Validated analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub year: i32,
    pub bands: Vec<String>,
    pub enhancement: String,
    pub county_name: Option<String>,
    pub cloud_cover: f64,
}
