//! Enhancement table and resolver.
//!
//! An enhancement is a named analysis mode: either a three-band composite
//! displayed with a shared stretch, or a normalized-difference index rendered
//! through a colour ramp. The table is static; [`resolve`] only looks names
//! up and validates the client-supplied display bands.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::VisParams;

/// Sentinel-2 band identifiers accepted as display bands.
pub const KNOWN_BANDS: [&str; 13] = [
    "B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B9", "B10", "B11", "B12",
];

const COMPOSITE_RANGE: (f64, f64) = (0.0, 3000.0);
const COMPOSITE_GAMMA: f64 = 1.4;

/// Names of the supported analysis modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementName {
    TrueColor,
    FalseColor,
    Agriculture,
    Urban,
    Ndvi,
    MoistureIndex,
}

impl EnhancementName {
    pub const ALL: [EnhancementName; 6] = [
        EnhancementName::TrueColor,
        EnhancementName::FalseColor,
        EnhancementName::Agriculture,
        EnhancementName::Urban,
        EnhancementName::Ndvi,
        EnhancementName::MoistureIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementName::TrueColor => "true_color",
            EnhancementName::FalseColor => "false_color",
            EnhancementName::Agriculture => "agriculture",
            EnhancementName::Urban => "urban",
            EnhancementName::Ndvi => "ndvi",
            EnhancementName::MoistureIndex => "moisture_index",
        }
    }
}

impl fmt::Display for EnhancementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementName {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnhancementName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| AnalysisError::InvalidEnhancement(s.to_string()))
    }
}

/// How the displayed image is derived from the median composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnhancementKind {
    /// The composite's own bands, stretched.
    Composite { bands: [&'static str; 3] },
    /// `(bands[0] - bands[1]) / (bands[0] + bands[1])`, renamed to `output`.
    NormalizedDifference {
        bands: [&'static str; 2],
        output: &'static str,
    },
}

/// One coloured class in an index legend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendClass {
    pub color: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendBody {
    Description(&'static str),
    Classes(&'static [LegendClass]),
}

/// Legend shown next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    #[serde(flatten)]
    pub body: LegendBody,
}

/// Full description of one analysis mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementSpec {
    pub name: EnhancementName,
    pub kind: EnhancementKind,
    pub value_range: (f64, f64),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(skip_serializing_if = "ramp_is_empty")]
    pub color_ramp: &'static [&'static str],
    pub legend: Legend,
}

fn ramp_is_empty(ramp: &&'static [&'static str]) -> bool {
    ramp.is_empty()
}

impl EnhancementSpec {
    pub fn is_index(&self) -> bool {
        matches!(self.kind, EnhancementKind::NormalizedDifference { .. })
    }

    /// Bands the underlying image is built from.
    pub fn source_bands(&self) -> &[&'static str] {
        match &self.kind {
            EnhancementKind::Composite { bands } => bands,
            EnhancementKind::NormalizedDifference { bands, .. } => bands,
        }
    }
}

const NDVI_RAMP: [&str; 6] = ["#d73027", "#fc8d59", "#fee08b", "#d9ef8b", "#91cf60", "#1a9850"];

const NDVI_CLASSES: [LegendClass; 6] = [
    LegendClass { color: "#d73027", label: "Water / bare soil (< 0)" },
    LegendClass { color: "#fc8d59", label: "Sparse vegetation (0 - 0.2)" },
    LegendClass { color: "#fee08b", label: "Stressed vegetation (0.2 - 0.35)" },
    LegendClass { color: "#d9ef8b", label: "Moderate vegetation (0.35 - 0.5)" },
    LegendClass { color: "#91cf60", label: "Healthy vegetation (0.5 - 0.65)" },
    LegendClass { color: "#1a9850", label: "Dense vegetation (> 0.65)" },
];

const MOISTURE_RAMP: [&str; 7] = [
    "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#c7eae5", "#5ab4ac", "#01665e",
];

const MOISTURE_CLASSES: [LegendClass; 7] = [
    LegendClass { color: "#8c510a", label: "Very dry (< -0.35)" },
    LegendClass { color: "#bf812d", label: "Dry (-0.35 - -0.2)" },
    LegendClass { color: "#dfc27d", label: "Moderately dry (-0.2 - -0.05)" },
    LegendClass { color: "#f6e8c3", label: "Normal (-0.05 - 0.05)" },
    LegendClass { color: "#c7eae5", label: "Moderately moist (0.05 - 0.2)" },
    LegendClass { color: "#5ab4ac", label: "Moist (0.2 - 0.35)" },
    LegendClass { color: "#01665e", label: "Very moist / water (> 0.35)" },
];

const fn composite(
    name: EnhancementName,
    bands: [&'static str; 3],
    title: &'static str,
    description: &'static str,
) -> EnhancementSpec {
    EnhancementSpec {
        name,
        kind: EnhancementKind::Composite { bands },
        value_range: COMPOSITE_RANGE,
        gamma: Some(COMPOSITE_GAMMA),
        color_ramp: &[],
        legend: Legend {
            title,
            body: LegendBody::Description(description),
        },
    }
}

/// The process-wide enhancement table.
pub static ENHANCEMENTS: [EnhancementSpec; 6] = [
    composite(
        EnhancementName::TrueColor,
        ["B4", "B3", "B2"],
        "True Color",
        "Natural colour composite (red, green, blue) as seen by the human eye.",
    ),
    composite(
        EnhancementName::FalseColor,
        ["B8", "B4", "B3"],
        "False Color Infrared",
        "Near-infrared composite. Healthy vegetation appears bright red.",
    ),
    composite(
        EnhancementName::Agriculture,
        ["B11", "B8", "B2"],
        "Agriculture",
        "Short-wave infrared composite highlighting crop vigour in bright green.",
    ),
    composite(
        EnhancementName::Urban,
        ["B12", "B11", "B4"],
        "Urban",
        "Short-wave infrared composite separating built-up areas from vegetation.",
    ),
    EnhancementSpec {
        name: EnhancementName::Ndvi,
        kind: EnhancementKind::NormalizedDifference {
            bands: ["B8", "B4"],
            output: "NDVI",
        },
        value_range: (-0.2, 0.8),
        gamma: None,
        color_ramp: &NDVI_RAMP,
        legend: Legend {
            title: "NDVI (Vegetation Health)",
            body: LegendBody::Classes(&NDVI_CLASSES),
        },
    },
    EnhancementSpec {
        name: EnhancementName::MoistureIndex,
        kind: EnhancementKind::NormalizedDifference {
            bands: ["B8A", "B11"],
            output: "NDMI",
        },
        value_range: (-0.5, 0.5),
        gamma: None,
        color_ramp: &MOISTURE_RAMP,
        legend: Legend {
            title: "Moisture Index",
            body: LegendBody::Classes(&MOISTURE_CLASSES),
        },
    },
];

/// Table entry for a known name.
pub fn spec_for(name: EnhancementName) -> &'static EnhancementSpec {
    // Table order matches EnhancementName::ALL.
    &ENHANCEMENTS[name as usize]
}

/// A table entry combined with the bands the client asked to display.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEnhancement {
    pub spec: &'static EnhancementSpec,
    /// Bands written into the visualization parameters.
    pub display_bands: Vec<String>,
}

impl ResolvedEnhancement {
    /// Whether the displayed bands differ from the bands the composite is
    /// described by. Only possible for composite modes.
    pub fn diverges_from_table(&self) -> bool {
        match &self.spec.kind {
            EnhancementKind::Composite { bands } => {
                self.display_bands.iter().map(String::as_str).ne(bands.iter().copied())
            }
            EnhancementKind::NormalizedDifference { .. } => false,
        }
    }

    pub fn vis_params(&self) -> VisParams {
        let (min, max) = self.spec.value_range;
        VisParams {
            bands: self.display_bands.clone(),
            min,
            max,
            gamma: self.spec.gamma,
            palette: (!self.spec.color_ramp.is_empty())
                .then(|| self.spec.color_ramp.iter().map(|c| c.to_string()).collect()),
        }
    }
}

/// Resolve an enhancement name and the client's display bands.
///
/// Composite modes display `client_bands` verbatim after checking they are
/// one to three known band identifiers. Index modes ignore `client_bands`
/// and display their single output band.
pub fn resolve(name: &str, client_bands: &[String]) -> AnalysisResult<ResolvedEnhancement> {
    let spec = spec_for(name.parse()?);

    let display_bands = match &spec.kind {
        EnhancementKind::Composite { .. } => {
            validate_display_bands(spec.name, client_bands)?;
            client_bands.to_vec()
        }
        EnhancementKind::NormalizedDifference { output, .. } => vec![output.to_string()],
    };

    let resolved = ResolvedEnhancement {
        spec,
        display_bands,
    };
    if resolved.diverges_from_table() {
        tracing::warn!(
            enhancement = %spec.name,
            table_bands = ?spec.source_bands(),
            display_bands = ?resolved.display_bands,
            "Client display bands differ from the enhancement's composite bands"
        );
    }
    Ok(resolved)
}

fn validate_display_bands(name: EnhancementName, bands: &[String]) -> AnalysisResult<()> {
    let invalid = |reason: String| AnalysisError::InvalidBands {
        enhancement: name.to_string(),
        reason,
    };

    if bands.is_empty() || bands.len() > 3 {
        return Err(invalid(format!(
            "expected 1 to 3 bands, got {}",
            bands.len()
        )));
    }
    if let Some(unknown) = bands.iter().find(|b| !KNOWN_BANDS.contains(&b.as_str())) {
        return Err(invalid(format!("unknown band '{}'", unknown)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_order_matches_names() {
        for name in EnhancementName::ALL {
            assert_eq!(spec_for(name).name, name);
        }
    }

    #[test]
    fn test_every_name_resolves_with_title() {
        for name in EnhancementName::ALL {
            let resolved = resolve(name.as_str(), &bands(&["B4", "B3", "B2"])).unwrap();
            assert!(!resolved.spec.legend.title.is_empty());
            assert_eq!(resolved.spec.name, name);
        }
    }

    #[test]
    fn test_composite_table_values() {
        let expected = [
            ("true_color", ["B4", "B3", "B2"]),
            ("false_color", ["B8", "B4", "B3"]),
            ("agriculture", ["B11", "B8", "B2"]),
            ("urban", ["B12", "B11", "B4"]),
        ];
        for (name, table_bands) in expected {
            let spec = spec_for(name.parse().unwrap());
            assert_eq!(spec.kind, EnhancementKind::Composite { bands: table_bands });
            assert_eq!(spec.value_range, (0.0, 3000.0));
            assert_eq!(spec.gamma, Some(1.4));
            assert!(spec.color_ramp.is_empty());
            assert!(matches!(spec.legend.body, LegendBody::Description(_)));
        }
    }

    #[test]
    fn test_true_color_title() {
        let resolved = resolve("true_color", &bands(&["B4", "B3", "B2"])).unwrap();
        assert_eq!(resolved.spec.legend.title, "True Color");
    }

    #[test]
    fn test_ndvi_table_values() {
        let resolved = resolve("ndvi", &[]).unwrap();
        assert_eq!(
            resolved.spec.kind,
            EnhancementKind::NormalizedDifference {
                bands: ["B8", "B4"],
                output: "NDVI"
            }
        );
        assert_eq!(resolved.spec.value_range, (-0.2, 0.8));
        assert_eq!(resolved.display_bands, vec!["NDVI".to_string()]);
        assert_eq!(resolved.spec.color_ramp.len(), 6);
        match resolved.spec.legend.body {
            LegendBody::Classes(classes) => assert_eq!(classes.len(), 6),
            LegendBody::Description(_) => panic!("ndvi legend should list classes"),
        }
    }

    #[test]
    fn test_moisture_table_values() {
        let resolved = resolve("moisture_index", &bands(&["B4"])).unwrap();
        assert_eq!(
            resolved.spec.kind,
            EnhancementKind::NormalizedDifference {
                bands: ["B8A", "B11"],
                output: "NDMI"
            }
        );
        assert_eq!(resolved.spec.value_range, (-0.5, 0.5));
        assert_eq!(resolved.spec.color_ramp.len(), 7);
        assert_eq!(resolved.display_bands, vec!["NDMI".to_string()]);
    }

    #[test]
    fn test_legend_classes_follow_ramp() {
        for name in [EnhancementName::Ndvi, EnhancementName::MoistureIndex] {
            let spec = spec_for(name);
            let LegendBody::Classes(classes) = spec.legend.body else {
                panic!("index legend should list classes");
            };
            let colors: Vec<&str> = classes.iter().map(|c| c.color).collect();
            assert_eq!(colors, spec.color_ramp);
        }
    }

    #[test]
    fn test_unknown_name_is_invalid_enhancement() {
        for name in ["unknown", "", "TRUE_COLOR", "ndvi "] {
            let err = resolve(name, &bands(&["B4", "B3", "B2"])).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidEnhancement(ref n) if n == name));
        }
    }

    #[test]
    fn test_ndvi_resolution_is_idempotent() {
        let first = resolve("ndvi", &bands(&["B4", "B3", "B2"])).unwrap();
        let second = resolve("ndvi", &bands(&["B4", "B3", "B2"])).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.vis_params(), second.vis_params());
    }

    #[test]
    fn test_client_bands_override_display_only() {
        let resolved = resolve("true_color", &bands(&["B8", "B4", "B3"])).unwrap();
        assert_eq!(resolved.display_bands, bands(&["B8", "B4", "B3"]));
        assert_eq!(resolved.spec.source_bands(), &["B4", "B3", "B2"]);
        assert!(resolved.diverges_from_table());

        let matching = resolve("true_color", &bands(&["B4", "B3", "B2"])).unwrap();
        assert!(!matching.diverges_from_table());
    }

    #[test]
    fn test_index_modes_never_diverge() {
        let resolved = resolve("ndvi", &bands(&["B2"])).unwrap();
        assert!(!resolved.diverges_from_table());
    }

    #[test]
    fn test_composite_band_shape_validation() {
        let err = resolve("urban", &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBands { .. }));

        let err = resolve("urban", &bands(&["B1", "B2", "B3", "B4"])).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBands { .. }));

        let err = resolve("urban", &bands(&["B4", "B99"])).unwrap_err();
        assert!(err.to_string().contains("B99"));

        assert!(resolve("urban", &bands(&["B8A"])).is_ok());
    }

    #[test]
    fn test_vis_params() {
        let composite = resolve("agriculture", &bands(&["B11", "B8", "B2"])).unwrap();
        let vis = composite.vis_params();
        assert_eq!(vis.bands, bands(&["B11", "B8", "B2"]));
        assert_eq!((vis.min, vis.max), (0.0, 3000.0));
        assert_eq!(vis.gamma, Some(1.4));
        assert!(vis.palette.is_none());

        let index = resolve("ndvi", &[]).unwrap().vis_params();
        assert_eq!(index.gamma, None);
        assert_eq!(index.palette.unwrap().len(), 6);
    }

    #[test]
    fn test_legend_serialization_shapes() {
        let json = serde_json::to_value(spec_for(EnhancementName::TrueColor).legend).unwrap();
        assert_eq!(json["title"], "True Color");
        assert!(json["description"].is_string());

        let json = serde_json::to_value(spec_for(EnhancementName::Ndvi).legend).unwrap();
        assert_eq!(json["classes"][0]["color"], "#d73027");
        assert!(json.get("description").is_none());
    }
}
