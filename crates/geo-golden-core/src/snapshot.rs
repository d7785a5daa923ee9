//! The `ContentSnapshot` expectation model.
//!
//! A snapshot is the golden description of a produced dataset. Every field is
//! optional: an absent (or empty) field means "do not check", never "expect
//! empty". Snapshots are either hand-authored next to a test definition or
//! produced by the snapshot factory, and are never mutated once written.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{GeoPos, PixelPos, SceneSize};

/// Default absolute tolerance for pixel values and geolocations.
pub const DEFAULT_EPS: f64 = 1e-8;

fn default_eps() -> f64 {
    DEFAULT_EPS
}

/// Expected structure and sampled content of a produced dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSnapshot {
    /// Dataset name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Dataset description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Product type identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Scene raster size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_size: Option<SceneSize>,
    /// Sensing start time, as formatted by the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Sensing stop time, as formatted by the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Scene-level geocoding samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_locations: Option<Vec<GeoSample>>,
    /// Flag and index codings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_codings: Option<Vec<Coding>>,
    /// Per-raster expectations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rasters: Option<Vec<RasterSnapshot>>,
    /// Per-vector-layer expectations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vec<VectorSnapshot>>,
    /// Sampled metadata attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<MetadataSample>>,
}

/// Sample data type of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    Uint32,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Int8 => "int8",
            DataType::Uint8 => "uint8",
            DataType::Int16 => "int16",
            DataType::Uint16 => "uint16",
            DataType::Int32 => "int32",
            DataType::Uint32 => "uint32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Role of a raster within its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RasterKind {
    /// Measurement band
    Band,
    /// Tie-point grid
    TiePoint,
    /// Mask
    Mask,
    /// Virtual (expression) band
    Virtual,
    /// Filter band
    Filter,
}

impl std::fmt::Display for RasterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RasterKind::Band => "BAND",
            RasterKind::TiePoint => "TIE_POINT",
            RasterKind::Mask => "MASK",
            RasterKind::Virtual => "VIRTUAL",
            RasterKind::Filter => "FILTER",
        };
        f.write_str(name)
    }
}

/// Expected properties of a single raster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RasterSnapshot {
    /// Raster name, used to look the raster up
    pub name: String,
    /// Raster description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raster size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SceneSize>,
    /// Sample data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Raster role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_kind: Option<RasterKind>,
    /// No-data value
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::float::option"
    )]
    #[schemars(with = "Option<f64>")]
    pub no_data_value: Option<f64>,
    /// Whether the no-data value is in use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_data_value_used: Option<bool>,
    /// Valid-pixel expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_pixel_expression: Option<String>,
    /// Sampled pixel values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_samples: Option<Vec<PixelSample>>,
    /// Raster-level geocoding samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_locations: Option<Vec<GeoSample>>,
    /// Minimum of valid pixels
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::float::option"
    )]
    #[schemars(with = "Option<f64>")]
    pub min: Option<f64>,
    /// Maximum of valid pixels
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::float::option"
    )]
    #[schemars(with = "Option<f64>")]
    pub max: Option<f64>,
    /// Histogram bin counts of valid pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram_bins: Option<Vec<u64>>,
}

impl RasterSnapshot {
    /// Create a raster expectation that checks nothing but presence.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A geocoding sample checked in both transform directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoSample {
    /// Image position
    pub pixel_pos: PixelPos,
    /// Geographic position expected at `pixel_pos`
    pub geo_pos: GeoPos,
    /// Tolerance for pixel -> geo (degrees)
    #[serde(default = "default_eps")]
    pub forward_eps: f64,
    /// Tolerance for geo -> pixel (pixels)
    #[serde(default = "default_eps")]
    pub inverse_eps: f64,
}

impl GeoSample {
    /// Create a sample with default tolerances.
    pub fn new(pixel_pos: PixelPos, geo_pos: GeoPos) -> Self {
        Self {
            pixel_pos,
            geo_pos,
            forward_eps: DEFAULT_EPS,
            inverse_eps: DEFAULT_EPS,
        }
    }
}

/// A sampled pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixelSample {
    /// Image position
    pub pixel_pos: PixelPos,
    /// Expected geophysical value
    #[serde(with = "crate::float")]
    #[schemars(with = "f64")]
    pub value: f64,
    /// Absolute tolerance
    #[serde(default = "default_eps")]
    pub eps: f64,
}

impl PixelSample {
    /// Create a sample with default tolerance.
    pub fn new(pixel_pos: PixelPos, value: f64) -> Self {
        Self {
            pixel_pos,
            value,
            eps: DEFAULT_EPS,
        }
    }
}

/// A flag or index coding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Coding {
    /// Coding name
    pub name: String,
    /// Coding entries
    #[serde(default)]
    pub samples: Vec<CodingSample>,
}

/// A single named coding entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodingSample {
    /// Entry name
    pub name: String,
    /// Entry description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Flag mask or index value
    pub int_value: i32,
}

/// Expected properties of a vector layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VectorSnapshot {
    /// Layer name
    pub name: String,
    /// Layer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<usize>,
}

/// A sampled metadata attribute.
///
/// `path` is `/`-separated; each element segment may carry a `[k]` index to
/// pick the k-th of several same-named siblings. The last segment names the
/// attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetadataSample {
    /// Attribute path
    pub path: String,
    /// Expected attribute value rendered as text
    pub value: String,
}

impl MetadataSample {
    /// Create a metadata sample.
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_serializes_to_empty_object() {
        let json = serde_json::to_string(&ContentSnapshot::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_absent_fields_stay_none() {
        let snapshot: ContentSnapshot =
            serde_json::from_str(r#"{"name": "subset_0_of_MER_RR", "rasters": []}"#).unwrap();
        assert_eq!(snapshot.name.as_deref(), Some("subset_0_of_MER_RR"));
        assert!(snapshot.product_type.is_none());
        assert!(snapshot.metadata.is_none());
        assert_eq!(snapshot.rasters.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn test_sample_eps_defaults() {
        let sample: PixelSample =
            serde_json::from_str(r#"{"pixelPos": {"x": 1.5, "y": 2.5}, "value": 3.0}"#).unwrap();
        assert_eq!(sample.eps, DEFAULT_EPS);

        let geo: GeoSample = serde_json::from_str(
            r#"{"pixelPos": {"x": 0.5, "y": 0.5}, "geoPos": {"lat": 10.0, "lon": 20.0}, "forwardEps": 1e-4}"#,
        )
        .unwrap();
        assert_eq!(geo.forward_eps, 1e-4);
        assert_eq!(geo.inverse_eps, DEFAULT_EPS);
    }

    #[test]
    fn test_raster_snapshot_parsing() {
        let json = r#"{
            "name": "radiance_13",
            "dataType": "float32",
            "rasterKind": "TIE_POINT",
            "noDataValue": "NaN",
            "noDataValueUsed": true,
            "histogramBins": [1, 0, 4]
        }"#;
        let raster: RasterSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(raster.data_type, Some(DataType::Float32));
        assert_eq!(raster.raster_kind, Some(RasterKind::TiePoint));
        assert!(raster.no_data_value.unwrap().is_nan());
        assert_eq!(raster.histogram_bins, Some(vec![1, 0, 4]));
        assert!(raster.min.is_none());
    }

    #[test]
    fn test_coding_int_value_name() {
        let json = r#"{"name": "l1_flags", "samples": [{"name": "INVALID", "intValue": 1}]}"#;
        let coding: Coding = serde_json::from_str(json).unwrap();
        assert_eq!(coding.samples[0].int_value, 1);
        assert!(coding.samples[0].description.is_none());
    }

    #[test]
    fn test_display_of_enums() {
        assert_eq!(RasterKind::TiePoint.to_string(), "TIE_POINT");
        assert_eq!(DataType::Uint16.to_string(), "uint16");
    }
}
