//! In-memory dataset backed by plain vectors.
//!
//! `MemoryDataset` implements the core accessor traits so the comparator and
//! the snapshot factory can run without a native dataset library. It is also
//! the on-disk format read by [`JsonDatasetReader`], which lets a processing
//! tool (or a test double) hand its product to the harness as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use geo_golden_core::{
    Coding, DataType, Dataset, DatasetReader, Error, GeoCoding, GeoPos, MetadataElement, PixelPos,
    Raster, RasterKind, RasterStatistics, Result, SceneSize, VectorLayer,
};

/// Number of histogram bins computed by [`MemoryRaster::statistics`].
pub const HISTOGRAM_BINS: usize = 512;

fn nan() -> f64 {
    f64::NAN
}

fn default_data_type() -> DataType {
    DataType::Float64
}

fn default_kind() -> RasterKind {
    RasterKind::Band
}

/// Pixel arrays with the same NaN-tolerant encoding as snapshot values.
mod float_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Lenient(#[serde(with = "geo_golden_core::float")] f64);

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Lenient(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Ok(Vec::<Lenient>::deserialize(deserializer)?
            .into_iter()
            .map(|l| l.0)
            .collect())
    }
}

/// Regular lat/lon grid: `lat = lat0 - y * dlat`, `lon = lon0 + x * dlon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffineGeoCoding {
    /// Latitude at the upper image edge
    pub lat0: f64,
    /// Longitude at the left image edge
    pub lon0: f64,
    /// Latitude step per row
    pub dlat: f64,
    /// Longitude step per column
    pub dlon: f64,
}

impl AffineGeoCoding {
    /// Create a grid geocoding.
    pub fn new(lat0: f64, lon0: f64, dlat: f64, dlon: f64) -> Self {
        Self {
            lat0,
            lon0,
            dlat,
            dlon,
        }
    }
}

impl GeoCoding for AffineGeoCoding {
    fn geo_pos(&self, pixel: PixelPos) -> GeoPos {
        GeoPos::new(self.lat0 - pixel.y * self.dlat, self.lon0 + pixel.x * self.dlon)
    }

    fn pixel_pos(&self, geo: GeoPos) -> PixelPos {
        if self.dlat == 0.0 || self.dlon == 0.0 {
            return PixelPos::new(f64::NAN, f64::NAN);
        }
        PixelPos::new(
            (geo.lon - self.lon0) / self.dlon,
            (self.lat0 - geo.lat) / self.dlat,
        )
    }
}

/// A raster held as a row-major `Vec<f64>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRaster {
    /// Raster name
    pub name: String,
    /// Raster description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raster size
    pub size: SceneSize,
    /// Declared sample type
    #[serde(default = "default_data_type")]
    pub data_type: DataType,
    /// Raster role
    #[serde(default = "default_kind")]
    pub kind: RasterKind,
    /// No-data value
    #[serde(default = "nan", with = "geo_golden_core::float")]
    pub no_data_value: f64,
    /// Whether `no_data_value` marks invalid pixels
    #[serde(default)]
    pub no_data_value_used: bool,
    /// Valid-pixel expression (recorded, not evaluated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_pixel_expression: Option<String>,
    /// Raster-specific geocoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coding: Option<AffineGeoCoding>,
    /// Row-major pixel values
    #[serde(with = "float_vec")]
    pub data: Vec<f64>,
}

impl MemoryRaster {
    /// Create a `float64` band without no-data handling.
    pub fn new(name: impl Into<String>, size: SceneSize, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            description: None,
            size,
            data_type: DataType::Float64,
            kind: RasterKind::Band,
            no_data_value: f64::NAN,
            no_data_value_used: false,
            valid_pixel_expression: None,
            geo_coding: None,
            data,
        }
    }

    fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && !(self.no_data_value_used && value == self.no_data_value)
    }
}

impl Raster for MemoryRaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn size(&self) -> SceneSize {
        self.size
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn kind(&self) -> RasterKind {
        self.kind
    }

    fn no_data_value(&self) -> f64 {
        self.no_data_value
    }

    fn is_no_data_value_used(&self) -> bool {
        self.no_data_value_used
    }

    fn valid_pixel_expression(&self) -> Option<&str> {
        self.valid_pixel_expression.as_deref()
    }

    fn read_pixel(&self, x: u32, y: u32) -> Result<f64> {
        if !self.size.contains(x, y) {
            return Err(Error::InvalidInput(format!(
                "pixel ({x}, {y}) outside {} raster '{}'",
                self.size, self.name
            )));
        }
        let index = y as usize * self.size.width as usize + x as usize;
        self.data.get(index).copied().ok_or_else(|| {
            Error::Dataset(format!(
                "raster '{}' holds {} values, pixel ({x}, {y}) missing",
                self.name,
                self.data.len()
            ))
        })
    }

    fn geo_coding(&self) -> Option<&dyn GeoCoding> {
        self.geo_coding.as_ref().map(|g| g as &dyn GeoCoding)
    }

    fn statistics(&self) -> Result<RasterStatistics> {
        let valid: Vec<f64> = self
            .data
            .iter()
            .copied()
            .filter(|v| self.is_valid(*v))
            .collect();
        if valid.is_empty() {
            return Err(Error::Dataset(format!(
                "raster '{}' has no valid pixels",
                self.name
            )));
        }

        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut histogram = vec![0u64; HISTOGRAM_BINS];
        let range = max - min;
        for v in valid {
            let bin = if range > 0.0 {
                (((v - min) / range) * HISTOGRAM_BINS as f64) as usize
            } else {
                0
            };
            histogram[bin.min(HISTOGRAM_BINS - 1)] += 1;
        }

        Ok(RasterStatistics {
            min,
            max,
            histogram,
        })
    }
}

/// A vector layer that only knows its feature count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryVector {
    /// Layer name
    pub name: String,
    /// Layer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of features
    pub feature_count: usize,
    /// Simulate a layer whose features cannot be read
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unreadable: bool,
}

impl MemoryVector {
    /// Create a readable layer.
    pub fn new(name: impl Into<String>, feature_count: usize) -> Self {
        Self {
            name: name.into(),
            description: None,
            feature_count,
            unreadable: false,
        }
    }
}

impl VectorLayer for MemoryVector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn feature_count(&self) -> Result<usize> {
        if self.unreadable {
            return Err(Error::Dataset(format!(
                "features of '{}' cannot be read",
                self.name
            )));
        }
        Ok(self.feature_count)
    }
}

/// A complete dataset held in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDataset {
    /// Dataset name
    pub name: String,
    /// Dataset description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Product type identifier
    pub product_type: String,
    /// Scene raster size
    pub scene_size: SceneSize,
    /// Sensing start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Sensing stop time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Scene geocoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coding: Option<AffineGeoCoding>,
    /// Flag and index codings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_codings: Vec<Coding>,
    /// Rasters in dataset order
    #[serde(default)]
    pub rasters: Vec<MemoryRaster>,
    /// Vector layers in dataset order
    #[serde(default)]
    pub vectors: Vec<MemoryVector>,
    /// Metadata tree root
    #[serde(default)]
    pub metadata: MetadataElement,
}

impl MemoryDataset {
    /// Create an empty dataset.
    pub fn new(name: impl Into<String>, product_type: impl Into<String>, size: SceneSize) -> Self {
        Self {
            name: name.into(),
            description: None,
            product_type: product_type.into(),
            scene_size: size,
            start_time: None,
            end_time: None,
            geo_coding: None,
            sample_codings: Vec::new(),
            rasters: Vec::new(),
            vectors: Vec::new(),
            metadata: MetadataElement::new("metadata"),
        }
    }

    /// Write the dataset as JSON, readable by [`JsonDatasetReader`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Dataset for MemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn product_type(&self) -> &str {
        &self.product_type
    }

    fn scene_size(&self) -> SceneSize {
        self.scene_size
    }

    fn start_time(&self) -> Option<String> {
        self.start_time.clone()
    }

    fn end_time(&self) -> Option<String> {
        self.end_time.clone()
    }

    fn geo_coding(&self) -> Option<&dyn GeoCoding> {
        self.geo_coding.as_ref().map(|g| g as &dyn GeoCoding)
    }

    fn sample_codings(&self) -> Vec<Coding> {
        self.sample_codings.clone()
    }

    fn rasters(&self) -> Vec<&dyn Raster> {
        self.rasters.iter().map(|r| r as &dyn Raster).collect()
    }

    fn vectors(&self) -> Vec<&dyn VectorLayer> {
        self.vectors.iter().map(|v| v as &dyn VectorLayer).collect()
    }

    fn metadata(&self) -> &MetadataElement {
        &self.metadata
    }
}

/// Opens datasets written by [`MemoryDataset::save`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDatasetReader;

impl DatasetReader for JsonDatasetReader {
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Dataset(format!("cannot read {}: {e}", path.display())))?;
        let dataset: MemoryDataset = serde_json::from_str(&content)
            .map_err(|e| Error::Dataset(format!("cannot decode {}: {e}", path.display())))?;
        Ok(Box::new(dataset))
    }
}
