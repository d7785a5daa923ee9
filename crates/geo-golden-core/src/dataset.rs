//! Dataset accessor traits.
//!
//! The harness does not decode rasters or vectors itself. It consumes a
//! produced dataset through these accessors, implemented by whatever dataset
//! library backs the processing tool.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Coding, DataType, GeoPos, PixelPos, RasterKind, Result, SceneSize};

/// Forward and inverse geocoding transform.
///
/// Positions outside the transform's domain are reported as NaN components.
pub trait GeoCoding {
    /// Pixel -> geographic position.
    fn geo_pos(&self, pixel: PixelPos) -> GeoPos;

    /// Geographic -> pixel position.
    fn pixel_pos(&self, geo: GeoPos) -> PixelPos;
}

/// Accurate statistics over the valid pixels of a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterStatistics {
    /// Minimum valid value
    pub min: f64,
    /// Maximum valid value
    pub max: f64,
    /// Bin counts over `[min, max]`
    pub histogram: Vec<u64>,
}

/// A single raster (band, tie-point grid, mask, ...).
pub trait Raster {
    /// Raster name.
    fn name(&self) -> &str;

    /// Raster description.
    fn description(&self) -> Option<&str>;

    /// Raster size in pixels.
    fn size(&self) -> SceneSize;

    /// Sample data type.
    fn data_type(&self) -> DataType;

    /// Raster role.
    fn kind(&self) -> RasterKind;

    /// No-data value.
    fn no_data_value(&self) -> f64;

    /// Whether the no-data value is in use.
    fn is_no_data_value_used(&self) -> bool;

    /// Valid-pixel expression, if any.
    fn valid_pixel_expression(&self) -> Option<&str>;

    /// Read the geophysical value at integer pixel indices.
    fn read_pixel(&self, x: u32, y: u32) -> Result<f64>;

    /// Raster-specific geocoding, if any.
    fn geo_coding(&self) -> Option<&dyn GeoCoding>;

    /// Compute statistics over valid pixels.
    fn statistics(&self) -> Result<RasterStatistics>;
}

/// A vector data layer.
pub trait VectorLayer {
    /// Layer name.
    fn name(&self) -> &str;

    /// Layer description.
    fn description(&self) -> Option<&str>;

    /// Number of features. May require I/O and therefore fail.
    fn feature_count(&self) -> Result<usize>;
}

/// Read-only view of a produced dataset.
pub trait Dataset {
    /// Dataset name.
    fn name(&self) -> &str;

    /// Dataset description.
    fn description(&self) -> Option<&str>;

    /// Product type identifier.
    fn product_type(&self) -> &str;

    /// Scene raster size.
    fn scene_size(&self) -> SceneSize;

    /// Sensing start time, formatted by the dataset library.
    fn start_time(&self) -> Option<String>;

    /// Sensing stop time, formatted by the dataset library.
    fn end_time(&self) -> Option<String>;

    /// Scene geocoding, if any.
    fn geo_coding(&self) -> Option<&dyn GeoCoding>;

    /// Flag and index codings.
    fn sample_codings(&self) -> Vec<Coding>;

    /// All rasters, in dataset order.
    fn rasters(&self) -> Vec<&dyn Raster>;

    /// All vector layers, in dataset order.
    fn vectors(&self) -> Vec<&dyn VectorLayer>;

    /// Root of the metadata tree.
    fn metadata(&self) -> &MetadataElement;

    /// Raster by name.
    fn raster(&self, name: &str) -> Option<&dyn Raster> {
        self.rasters().into_iter().find(|r| r.name() == name)
    }

    /// Vector layer by name.
    fn vector(&self, name: &str) -> Option<&dyn VectorLayer> {
        self.vectors().into_iter().find(|v| v.name() == name)
    }
}

/// Opens produced datasets from disk.
pub trait DatasetReader: Send + Sync {
    /// Open the dataset written at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn Dataset>>;
}

/// Leaf attribute of the metadata tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetadataAttribute {
    /// Attribute name
    pub name: String,
    /// Attribute value rendered as text
    pub value: String,
}

/// Element of the metadata tree.
///
/// Sibling elements may share a name; they are told apart by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetadataElement {
    /// Element name
    pub name: String,
    /// Leaf attributes
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
    /// Child elements
    #[serde(default)]
    pub elements: Vec<MetadataElement>,
}

impl MetadataElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute addition.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(MetadataAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder-style child addition.
    pub fn with_element(mut self, element: MetadataElement) -> Self {
        self.elements.push(element);
        self
    }

    /// The `index`-th child element named `name` (0-based, among same-named siblings).
    pub fn element(&self, name: &str, index: usize) -> Option<&MetadataElement> {
        self.elements.iter().filter(|e| e.name == name).nth(index)
    }

    /// Number of child elements named `name`.
    pub fn element_count(&self, name: &str) -> usize {
        self.elements.iter().filter(|e| e.name == name).count()
    }

    /// First attribute named `name`.
    pub fn attribute(&self, name: &str) -> Option<&MetadataAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_named_siblings_are_positional() {
        let root = MetadataElement::new("root")
            .with_element(MetadataElement::new("Global").with_attribute("attr", "first"))
            .with_element(MetadataElement::new("Other"))
            .with_element(MetadataElement::new("Global").with_attribute("attr", "second"));

        assert_eq!(root.element_count("Global"), 2);
        assert_eq!(
            root.element("Global", 1).unwrap().attribute("attr").unwrap().value,
            "second"
        );
        assert!(root.element("Global", 2).is_none());
    }

    #[test]
    fn test_metadata_deserialization_defaults() {
        let element: MetadataElement = serde_json::from_str(r#"{"name": "history"}"#).unwrap();
        assert!(element.attributes.is_empty());
        assert!(element.elements.is_empty());
    }
}
