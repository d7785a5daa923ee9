//! Output format registry.
//!
//! Maps writer format names to their registered file extensions, the way the
//! processing tool's writer plug-ins declare them.

use std::collections::BTreeMap;

use geo_golden_core::{Error, Result};

/// Format whose fixtures were recorded with its secondary extension.
///
/// Existing golden outputs use that extension, so it must keep winning over
/// the primary one.
pub const SECONDARY_EXTENSION_FORMAT: &str = "GeoTIFF-BigTIFF";

/// Lookup of writer formats.
pub trait FormatRegistry: Send + Sync {
    /// Registered extensions for a format (case-insensitive name), primary first.
    fn extensions(&self, format: &str) -> Option<Vec<String>>;

    /// Extension of files written in `format`.
    ///
    /// Fails with `UnsupportedFormat` if no writer is registered.
    fn output_extension(&self, format: &str) -> Result<String> {
        let extensions = self
            .extensions(format)
            .filter(|exts| !exts.is_empty())
            .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))?;

        if format.eq_ignore_ascii_case(SECONDARY_EXTENSION_FORMAT) && extensions.len() > 1 {
            return Ok(extensions[1].clone());
        }
        Ok(extensions[0].clone())
    }
}

/// Registry backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticFormatRegistry {
    // keyed by upper-cased name
    formats: BTreeMap<String, Vec<String>>,
}

impl StaticFormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the writers shipped with the processing tool.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("BEAM-DIMAP", &[".dim"]);
        registry.register("GeoTIFF", &[".tif", ".tiff"]);
        registry.register("GeoTIFF-BigTIFF", &[".tif", ".tiff", ".btf"]);
        registry.register("NetCDF-CF", &[".nc"]);
        registry.register("NetCDF-BEAM", &[".nc"]);
        registry.register("NetCDF4-CF", &[".nc"]);
        registry.register("NetCDF4-BEAM", &[".nc"]);
        registry.register("ENVI", &[".hdr"]);
        registry.register("HDF5", &[".h5"]);
        registry.register("JP2", &[".jp2"]);
        registry.register("CSV", &[".csv"]);
        registry.register("Generic-Binary-BSQ", &[".bin"]);
        registry
    }

    /// Register (or replace) a format.
    pub fn register<S: AsRef<str>>(&mut self, name: &str, extensions: &[S]) {
        let extensions = extensions
            .iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self.formats.insert(name.to_ascii_uppercase(), extensions);
    }

    /// Number of registered formats.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Whether no formats are registered.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl FormatRegistry for StaticFormatRegistry {
    fn extensions(&self, format: &str) -> Option<Vec<String>> {
        self.formats.get(&format.to_ascii_uppercase()).cloned()
    }
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_extension() {
        let registry = StaticFormatRegistry::with_defaults();
        assert_eq!(registry.output_extension("BEAM-DIMAP").unwrap(), ".dim");
        assert_eq!(registry.output_extension("GeoTIFF").unwrap(), ".tif");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = StaticFormatRegistry::with_defaults();
        assert_eq!(registry.output_extension("beam-dimap").unwrap(), ".dim");
        assert_eq!(registry.output_extension("netcdf4-cf").unwrap(), ".nc");
    }

    #[test]
    fn test_bigtiff_uses_secondary_extension() {
        let registry = StaticFormatRegistry::with_defaults();
        assert_eq!(registry.output_extension("GeoTIFF-BigTIFF").unwrap(), ".tiff");
        assert_eq!(registry.output_extension("geotiff-bigtiff").unwrap(), ".tiff");
    }

    #[test]
    fn test_unknown_format() {
        let registry = StaticFormatRegistry::with_defaults();
        let err = registry.output_extension("PNG").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == "PNG"));
    }

    #[test]
    fn test_register_normalizes_extensions() {
        let mut registry = StaticFormatRegistry::new();
        registry.register("ZNAP", &["znap", ".zip"]);
        assert_eq!(
            registry.extensions("znap"),
            Some(vec![".znap".to_string(), ".zip".to_string()])
        );
        assert_eq!(registry.len(), 1);
    }
}
