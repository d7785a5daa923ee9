//! Geometry types for image and geographic coordinates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Position in image coordinates (x = column, y = row).
///
/// Coordinates are continuous; the centre of the upper-left pixel is `(0.5, 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PixelPos {
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
}

impl PixelPos {
    /// Create a new pixel position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Integer pixel indices containing this position.
    ///
    /// Returns `None` for negative or non-finite coordinates.
    pub fn to_index(&self) -> Option<(u32, u32)> {
        if !self.x.is_finite() || !self.y.is_finite() || self.x < 0.0 || self.y < 0.0 {
            return None;
        }
        Some((self.x.floor() as u32, self.y.floor() as u32))
    }
}

impl std::fmt::Display for PixelPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPos {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl GeoPos {
    /// Create a new geographic position.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// A position is valid when both components are finite.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl std::fmt::Display for GeoPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(lat={}, lon={})", self.lat, self.lon)
    }
}

/// Raster or scene size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SceneSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SceneSize {
    /// Create a new size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (width * height).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check whether integer pixel indices fall inside this size.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

impl std::fmt::Display for SceneSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
