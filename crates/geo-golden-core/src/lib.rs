//! # geo-golden-core
//!
//! Core types for the geo-golden regression harness.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other geo-golden crates. It provides:
//!
//! - Geometry value types (PixelPos, GeoPos, SceneSize)
//! - The `ContentSnapshot` expectation model
//! - Resources and the resource catalog
//! - Test definitions and test results
//! - Dataset accessor traits consumed by the comparator
//! - Environment configuration and error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other geo-golden crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dataset;
pub mod definition;
pub mod error;
pub mod float;
pub mod geometry;
pub mod resource;
pub mod result;
pub mod snapshot;

// Re-export commonly used types
pub use config::EnvironmentConfig;
pub use dataset::{
    Dataset, DatasetReader, GeoCoding, MetadataAttribute, MetadataElement, Raster,
    RasterStatistics, VectorLayer,
};
pub use definition::{validate_name, TestDefinition, COMMAND_PLACEHOLDER};
pub use error::{Error, ErrorPhase, Result};
pub use geometry::{GeoPos, PixelPos, SceneSize};
pub use resource::{Resource, ResourceCatalog, ResourceCategory};
pub use result::{TestResult, TestStatus, Violation, ViolationKind};
pub use snapshot::{
    Coding, CodingSample, ContentSnapshot, DataType, GeoSample, MetadataSample, PixelSample,
    RasterKind, RasterSnapshot, VectorSnapshot, DEFAULT_EPS,
};
