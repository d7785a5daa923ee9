//! # geo-golden-engine
//!
//! The expectation-capture, command-templating and comparison engine.
//!
//! This crate provides:
//! - Command construction from `{CATEGORY:id}` templates
//! - Output format resolution through a format registry
//! - Tool invocation with timing, deadline and cache reclamation
//! - The structural comparator and its ordered checks
//! - Deterministic snapshot capture for authoring new fixtures
//! - An in-memory dataset implementing the core accessor traits
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on geo-golden-core only.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod compare;
pub mod factory;
pub mod format;
pub mod memory;
pub mod metadata_path;
pub mod random;
pub mod runner;

// Re-export commonly used types
pub use command::{tokenize, BuiltCommand, CommandBuilder, CommandContext};
pub use compare::{fuzzy_equals, Comparator, ContentCheck};
pub use factory::{SnapshotFactory, SnapshotOptions, SourceFactory};
pub use format::{FormatRegistry, StaticFormatRegistry};
pub use memory::{AffineGeoCoding, JsonDatasetReader, MemoryDataset, MemoryRaster, MemoryVector};
pub use metadata_path::{MetadataPath, PathSegment};
pub use random::{RandomSource, Xorshift64};
pub use runner::{Cancellation, Execution, ProcessingTool, ToolRunner};
