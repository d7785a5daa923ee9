//! # geo-golden-runner
//!
//! Run orchestration for the geo-golden regression harness.
//!
//! This crate provides:
//! - Environment loading (configuration, resources, test definitions)
//! - Test selection by name and tag
//! - Run directories and the rolling retention policy
//! - Sequential execution, comparison and output retention
//! - JSON and HTML run reports
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on geo-golden-core
//! and geo-golden-engine to drive complete validation runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod environment;
pub mod filter;
pub mod orchestrator;
pub mod report;
pub mod retention;

// Re-export commonly used types
pub use environment::Environment;
pub use filter::TestFilter;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use report::{ReportFiles, RunReport};
pub use retention::RetentionPolicy;
