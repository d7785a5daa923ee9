//! Structural comparison of a produced dataset against a `ContentSnapshot`.
//!
//! The comparator runs an ordered list of independent checks. Every check
//! returns the violations it found; none of them stops the sequence, and a
//! check whose snapshot field is absent (or empty) contributes nothing.

pub mod fuzzy;
mod geo;
pub mod metadata;
pub mod raster;
pub mod scene;
pub mod vector;

use tracing::debug;

use geo_golden_core::{ContentSnapshot, Dataset, Violation};

pub use fuzzy::{fuzzy_equals, STATISTICS_EPS};
pub use metadata::MetadataCheck;
pub use raster::RasterCheck;
pub use scene::{
    DescriptionCheck, EndTimeCheck, GeoLocationCheck, NameCheck, ProductTypeCheck,
    SampleCodingCheck, SceneSizeCheck, StartTimeCheck,
};
pub use vector::VectorCheck;

/// A single comparison step.
pub trait ContentCheck: Send + Sync {
    /// Check name for debugging/logging.
    fn name(&self) -> &'static str;

    /// Compare one aspect of `dataset` against `expected`.
    ///
    /// Returns an empty list when the aspect matches or is not specified.
    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation>;
}

/// Runs content checks in a fixed order and collects all violations.
pub struct Comparator {
    checks: Vec<Box<dyn ContentCheck>>,
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.checks.iter().map(|c| c.name()).collect();
        f.debug_struct("Comparator").field("checks", &names).finish()
    }
}

impl Comparator {
    /// Create a comparator with the standard check order:
    /// name, product type, description, scene size, start time, end time,
    /// sample codings, scene geolocations, rasters, vectors, metadata.
    pub fn new() -> Self {
        Self::with_checks(vec![
            Box::new(NameCheck),
            Box::new(ProductTypeCheck),
            Box::new(DescriptionCheck),
            Box::new(SceneSizeCheck),
            Box::new(StartTimeCheck),
            Box::new(EndTimeCheck),
            Box::new(SampleCodingCheck),
            Box::new(GeoLocationCheck),
            Box::new(RasterCheck),
            Box::new(VectorCheck),
            Box::new(MetadataCheck),
        ])
    }

    /// Create a comparator with a custom check list.
    pub fn with_checks(checks: Vec<Box<dyn ContentCheck>>) -> Self {
        Self { checks }
    }

    /// Names of the configured checks, in execution order.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Compare a dataset against its expectation.
    pub fn compare(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let mut violations = Vec::new();
        for check in &self.checks {
            let found = check.check(dataset, expected);
            debug!("{} check: {} violation(s)", check.name(), found.len());
            violations.extend(found);
        }
        violations
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare an optional expected text value.
pub(crate) fn check_text(
    kind: geo_golden_core::ViolationKind,
    what: &str,
    expected: Option<&str>,
    actual: Option<&str>,
) -> Option<Violation> {
    let expected = expected?;
    if Some(expected) == actual {
        return None;
    }
    Some(Violation::mismatch(
        kind,
        format!("{what} differs"),
        format!("'{expected}'"),
        actual.map_or_else(|| "<none>".to_string(), |a| format!("'{a}'")),
    ))
}
