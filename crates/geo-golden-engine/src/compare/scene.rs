//! Scene-level checks: identity, size, times, codings and geolocations.

use geo_golden_core::{ContentSnapshot, Dataset, Violation, ViolationKind};

use super::geo::check_geo_samples;
use super::{check_text, ContentCheck};

/// Dataset name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameCheck;

impl ContentCheck for NameCheck {
    fn name(&self) -> &'static str {
        "name"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        check_text(
            ViolationKind::Name,
            "dataset name",
            expected.name.as_deref(),
            Some(dataset.name()),
        )
        .into_iter()
        .collect()
    }
}

/// Product type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductTypeCheck;

impl ContentCheck for ProductTypeCheck {
    fn name(&self) -> &'static str {
        "product_type"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        check_text(
            ViolationKind::ProductType,
            "product type",
            expected.product_type.as_deref(),
            Some(dataset.product_type()),
        )
        .into_iter()
        .collect()
    }
}

/// Dataset description.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionCheck;

impl ContentCheck for DescriptionCheck {
    fn name(&self) -> &'static str {
        "description"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        check_text(
            ViolationKind::Description,
            "dataset description",
            expected.description.as_deref(),
            dataset.description(),
        )
        .into_iter()
        .collect()
    }
}

/// Scene raster size.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneSizeCheck;

impl ContentCheck for SceneSizeCheck {
    fn name(&self) -> &'static str {
        "scene_size"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        match expected.scene_size {
            Some(size) if size != dataset.scene_size() => vec![Violation::mismatch(
                ViolationKind::SceneSize,
                "scene size differs",
                size,
                dataset.scene_size(),
            )],
            _ => Vec::new(),
        }
    }
}

/// Sensing start time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartTimeCheck;

impl ContentCheck for StartTimeCheck {
    fn name(&self) -> &'static str {
        "start_time"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        check_text(
            ViolationKind::StartTime,
            "start time",
            expected.start_time.as_deref(),
            dataset.start_time().as_deref(),
        )
        .into_iter()
        .collect()
    }
}

/// Sensing stop time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndTimeCheck;

impl ContentCheck for EndTimeCheck {
    fn name(&self) -> &'static str {
        "end_time"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        check_text(
            ViolationKind::EndTime,
            "end time",
            expected.end_time.as_deref(),
            dataset.end_time().as_deref(),
        )
        .into_iter()
        .collect()
    }
}

/// Flag and index codings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCodingCheck;

impl ContentCheck for SampleCodingCheck {
    fn name(&self) -> &'static str {
        "sample_codings"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let Some(expected_codings) = expected.sample_codings.as_deref() else {
            return Vec::new();
        };
        if expected_codings.is_empty() {
            return Vec::new();
        }

        let actual_codings = dataset.sample_codings();
        let mut violations = Vec::new();

        for (i, coding) in expected_codings.iter().enumerate() {
            let subject = format!("sampleCoding[{i}] '{}'", coding.name);
            let Some(actual) = actual_codings.iter().find(|c| c.name == coding.name) else {
                violations.push(
                    Violation::new(ViolationKind::SampleCoding, "coding not found")
                        .with_subject(subject),
                );
                continue;
            };

            for sample in &coding.samples {
                let sample_subject = format!("{subject} sample '{}'", sample.name);
                let Some(actual_sample) = actual.samples.iter().find(|s| s.name == sample.name)
                else {
                    violations.push(
                        Violation::new(ViolationKind::SampleCoding, "coding sample not found")
                            .with_subject(sample_subject),
                    );
                    continue;
                };

                if sample.int_value != actual_sample.int_value {
                    violations.push(
                        Violation::mismatch(
                            ViolationKind::SampleCoding,
                            "coding value differs",
                            sample.int_value,
                            actual_sample.int_value,
                        )
                        .with_subject(sample_subject.clone()),
                    );
                }

                if let Some(violation) = check_text(
                    ViolationKind::SampleCoding,
                    "coding description",
                    sample.description.as_deref(),
                    actual_sample.description.as_deref(),
                ) {
                    violations.push(violation.with_subject(sample_subject));
                }
            }
        }
        violations
    }
}

/// Scene-level geolocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoLocationCheck;

impl ContentCheck for GeoLocationCheck {
    fn name(&self) -> &'static str {
        "geo_locations"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let samples = expected.geo_locations.as_deref().unwrap_or_default();
        check_geo_samples(
            ViolationKind::GeoLocation,
            "scene",
            dataset.geo_coding(),
            samples,
        )
    }
}
