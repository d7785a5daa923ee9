//! Metadata attribute checks.

use geo_golden_core::{ContentSnapshot, Dataset, Violation, ViolationKind};

use super::ContentCheck;
use crate::metadata_path::MetadataPath;

/// Sampled metadata attributes, addressed by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataCheck;

impl ContentCheck for MetadataCheck {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let root = dataset.metadata();
        let mut violations = Vec::new();

        for (i, sample) in expected.metadata.iter().flatten().enumerate() {
            let subject = format!("metadata[{i}] '{}'", sample.path);
            let resolved = MetadataPath::parse(&sample.path).and_then(|path| path.resolve(root));

            match resolved {
                Ok(attribute) if attribute.value == sample.value => {}
                Ok(attribute) => violations.push(
                    Violation::mismatch(
                        ViolationKind::Metadata,
                        "attribute value differs",
                        format!("'{}'", sample.value),
                        format!("'{}'", attribute.value),
                    )
                    .with_subject(subject),
                ),
                Err(e) => violations.push(
                    Violation::new(ViolationKind::Metadata, e.to_string()).with_subject(subject),
                ),
            }
        }
        violations
    }
}
