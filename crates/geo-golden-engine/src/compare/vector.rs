//! Vector layer checks.

use geo_golden_core::{ContentSnapshot, Dataset, Violation, ViolationKind};

use super::{check_text, ContentCheck};

/// Expected vector layers: presence, description and feature count.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorCheck;

impl ContentCheck for VectorCheck {
    fn name(&self) -> &'static str {
        "vectors"
    }

    fn check(&self, dataset: &dyn Dataset, expected: &ContentSnapshot) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (i, expected_vector) in expected.vectors.iter().flatten().enumerate() {
            let subject = format!("vector[{i}] '{}'", expected_vector.name);
            let Some(layer) = dataset.vector(&expected_vector.name) else {
                violations.push(
                    Violation::new(ViolationKind::Vector, "vector layer not found")
                        .with_subject(subject),
                );
                continue;
            };

            if let Some(v) = check_text(
                ViolationKind::Vector,
                "description",
                expected_vector.description.as_deref(),
                layer.description(),
            ) {
                violations.push(v.with_subject(subject.clone()));
            }

            if let Some(count) = expected_vector.feature_count {
                match layer.feature_count() {
                    Ok(actual) if actual == count => {}
                    Ok(actual) => violations.push(
                        Violation::mismatch(
                            ViolationKind::Vector,
                            "feature count differs",
                            count,
                            actual,
                        )
                        .with_subject(subject),
                    ),
                    Err(e) => violations.push(
                        Violation::new(
                            ViolationKind::Vector,
                            format!("features could not be read: {e}"),
                        )
                        .with_subject(subject),
                    ),
                }
            }
        }
        violations
    }
}
