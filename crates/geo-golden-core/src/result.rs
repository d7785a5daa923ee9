//! Per-test results and comparison violations.

use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Outcome of one executed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// No exception and no violations
    Success,
    /// Infrastructure failure (construction, tool crash, I/O)
    Failure,
    /// One or more structural mismatches
    Error,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TestStatus::Success => "SUCCESS",
            TestStatus::Failure => "FAILURE",
            TestStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Which comparator check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Dataset name
    Name,
    /// Product type
    ProductType,
    /// Dataset description
    Description,
    /// Scene size
    SceneSize,
    /// Start time
    StartTime,
    /// End time
    EndTime,
    /// Flag or index coding
    SampleCoding,
    /// Scene-level geolocation
    GeoLocation,
    /// Raster property, pixel, geolocation or statistic
    Raster,
    /// Vector layer
    Vector,
    /// Metadata attribute
    Metadata,
}

/// A single recorded mismatch between expected and actual content.
///
/// Carries enough context to be read on its own in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Check category
    pub kind: ViolationKind,
    /// What was checked, e.g. `raster[2] 'radiance_3' pixel (1.5, 2.5)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Short description of the mismatch
    pub message: String,
    /// Expected value rendered as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Actual value rendered as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Tolerance applied, for numeric comparisons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

impl Violation {
    /// Create a violation with a message only.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: None,
            message: message.into(),
            expected: None,
            actual: None,
            tolerance: None,
        }
    }

    /// Create an expected/actual mismatch.
    pub fn mismatch(
        kind: ViolationKind,
        message: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self {
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            ..Self::new(kind, message)
        }
    }

    /// Attach the subject that was checked.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach the numeric tolerance that was applied.
    pub fn with_tolerance(mut self, eps: f64) -> Self {
        self.tolerance = Some(eps);
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(subject) = &self.subject {
            write!(f, "{subject}: ")?;
        }
        f.write_str(&self.message)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {expected}, actual {actual}")?;
            if let Some(eps) = self.tolerance {
                write!(f, ", eps {eps:e}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Result of one executed test.
///
/// Status only ever moves away from `Success`: an exception forces `Failure`,
/// a violation (without exception) forces `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Test name
    pub test_name: String,
    /// Test description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tool execution wall-clock time in milliseconds
    #[serde(rename = "durationMs", with = "duration_ms")]
    #[schemars(with = "u64")]
    pub duration: Duration,
    /// Retained product location, if any
    pub target_path: Option<PathBuf>,
    status: TestStatus,
    /// Infrastructure failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    /// Structural mismatches
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl TestResult {
    /// Create a successful, empty result.
    pub fn new(test_name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            test_name: test_name.into(),
            description,
            duration: Duration::ZERO,
            target_path: None,
            status: TestStatus::Success,
            exception: None,
            violations: Vec::new(),
        }
    }

    /// Current status.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Record an infrastructure failure. Forces `Failure`.
    pub fn record_exception(&mut self, error: &Error) {
        self.exception = Some(error.to_string());
        self.status = TestStatus::Failure;
    }

    /// Record comparison violations. Forces `Error` unless already `Failure`.
    pub fn record_violations(&mut self, violations: Vec<Violation>) {
        if violations.is_empty() {
            return;
        }
        self.violations.extend(violations);
        if self.status != TestStatus::Failure {
            self.status = TestStatus::Error;
        }
    }

    /// Whether the test passed.
    pub fn is_success(&self) -> bool {
        self.status == TestStatus::Success
    }
}
