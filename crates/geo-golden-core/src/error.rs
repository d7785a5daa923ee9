//! Error types for the geo-golden harness.

use std::path::PathBuf;

use thiserror::Error;

use crate::ResourceCategory;

/// Main error type for geo-golden operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource id not present in its category's catalog
    #[error("Unknown resource: {category}:{id}")]
    UnknownResource {
        /// Category the token referred to
        category: ResourceCategory,
        /// Resource id that could not be found
        id: String,
    },

    /// Category token is not one of SRC, AUX, GPH
    #[error("Unknown resource category: {0}")]
    UnknownCategory(String),

    /// Command token is not of the form `{CATEGORY:id}`
    #[error("Malformed command token: {0}")]
    MalformedToken(String),

    /// No writer plug-in registered for the requested output format
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Two test definitions share the same name
    #[error("Duplicate test name: {0}")]
    DuplicateTestName(String),

    /// A test definition file failed validation
    #[error("Invalid test definition {path}: {reason}")]
    InvalidDefinition {
        /// File the definition was loaded from
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// External processing tool failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// External processing tool did not finish within its deadline
    #[error("Execution timed out after {0}ms")]
    Timeout(u64),

    /// Produced dataset could not be opened or read
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Report files could not be written
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Run phase an error belongs to.
///
/// Initialization and reporting errors are fatal to the run; construction and
/// execution errors are scoped to a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Environment, catalog or definition loading
    Initialization,
    /// Command construction for one test
    Construction,
    /// Tool invocation or product reading for one test
    Execution,
    /// Writing the report files
    Reporting,
}

impl Error {
    /// Classify this error by the run phase that produces it.
    pub fn phase(&self) -> ErrorPhase {
        match self {
            Error::UnknownResource { .. }
            | Error::UnknownCategory(_)
            | Error::MalformedToken(_)
            | Error::UnsupportedFormat(_)
            | Error::InvalidInput(_) => ErrorPhase::Construction,
            Error::DuplicateTestName(_)
            | Error::InvalidDefinition { .. }
            | Error::Config(_)
            | Error::Serialization(_) => ErrorPhase::Initialization,
            Error::Execution(_) | Error::Timeout(_) | Error::Dataset(_) | Error::Io(_) => {
                ErrorPhase::Execution
            }
            Error::Report(_) => ErrorPhase::Reporting,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_names_category_and_id() {
        let err = Error::UnknownResource {
            category: ResourceCategory::Src,
            id: "MER_RR".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown resource: SRC:MER_RR");
        assert_eq!(err.phase(), ErrorPhase::Construction);
    }

    #[test]
    fn test_unknown_category_error() {
        let err = Error::UnknownCategory("XYZ".to_string());
        assert_eq!(err.to_string(), "Unknown resource category: XYZ");
    }

    #[test]
    fn test_malformed_token_error() {
        let err = Error::MalformedToken("{SRC}".to_string());
        assert_eq!(err.to_string(), "Malformed command token: {SRC}");
    }

    #[test]
    fn test_timeout_error() {
        let err = Error::Timeout(5000);
        assert_eq!(err.to_string(), "Execution timed out after 5000ms");
        assert_eq!(err.phase(), ErrorPhase::Execution);
    }

    #[test]
    fn test_duplicate_name_is_initialization() {
        let err = Error::DuplicateTestName("test1".to_string());
        assert_eq!(err.phase(), ErrorPhase::Initialization);
    }

    #[test]
    fn test_report_error_phase() {
        let err = Error::Report("disk full".to_string());
        assert_eq!(err.phase(), ErrorPhase::Reporting);
        assert_eq!(err.to_string(), "Report error: disk full");
    }

    #[test]
    fn test_invalid_definition_error() {
        let err = Error::InvalidDefinition {
            path: PathBuf::from("tests/test-a.json"),
            reason: "name is empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid test definition tests/test-a.json: name is empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
