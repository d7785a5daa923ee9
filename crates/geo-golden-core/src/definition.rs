//! Test definitions.
//!
//! One JSON document per test, loaded from `tests/test-*.json` in the
//! environment root. Definitions are immutable after loading.

use std::collections::BTreeSet;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ContentSnapshot, Error, Result};

/// Reminder value written into freshly generated definitions.
///
/// A definition still carrying it has not been completed by its author and is
/// rejected at load time.
pub const COMMAND_PLACEHOLDER: &str = "<please specify the command>";

/// A single regression test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    /// Unique, filesystem-safe test name
    pub name: String,
    /// Optional human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form tags used for selection
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Command line with `{CATEGORY:id}` resource tokens
    pub command_template: String,
    /// Expected content of the produced dataset
    pub expectation: ContentSnapshot,
}

impl TestDefinition {
    /// Load and validate a definition from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let definition: TestDefinition =
            serde_json::from_str(&content).map_err(|e| Error::InvalidDefinition {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        definition
            .validate()
            .map_err(|reason| Error::InvalidDefinition {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(definition)
    }

    /// Check the definition invariants, returning the reason on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_name(&self.name)?;
        if self.command_template.trim().is_empty() {
            return Err("commandTemplate is empty".to_string());
        }
        if self.command_template.trim() == COMMAND_PLACEHOLDER {
            return Err("commandTemplate still holds the placeholder value".to_string());
        }
        Ok(())
    }

    /// Whether the definition carries any of the given tags.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }

    /// File name this definition is stored under.
    pub fn file_name(&self) -> String {
        format!("test-{}.json", self.name)
    }
}

/// Check that `name` can be used as a test name.
pub fn validate_name(name: &str) -> std::result::Result<(), String> {
    if is_valid_path_segment(name) {
        Ok(())
    } else {
        Err(format!("name '{name}' is not a valid file name segment"))
    }
}

/// A name usable as a single path component on every platform.
fn is_valid_path_segment(name: &str) -> bool {
    const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    !name.is_empty()
        && name.trim() == name
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c.is_control() || FORBIDDEN.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, command: &str) -> TestDefinition {
        TestDefinition {
            name: name.to_string(),
            description: None,
            tags: BTreeSet::new(),
            command_template: command.to_string(),
            expectation: ContentSnapshot::default(),
        }
    }

    #[test]
    fn test_valid_definition() {
        assert!(definition("subset_MER_RR", "gpt Subset -Ssource={SRC:MER_RR}")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", " padded", "a/b", "a\\b", "..", "what?", "tab\tname"] {
            assert!(
                definition(name, "gpt").validate().is_err(),
                "name {name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_placeholder_rejected() {
        let err = definition("t", COMMAND_PLACEHOLDER).validate().unwrap_err();
        assert!(err.contains("placeholder"));
    }

    #[test]
    fn test_missing_expectation_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-a.json");
        std::fs::write(&path, r#"{"name": "a", "commandTemplate": "gpt"}"#).unwrap();
        let err = TestDefinition::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-a.json");
        std::fs::write(
            &path,
            r#"{
                "name": "a",
                "tags": ["ABC", "hasi"],
                "commandTemplate": "gpt Subset -Ssource={SRC:x}",
                "expectation": {"name": "subset_of_x"}
            }"#,
        )
        .unwrap();

        let def = TestDefinition::from_file(&path).unwrap();
        assert_eq!(def.name, "a");
        assert!(def.has_any_tag(&["hasi".to_string()]));
        assert!(!def.has_any_tag(&["hundi".to_string()]));
        assert_eq!(def.expectation.name.as_deref(), Some("subset_of_x"));
        assert_eq!(def.file_name(), "test-a.json");
    }
}
