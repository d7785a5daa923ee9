//! Authoring of new test definitions from a reference product.
//!
//! The expectation is captured by the snapshot factory. Without an explicit
//! command template the reminder placeholder is written, which keeps the
//! definition from loading until its author fills in the command.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use geo_golden_core::{validate_name, Dataset, Error, Result, TestDefinition, COMMAND_PLACEHOLDER};
use geo_golden_engine::{SnapshotFactory, SnapshotOptions};

/// Everything about a new definition except its expectation.
#[derive(Debug, Clone, Default)]
pub struct DefinitionDraft {
    /// Test name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Tags
    pub tags: BTreeSet<String>,
    /// Command template
    pub command_template: Option<String>,
}

/// Capture `dataset` into a new definition.
pub fn draft_definition(
    dataset: &dyn Dataset,
    draft: DefinitionDraft,
    options: SnapshotOptions,
) -> Result<TestDefinition> {
    validate_name(&draft.name).map_err(Error::InvalidInput)?;

    let expectation = SnapshotFactory::new(options).create(dataset);
    info!(
        "Captured '{}': {} rasters, {} vectors, {} metadata samples",
        dataset.name(),
        expectation.rasters.as_ref().map_or(0, Vec::len),
        expectation.vectors.as_ref().map_or(0, Vec::len),
        expectation.metadata.as_ref().map_or(0, Vec::len)
    );

    Ok(TestDefinition {
        name: draft.name,
        description: draft.description,
        tags: draft.tags,
        command_template: draft
            .command_template
            .unwrap_or_else(|| COMMAND_PLACEHOLDER.to_string()),
        expectation,
    })
}

/// Write `definition` as pretty JSON.
///
/// If `output` is a directory the file is named `test-<name>.json` inside it.
pub fn write_definition(definition: &TestDefinition, output: &Path) -> Result<PathBuf> {
    let path = if output.is_dir() {
        output.join(definition.file_name())
    } else {
        output.to_path_buf()
    };
    std::fs::write(&path, serde_json::to_string_pretty(definition)?)?;
    info!("Wrote definition {}", path.display());
    Ok(path)
}
