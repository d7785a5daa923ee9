//! The test environment: configuration, resources and test definitions.
//!
//! ```text
//! <root>/
//!   config.json
//!   source-products.json, auxiliary-data.json, test-graphs.json
//!   tests/test-<name>.json
//!   results/
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use geo_golden_core::{EnvironmentConfig, Error, ResourceCatalog, Result, TestDefinition};
use geo_golden_engine::{CommandContext, StaticFormatRegistry};

/// Directory holding test definitions.
pub const TESTS_DIR: &str = "tests";

/// Directory holding run directories.
pub const RESULTS_DIR: &str = "results";

lazy_static! {
    static ref DEFINITION_FILE: Regex = Regex::new(r"^test-.+\.json$").unwrap();
}

/// A loaded environment. Immutable once loaded.
#[derive(Debug)]
pub struct Environment {
    root: PathBuf,
    config: EnvironmentConfig,
    catalog: ResourceCatalog,
    registry: StaticFormatRegistry,
    definitions: Vec<TestDefinition>,
}

impl Environment {
    /// Load an environment from its root directory.
    ///
    /// Every failure here is fatal to the run: a bad configuration, a
    /// malformed resource list, an unreadable or invalid definition, or two
    /// definitions with the same name.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "environment root {} is not a directory",
                root.display()
            )));
        }
        let root = root.canonicalize()?;
        info!("Loading environment from {}", root.display());

        let config = EnvironmentConfig::load(&root)?;
        let catalog = ResourceCatalog::load(&root)?;
        debug!("Loaded {} resources", catalog.len());

        let mut registry = StaticFormatRegistry::with_defaults();
        for (name, extensions) in &config.formats {
            registry.register(name, extensions.as_slice());
        }

        let definitions = load_definitions(&root.join(TESTS_DIR))?;
        info!("Loaded {} test definitions", definitions.len());

        let results = root.join(RESULTS_DIR);
        if !results.exists() {
            std::fs::create_dir_all(&results)?;
            debug!("Created {}", results.display());
        }

        Ok(Self {
            root,
            config,
            catalog,
            registry,
            definitions,
        })
    }

    /// Environment root (absolute).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Environment configuration.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Resource catalog.
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Writer formats known to the environment.
    pub fn registry(&self) -> &StaticFormatRegistry {
        &self.registry
    }

    /// All definitions, sorted by name.
    pub fn definitions(&self) -> &[TestDefinition] {
        &self.definitions
    }

    /// Directory holding run directories.
    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    /// Context handed to the command builder.
    pub fn command_context(&self) -> CommandContext<'_> {
        CommandContext {
            catalog: &self.catalog,
            registry: &self.registry,
            default_format: &self.config.default_target_format,
            root: &self.root,
        }
    }
}

/// Load every `test-*.json` file of a directory, sorted by test name.
fn load_definitions(dir: &Path) -> Result<Vec<TestDefinition>> {
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "test definition directory {} not found",
            dir.display()
        )));
    }

    let mut by_name: BTreeMap<String, TestDefinition> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_definition = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| DEFINITION_FILE.is_match(n));
        if !is_definition {
            continue;
        }

        let definition = TestDefinition::from_file(&path)?;
        debug!("Loaded test '{}' from {}", definition.name, path.display());
        if by_name.contains_key(&definition.name) {
            return Err(Error::DuplicateTestName(definition.name));
        }
        by_name.insert(definition.name.clone(), definition);
    }

    Ok(by_name.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn definition_json(name: &str) -> String {
        format!(r#"{{"name": "{name}", "commandTemplate": "gpt Subset", "expectation": {{}}}}"#)
    }

    fn env_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(TESTS_DIR)).unwrap();
        dir
    }

    #[test]
    fn test_loads_sorted_definitions_and_creates_results() {
        let dir = env_dir();
        let tests = dir.path().join(TESTS_DIR);
        fs::write(tests.join("test-b.json"), definition_json("beta")).unwrap();
        fs::write(tests.join("test-a.json"), definition_json("alpha")).unwrap();
        fs::write(tests.join("notes.json"), "not a definition").unwrap();

        let env = Environment::load(dir.path()).unwrap();

        let names: Vec<&str> = env.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(dir.path().join(RESULTS_DIR).is_dir());
        assert_eq!(env.config(), &EnvironmentConfig::default());
        assert!(env.catalog().is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = env_dir();
        let tests = dir.path().join(TESTS_DIR);
        fs::write(tests.join("test-1.json"), definition_json("same")).unwrap();
        fs::write(tests.join("test-2.json"), definition_json("same")).unwrap();

        let err = Environment::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DuplicateTestName(ref n) if n == "same"));
    }

    #[test]
    fn test_invalid_definition_is_fatal() {
        let dir = env_dir();
        fs::write(dir.path().join(TESTS_DIR).join("test-x.json"), "{").unwrap();
        assert!(matches!(
            Environment::load(dir.path()),
            Err(Error::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_missing_tests_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Environment::load(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_formats_registered() {
        let dir = env_dir();
        fs::write(
            dir.path().join("config.json"),
            r#"{"defaultTargetFormat": "JSON-Product", "formats": {"JSON-Product": [".json"]}}"#,
        )
        .unwrap();

        let env = Environment::load(dir.path()).unwrap();

        use geo_golden_engine::FormatRegistry;
        assert_eq!(env.registry().output_extension("json-product").unwrap(), ".json");
        assert_eq!(env.command_context().default_format, "JSON-Product");
    }
}
