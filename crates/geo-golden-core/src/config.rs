//! Environment configuration loaded from `config.json`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File name of the environment configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Environment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentConfig {
    /// Number of run directories kept in `results/`, including the new one
    pub rolling_results: usize,
    /// Delete a test's output when it succeeds
    pub delete_result_after_success: bool,
    /// Open the HTML report when the run finishes
    pub open_report: bool,
    /// Output format injected when a template has no `-f` flag
    pub default_target_format: String,
    /// Deadline for a single tool invocation, in seconds (none = wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,
    /// Additional writer formats: name -> registered extensions
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub formats: BTreeMap<String, Vec<String>>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            rolling_results: 10,
            delete_result_after_success: false,
            open_report: false,
            default_target_format: "BEAM-DIMAP".to_string(),
            tool_timeout_secs: None,
            formats: BTreeMap::new(),
        }
    }
}

impl EnvironmentConfig {
    /// Load configuration from the environment root.
    ///
    /// A missing `config.json` yields the defaults.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EnvironmentConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.rolling_results == 0 {
            return Err(Error::Config("rollingResults must be > 0".to_string()));
        }

        if self.default_target_format.trim().is_empty() {
            return Err(Error::Config(
                "defaultTargetFormat cannot be empty".to_string(),
            ));
        }

        if self.tool_timeout_secs == Some(0) {
            return Err(Error::Config("toolTimeoutSecs must be > 0".to_string()));
        }

        for (name, extensions) in &self.formats {
            if extensions.is_empty() {
                return Err(Error::Config(format!(
                    "format '{name}' must declare at least one extension"
                )));
            }
        }

        Ok(())
    }

    /// Tool invocation deadline.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}
