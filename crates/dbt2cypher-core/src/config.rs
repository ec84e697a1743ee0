//! Configuration schema (dbt2cypher.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// All fields are optional; CLI arguments take precedence over the config
/// file, which takes precedence over environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the dbt project directory
    #[serde(default)]
    pub project_path: Option<PathBuf>,

    /// Output file for the generated Cypher script (stdout when unset)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Whether to emit column-level nodes and lineage
    #[serde(default = "default_true")]
    pub include_columns: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: None,
            output: None,
            include_columns: true,
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    IoError(String, String),

    #[error("failed to parse config: {0}")]
    ParseError(String),
}
