//! Configuration types and parsing for driftwood.yml

use crate::error::{CoreError, CoreResult};
use crate::model::Materialization;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main project configuration from driftwood.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory containing model SQL files
    #[serde(default = "default_models_dir")]
    pub models_dir: String,

    /// Directory containing seed CSV/SQL files
    #[serde(default = "default_seeds_dir")]
    pub seeds_dir: String,

    /// Flat directory containing `.star` macro files
    #[serde(default = "default_macros_dir")]
    pub macros_dir: String,

    /// Output directory for compiled SQL
    #[serde(default = "default_target_dir")]
    pub target_dir: String,

    /// Default materialization for models
    #[serde(default)]
    pub materialization: Materialization,

    /// Default schema for models without a directory-derived schema
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Worker-pool size for the build orchestrator
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Per-model execution timeout in seconds (no timeout when absent)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Named environment targets (dev, prod, test, ...)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Per-environment target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database type identifier (duckdb)
    #[serde(rename = "type", default = "default_db_type")]
    pub db_type: String,

    /// Database path (file path or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Schema override for this target
    #[serde(default)]
    pub schema: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            db_type: default_db_type(),
            path: default_db_path(),
            schema: None,
        }
    }
}

fn default_name() -> String {
    "driftwood".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_seeds_dir() -> String {
    "seeds".to_string()
}

fn default_macros_dir() -> String {
    "macros".to_string()
}

fn default_target_dir() -> String {
    "target".to_string()
}

fn default_schema() -> String {
    "main".to_string()
}

fn default_threads() -> usize {
    8
}

fn default_db_type() -> String {
    "duckdb".to_string()
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

impl Default for Config {
    fn default() -> Self {
        // An empty YAML mapping deserializes to all defaults.
        serde_yaml::from_str("{}").unwrap_or_else(|_| unreachable!("default config is valid"))
    }
}

impl Config {
    /// Load from an explicit file path.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
            message: e.to_string(),
        })
    }

    /// Load `driftwood.yml` from a project directory, falling back to
    /// defaults when the file does not exist.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let path = dir.join("driftwood.yml");
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the target configuration for an environment name.
    ///
    /// Unknown environments get the default target (in-memory DuckDB).
    pub fn target_for(&self, env: &str) -> TargetConfig {
        self.targets.get(env).cloned().unwrap_or_default()
    }

    /// Effective schema for an environment.
    pub fn schema_for(&self, env: &str) -> String {
        self.target_for(env)
            .schema
            .unwrap_or_else(|| self.schema.clone())
    }

    /// Models directory as an absolute path under `root`.
    pub fn models_dir_abs(&self, root: &Path) -> PathBuf {
        root.join(&self.models_dir)
    }

    /// Seeds directory as an absolute path under `root`.
    pub fn seeds_dir_abs(&self, root: &Path) -> PathBuf {
        root.join(&self.seeds_dir)
    }

    /// Macros directory as an absolute path under `root`.
    pub fn macros_dir_abs(&self, root: &Path) -> PathBuf {
        root.join(&self.macros_dir)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
