//! Model representation

use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::PathBuf;

/// Materialization mode for models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    /// Create a view
    #[default]
    View,
    /// Create a table
    Table,
    /// Incremental table (only process new/changed data)
    Incremental,
    /// Ephemeral model (no database object created)
    Ephemeral,
}

impl std::fmt::Display for Materialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Materialization::View => write!(f, "view"),
            Materialization::Table => write!(f, "table"),
            Materialization::Incremental => write!(f, "incremental"),
            Materialization::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

/// Unique key for incremental models: a single column or a list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniqueKey {
    /// A single column name
    One(String),
    /// Multiple column names
    Many(Vec<String>),
}

impl UniqueKey {
    /// The key columns as a flat list.
    pub fn columns(&self) -> Vec<String> {
        match self {
            UniqueKey::One(c) => vec![c.clone()],
            UniqueKey::Many(cs) => cs.clone(),
        }
    }
}

/// A data test declared in frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestDefinition {
    /// Column combinations must be unique
    Unique(Vec<String>),
    /// Columns must not contain NULLs
    NotNull(Vec<String>),
    /// A column must only contain the listed values
    AcceptedValues {
        column: String,
        values: Vec<serde_yaml::Value>,
    },
}

/// Parsed frontmatter for a model.
///
/// Recognized keys are typed; unknown keys are retained in `extra` and
/// exposed to templates via `config` but have no engine effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (defaults to the file stem)
    #[serde(default)]
    pub name: Option<String>,

    /// Materialization mode
    #[serde(default)]
    pub materialized: Option<Materialization>,

    /// Target schema override
    #[serde(default)]
    pub schema: Option<String>,

    /// Unique key column(s), required for incremental models
    #[serde(default)]
    pub unique_key: Option<UniqueKey>,

    /// Owner of the model
    #[serde(default)]
    pub owner: Option<String>,

    /// Tags for selector matching
    #[serde(default)]
    pub tags: Vec<String>,

    /// Declared data tests
    #[serde(default)]
    pub tests: Vec<TestDefinition>,

    /// Unrecognized frontmatter keys, preserved verbatim
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// A single annotated SQL file, immutable after the project scan.
#[derive(Debug, Clone)]
pub struct Model {
    /// Qualified name (`schema.name`)
    pub name: ModelName,

    /// Path to the source SQL file
    pub path: PathBuf,

    /// Parsed frontmatter
    pub config: ModelConfig,

    /// Raw template body after the frontmatter header
    pub raw_body: String,

    /// Number of source lines consumed by the header, for error positions
    pub body_line_offset: usize,

    /// Reference names harvested from the body (as written, deduped)
    pub refs: BTreeSet<String>,
}

impl Model {
    /// Materialization with fallback to the project default.
    pub fn materialization(&self, default: Materialization) -> Materialization {
        self.config.materialized.unwrap_or(default)
    }

    /// Unique key columns for incremental materialization.
    pub fn unique_key(&self) -> Option<Vec<String>> {
        self.config.unique_key.as_ref().map(UniqueKey::columns)
    }

    /// Whether the model carries a given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.config.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
