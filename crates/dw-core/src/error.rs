//! Error types for dw-core

use thiserror::Error;

/// Core error type for Driftwood
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Malformed frontmatter header
    #[error("[E003] Bad header in {file}:{line}: {message}")]
    BadHeader {
        file: String,
        line: usize,
        message: String,
    },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Model not found in the catalog
    #[error("[E005] Model not found: {name}")]
    ModelNotFound { name: String },

    /// E006: Duplicate qualified model name
    #[error("[E006] Duplicate model '{name}': defined in {first} and {second}")]
    DuplicateModel {
        name: String,
        first: String,
        second: String,
    },

    /// E007: Reference to a name not present in the catalog
    #[error("[E007] Model '{model}' references unknown model '{reference}'")]
    UnresolvedRef { model: String, reference: String },

    /// E008: Bare reference matches more than one qualified name
    #[error("[E008] Reference '{reference}' in '{model}' is ambiguous: matches {candidates}")]
    AmbiguousRef {
        model: String,
        reference: String,
        candidates: String,
    },

    /// E009: Circular dependency detected
    #[error("[E009] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E010: Invalid selector
    #[error("[E010] Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// E011: IO error
    #[error("[E011] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E012: IO error with file path context
    #[error("[E012] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E013: State store error
    #[error("[E013] State store error: {message}")]
    StateError { message: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Truncate a value for inclusion in an error message.
///
/// Error messages must stay single-line and must not embed arbitrarily long
/// offending values; anything over 200 characters is cut with an ellipsis.
pub fn truncate_for_error(value: &str) -> String {
    const MAX: usize = 200;
    let one_line = value.replace(['\n', '\r'], " ");
    if one_line.chars().count() <= MAX {
        one_line
    } else {
        let cut: String = one_line.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
