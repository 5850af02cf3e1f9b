//! Error types for dw-star

use thiserror::Error;

/// An expression evaluation error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    /// File the expression came from
    pub file: String,
    /// 1-based line of the expression (0 when unknown)
    pub line: usize,
    /// The offending expression, truncated for display
    pub expr: String,
    /// Single-line failure message
    pub message: String,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "{}:{}: error evaluating \"{}\": {}",
                self.file, self.line, self.expr, self.message
            )
        } else {
            write!(
                f,
                "{}: error evaluating \"{}\": {}",
                self.file, self.expr, self.message
            )
        }
    }
}

impl std::error::Error for EvalError {}

impl EvalError {
    /// Build an error, flattening and truncating both the expression and the
    /// message so the result stays a single line.
    pub fn new(file: &str, line: usize, expr: &str, message: &str) -> Self {
        Self {
            file: file.to_string(),
            line,
            expr: clamp(expr),
            message: clamp(message),
        }
    }
}

/// Runtime errors outside expression evaluation.
#[derive(Error, Debug)]
pub enum StarError {
    /// Expression evaluation failure
    #[error("{0}")]
    Eval(#[from] EvalError),

    /// Macro registration failure (reserved or duplicate namespace)
    #[error("[R001] registry: {namespace}: {message}")]
    Registry { namespace: String, message: String },

    /// Macro file load failure (IO, syntax, execution)
    #[error("[R002] failed to load macro {file}: {message}")]
    Load { file: String, message: String },

    /// Internal runtime failure
    #[error("[R003] starlark runtime error: {0}")]
    Internal(String),
}

/// Result type alias for StarError
pub type StarResult<T> = Result<T, StarError>;

/// Flatten to one line and truncate long values with an ellipsis.
pub(crate) fn clamp(value: &str) -> String {
    const MAX: usize = 200;
    let one_line = value
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if one_line.chars().count() <= MAX {
        one_line
    } else {
        let cut: String = one_line.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
