//! Error types for dw-template

use crate::lexer::Position;
use dw_star::EvalError;
use thiserror::Error;

/// Which delimiter was left unclosed at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnclosedKind {
    /// `{{` without `}}`
    Expr,
    /// `{*` without `*}`
    Stmt,
}

impl std::fmt::Display for UnclosedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnclosedKind::Expr => write!(f, "expression"),
            UnclosedKind::Stmt => write!(f, "statement"),
        }
    }
}

/// Template errors across lexing, parsing, and rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// T001: delimiter opened but never closed
    #[error("[T001] {file}:{line}:{column}: unclosed {kind} delimiter")]
    Unclosed {
        file: String,
        line: usize,
        column: usize,
        kind: UnclosedKind,
    },

    /// T002: statement body matches no recognized form
    #[error("[T002] {file}:{line}:{column}: invalid statement: {text}")]
    InvalidStatement {
        file: String,
        line: usize,
        column: usize,
        text: String,
    },

    /// T003: block construct opened or closed without its counterpart
    #[error("[T003] {file}:{line}:{column}: unmatched '{kind}' block")]
    UnmatchedBlock {
        file: String,
        line: usize,
        column: usize,
        kind: String,
    },

    /// T004: expression evaluation failed during rendering
    #[error("[T004] {0}")]
    Eval(#[from] EvalError),

    /// T005: for-loop iterator is not iterable
    #[error("[T005] {file}:{line}:{column}: for loop: cannot iterate over {type_name}")]
    CannotIterate {
        file: String,
        line: usize,
        column: usize,
        type_name: String,
    },
}

impl TemplateError {
    pub(crate) fn unclosed(file: &str, pos: Position, kind: UnclosedKind) -> Self {
        TemplateError::Unclosed {
            file: file.to_string(),
            line: pos.line,
            column: pos.column,
            kind,
        }
    }

    pub(crate) fn invalid_statement(file: &str, pos: Position, text: &str) -> Self {
        TemplateError::InvalidStatement {
            file: file.to_string(),
            line: pos.line,
            column: pos.column,
            text: truncate(text),
        }
    }

    pub(crate) fn unmatched(file: &str, pos: Position, kind: &str) -> Self {
        TemplateError::UnmatchedBlock {
            file: file.to_string(),
            line: pos.line,
            column: pos.column,
            kind: kind.to_string(),
        }
    }
}

fn truncate(value: &str) -> String {
    const MAX: usize = 200;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let cut: String = value.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

/// Result type alias for TemplateError
pub type TemplateResult<T> = Result<T, TemplateError>;
