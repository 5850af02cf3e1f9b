//! Error types for dw-sql

use thiserror::Error;

/// SQL parsing and lineage errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error: {0}")]
    ParseError(String),

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unsupported SQL statement (S003)
    #[error("[S003] Unsupported SQL statement type: {0}")]
    UnsupportedStatement(String),

    /// Unknown SQL dialect (S004)
    #[error("[S004] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Lineage extraction failure (S005)
    #[error("[S005] Lineage extraction failed: {0}")]
    Extract(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
