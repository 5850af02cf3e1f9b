//! Error types for dw-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Feature not available on this backend (D004)
    #[error("[D004] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        let message = err.to_string();
        if is_table_not_found(&message) {
            DbError::TableNotFound(message)
        } else {
            DbError::ExecutionError(message)
        }
    }
}

fn is_table_not_found(message: &str) -> bool {
    message.contains("Table with name")
        || message.contains("View with name")
        || message.contains("Table or view with name")
        || (message.contains("Catalog Error") && message.contains("does not exist"))
}
