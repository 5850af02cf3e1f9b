//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Database abstraction for Driftwood: a thin submitter of SQL over a
/// connection.
///
/// Implementations must be Send + Sync; the orchestrator submits from
/// multiple workers concurrently.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returning affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Create (or replace) a table from a SELECT statement
    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Create (or replace) a view from a SELECT statement
    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Count the rows a query yields
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Load a CSV file into a table
    async fn load_csv(&self, table: &str, path: &str) -> DbResult<()>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Backend identifier for logging
    fn db_type(&self) -> &'static str;
}
