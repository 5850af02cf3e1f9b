//! dw-sql - SQL parsing and lineage for Driftwood
//!
//! Wraps sqlparser-rs behind a small dialect abstraction and provides the
//! column-level lineage extractor that runs over rendered SQL.

pub mod dialect;
pub mod error;
pub mod lineage;
pub mod parser;

pub use dialect::{quote_qualified, AnsiDialect, DuckDbDialect, SnowflakeDialect, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use lineage::{extract_lineage, ColumnLineage, ColumnSource, Lineage, Schema, Transform};
pub use parser::SqlParser;
