//! SQL dialect abstraction.
//!
//! The engine makes no portability claims beyond identifier quoting; a
//! dialect supplies a parser and the quoting rule.

use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    DuckDbDialect as SpDuckDb, GenericDialect, SnowflakeDialect as SpSnowflake,
};
use sqlparser::parser::Parser;

/// A SQL dialect: parsing plus identifier quoting.
pub trait SqlDialect: Send + Sync {
    /// Dialect name for logging
    fn name(&self) -> &'static str;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>>;

    /// Quote a single identifier part
    fn quote_ident(&self, ident: &str) -> String;
}

/// DuckDB dialect (double-quoted identifiers, case preserved).
#[derive(Debug, Default)]
pub struct DuckDbDialect;

impl SqlDialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(&SpDuckDb {}, sql).map_err(|e| SqlError::ParseError(e.to_string()))
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Snowflake dialect (double-quoted identifiers, unquoted folded upper).
#[derive(Debug, Default)]
pub struct SnowflakeDialect;

impl SqlDialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(&SpSnowflake {}, sql).map_err(|e| SqlError::ParseError(e.to_string()))
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Fallback dialect for lineage over rendered SQL from unknown targets.
#[derive(Debug, Default)]
pub struct AnsiDialect;

impl SqlDialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| SqlError::ParseError(e.to_string()))
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Quote a dotted qualified name part-by-part (`a.b` -> `"a"."b"`).
pub fn quote_qualified(name: &str, dialect: &dyn SqlDialect) -> String {
    name.split('.')
        .map(|part| dialect.quote_ident(part))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let d = DuckDbDialect;
        assert_eq!(d.quote_ident("users"), "\"users\"");
        assert_eq!(d.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_qualified() {
        let d = DuckDbDialect;
        assert_eq!(quote_qualified("staging.orders", &d), "\"staging\".\"orders\"");
        assert_eq!(quote_qualified("orders", &d), "\"orders\"");
    }

    #[test]
    fn test_parse_per_dialect() {
        for dialect in [&DuckDbDialect as &dyn SqlDialect, &SnowflakeDialect, &AnsiDialect] {
            let stmts = dialect.parse("SELECT 1").unwrap();
            assert_eq!(stmts.len(), 1, "dialect {}", dialect.name());
        }
    }
}
