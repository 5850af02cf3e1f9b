//! DuckDB database backend

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Extension trait for converting `duckdb::Error` into `DbResult`.
trait DuckDbResultExt<T> {
    fn to_db_err(self) -> DbResult<T>;
}

impl<T> DuckDbResultExt<T> for Result<T, duckdb::Error> {
    fn to_db_err(self) -> DbResult<T> {
        self.map_err(DbError::from)
    }
}

/// DuckDB backend over a single mutex-guarded connection.
///
/// DuckDB tolerates concurrent statement submission from distinct workers;
/// the mutex serializes access to the shared connection handle.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Open an in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a file-backed database.
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open from a path string, handling the `:memory:` special case.
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            log::warn!("database mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock();
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock();
        conn.execute_batch(sql).to_db_err()
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({sql})"), [], |row| {
                row.get(0)
            })
            .to_db_err()?;
        Ok(count as usize)
    }

    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock();

        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                [schema, table],
                |row| row.get(0),
            )
            .to_db_err()?;
        Ok(count > 0)
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let sql = if replace {
            format!("CREATE OR REPLACE TABLE {name} AS {select}")
        } else {
            format!("CREATE TABLE {name} AS {select}")
        };
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let sql = if replace {
            format!("CREATE OR REPLACE VIEW {name} AS {select}")
        } else {
            format!("CREATE VIEW {name} AS {select}")
        };
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn load_csv(&self, table: &str, path: &str) -> DbResult<()> {
        let escaped = path.replace('\'', "''");
        let sql =
            format!("CREATE OR REPLACE TABLE {table} AS SELECT * FROM read_csv_auto('{escaped}')");
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        // relation type is unknown here, so try both
        let view = self.execute_sync(&format!("DROP VIEW IF EXISTS {name}"));
        let table = self.execute_sync(&format!("DROP TABLE IF EXISTS {name}"));
        match (view, table) {
            (Ok(_), _) | (_, Ok(_)) => Ok(()),
            (Err(e), Err(_)) => Err(e),
        }
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        self.execute_sync(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
