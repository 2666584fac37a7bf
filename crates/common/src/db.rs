//! SQLite table fixtures
//!
//! Fixture files live in a directory as `<table>.json`, each holding an array
//! of row objects. Loading a table replaces its contents with those rows;
//! unloading a table deletes every row.

use crate::{FixtureError, FixtureResult};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Table-level fixture storage
pub trait TableStore: Send + Sync {
    /// Replace the contents of each table with its fixture rows
    fn load(&self, tables: &[String]) -> FixtureResult<()>;

    /// Remove all rows from each table
    fn unload(&self, tables: &[String]) -> FixtureResult<()>;
}

/// SQLite-backed table store
#[derive(Clone)]
pub struct SqliteTableStore {
    conn: Arc<Mutex<Connection>>,
    fixtures_dir: PathBuf,
}

impl SqliteTableStore {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>, fixtures_dir: impl Into<PathBuf>) -> FixtureResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        info!("Opened fixture database at {:?}", path.as_ref());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            fixtures_dir: fixtures_dir.into(),
        })
    }

    /// Open in-memory database (for testing)
    pub fn open_memory(fixtures_dir: impl Into<PathBuf>) -> FixtureResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            fixtures_dir: fixtures_dir.into(),
        })
    }

    /// Expose the underlying connection so callers can manage their own schema.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn fixture_path(&self, table: &str) -> PathBuf {
        self.fixtures_dir.join(format!("{}.json", table))
    }

    /// Number of rows currently in a table
    pub fn row_count(&self, table: &str) -> FixtureResult<i64> {
        validate_table_name(table)?;
        let conn = self.conn.lock();
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    fn read_rows(&self, table: &str) -> FixtureResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let path = self.fixture_path(table);
        if !path.exists() {
            debug!("No fixture file for table {}, clearing only", table);
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl TableStore for SqliteTableStore {
    fn load(&self, tables: &[String]) -> FixtureResult<()> {
        for table in tables {
            validate_table_name(table)?;
            let rows = self.read_rows(table)?;

            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;

            for row in &rows {
                let columns: Vec<&String> = row.keys().collect();
                for column in &columns {
                    validate_table_name(column)?;
                }
                let sql = format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    table,
                    columns
                        .iter()
                        .map(|c| format!("\"{}\"", c))
                        .collect::<Vec<_>>()
                        .join(", "),
                    vec!["?"; columns.len()].join(", "),
                );
                let values: Vec<Value> = row.values().map(json_to_sql).collect();
                tx.execute(&sql, params_from_iter(values.iter()))?;
            }

            tx.commit()?;
            debug!("Loaded {} fixture row(s) into {}", rows.len(), table);
        }
        Ok(())
    }

    fn unload(&self, tables: &[String]) -> FixtureResult<()> {
        let conn = self.conn.lock();
        for table in tables {
            validate_table_name(table)?;
            conn.execute(&format!("DELETE FROM \"{}\"", table), [])?;
            debug!("Unloaded table {}", table);
        }
        Ok(())
    }
}

fn validate_table_name(name: &str) -> FixtureResult<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(FixtureError::invalid_argument(format!(
            "invalid table or column name: {:?}",
            name
        )))
    }
}

fn json_to_sql(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}
