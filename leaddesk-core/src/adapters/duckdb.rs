//! DuckDB repository implementation (local backing store)

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::{params, Connection};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::ports::{validate_identifier, Repository, Row, SelectQuery};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file.
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database, used by tests and previews
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading stays off; JSON is linked in through the cargo feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        let migration_service = MigrationService::new(&conn);
        Ok(migration_service.run_pending()?)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "applied migrations");
        }
        Ok(())
    }

    /// Columns declared as JSON, decoded back into structured values on read
    fn json_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
        let mut stmt = conn.prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_name = ? AND data_type = 'JSON'",
        )?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(columns)
    }

    /// Convert JSON value to DuckDB parameter
    fn json_to_duckdb_param(value: &JsonValue) -> Box<dyn duckdb::ToSql> {
        match value {
            JsonValue::Null => Box::new(None::<String>),
            JsonValue::Bool(b) => Box::new(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Box::new(i)
                } else if let Some(f) = n.as_f64() {
                    Box::new(f)
                } else {
                    Box::new(n.to_string())
                }
            }
            JsonValue::String(s) => Box::new(s.clone()),
            // Arrays and objects land in JSON columns as text
            JsonValue::Array(_) | JsonValue::Object(_) => Box::new(value.to_string()),
        }
    }

    fn get_column_value(row: &duckdb::Row, idx: usize) -> JsonValue {
        use duckdb::types::ValueRef;

        match row.get_ref(idx) {
            Ok(ValueRef::Null) => JsonValue::Null,
            Ok(ValueRef::Boolean(b)) => JsonValue::Bool(b),
            Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Int(i)) => serde_json::json!(i),
            Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
            Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Float(f)) => serde_json::json!(f),
            Ok(ValueRef::Double(f)) => serde_json::json!(f),
            Ok(ValueRef::Text(bytes)) => {
                JsonValue::String(String::from_utf8_lossy(bytes).to_string())
            }
            Ok(ValueRef::Date32(d)) => {
                // Days since epoch
                chrono::DateTime::from_timestamp(i64::from(d) * 86_400, 0)
                    .map(|dt| JsonValue::String(dt.date_naive().to_string()))
                    .unwrap_or(JsonValue::Null)
            }
            Ok(ValueRef::Timestamp(_, ts)) => {
                // Microseconds since epoch
                chrono::DateTime::from_timestamp_micros(ts)
                    .map(|dt| JsonValue::String(dt.to_rfc3339()))
                    .unwrap_or_else(|| serde_json::json!(ts))
            }
            _ => JsonValue::Null,
        }
    }
}

impl Repository for DuckDbRepository {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<String>> {
        validate_identifier(table)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());

        for row in rows {
            let id = match row.get("id") {
                Some(JsonValue::String(id)) => id.clone(),
                _ => Uuid::new_v4().to_string(),
            };

            let mut columns = vec!["id"];
            let mut values: Vec<Box<dyn duckdb::ToSql>> = vec![Box::new(id.clone())];
            for (column, value) in row.iter().filter(|(c, _)| c.as_str() != "id") {
                validate_identifier(column)?;
                columns.push(column.as_str());
                values.push(Self::json_to_duckdb_param(value));
            }

            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders
            );
            let param_refs: Vec<&dyn duckdb::ToSql> = values.iter().map(|b| b.as_ref()).collect();
            tx.execute(&sql, param_refs.as_slice())?;
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }

    fn update_row(&self, table: &str, id: &str, patch: &Row) -> Result<()> {
        validate_identifier(table)?;
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::with_capacity(patch.len());
        let mut values: Vec<Box<dyn duckdb::ToSql>> = Vec::with_capacity(patch.len() + 1);
        for (column, value) in patch {
            validate_identifier(column)?;
            assignments.push(format!("{} = ?", column));
            values.push(Self::json_to_duckdb_param(value));
        }
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE {} SET {} WHERE id = ?", table, assignments.join(", "));
        let param_refs: Vec<&dyn duckdb::ToSql> = values.iter().map(|b| b.as_ref()).collect();

        let conn = self.conn()?;
        let updated = conn.execute(&sql, param_refs.as_slice())?;
        if updated == 0 {
            return Err(Error::not_found(format!("{} row {}", table, id)));
        }
        Ok(())
    }

    fn delete_by_ids(&self, table: &str, ids: &[String]) -> Result<usize> {
        validate_identifier(table)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM {} WHERE id IN ({})", table, placeholders);
        let param_refs: Vec<&dyn duckdb::ToSql> =
            ids.iter().map(|id| id as &dyn duckdb::ToSql).collect();

        let conn = self.conn()?;
        let deleted = conn.execute(&sql, param_refs.as_slice())?;
        Ok(deleted)
    }

    fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>> {
        validate_identifier(table)?;

        let mut sql = format!("SELECT * FROM {}", table);
        let mut values: Vec<Box<dyn duckdb::ToSql>> = Vec::new();

        if !query.filters.is_empty() {
            let mut clauses = Vec::with_capacity(query.filters.len());
            for (column, value) in &query.filters {
                validate_identifier(column)?;
                if value.is_null() {
                    clauses.push(format!("{} IS NULL", column));
                } else {
                    clauses.push(format!("{} = ?", column));
                    values.push(Self::json_to_duckdb_param(value));
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some(order) = &query.order_by {
            validate_identifier(&order.column)?;
            let direction = if order.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(" ORDER BY {} {} NULLS LAST", order.column, direction));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.conn()?;
        let json_columns = Self::json_columns(&conn, table)?;
        let param_refs: Vec<&dyn duckdb::ToSql> = values.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut result_rows = stmt.query(param_refs.as_slice())?;

        let mut raw_rows: Vec<Vec<JsonValue>> = Vec::new();
        let mut column_count = 0;
        while let Some(row) = result_rows.next()? {
            if raw_rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            raw_rows.push((0..column_count).map(|i| Self::get_column_value(row, i)).collect());
        }
        drop(result_rows);

        // Column names are only available once the statement has run
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .map(|(column, value)| {
                        let value = match value {
                            JsonValue::String(s) if json_columns.contains(&column) => {
                                serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
                            }
                            other => other,
                        };
                        (column, value)
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(rows)
    }

    fn count(&self, table: &str) -> Result<i64> {
        validate_identifier(table)?;
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), params![], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn rpc(&self, function: &str, _params: &JsonValue) -> Result<JsonValue> {
        Err(Error::Config(format!(
            "procedure '{}' is only available on the hosted backend",
            function
        )))
    }
}
