//! SQLite connection implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use sitevault_core::{
    ColumnInfo, ColumnMeta, Connection, QueryResult, Result, Row, SchemaIntrospection,
    StatementResult, TableInfo, Transaction, Value, VaultError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
    database_name: String,
    closed: AtomicBool,
}

impl SqliteConnection {
    /// Open a SQLite database, creating the file if needed
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open an existing SQLite database; a missing file is a connection error
    pub fn open_existing(path: &str) -> Result<Self> {
        Self::open_with(path, false)
    }

    fn open_with(path: &str, create: bool) -> Result<Self> {
        tracing::info!(path = %path, create, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                VaultError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent() {
                    if !parent.exists() {
                        return Err(VaultError::Connection(format!(
                            "Parent directory does not exist: {}",
                            parent.display()
                        )));
                    }
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                VaultError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| VaultError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        // In-memory databases answer "memory" here, which is fine.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| VaultError::Connection(format!("Failed to set journal mode: {}", e)))?;

        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| VaultError::Connection(format!("Failed to set synchronous mode: {}", e)))?;

        let database_name = Self::database_name_for(path);
        tracing::info!(path = %expanded_path, database = %database_name, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            database_name,
            closed: AtomicBool::new(false),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match std::env::var_os("HOME") {
                Some(home) => std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string(),
                None => {
                    return Err(VaultError::Configuration(
                        "Unable to determine HOME directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(VaultError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(VaultError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// The file stem of the database path, or "main" for in-memory and URI databases
    fn database_name_for(path: &str) -> String {
        if path == ":memory:" || path.starts_with("file:") {
            return "main".to_string();
        }
        std::path::Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "main".to_string())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(VaultError::Connection("SQLite connection is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn database_name(&self) -> Option<String> {
        Some(self.database_name.clone())
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        run_statement(&conn, sql, params)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.ensure_open()?;
        tracing::debug!("beginning SQLite transaction");
        {
            let conn = self.conn.lock();
            // DEFERRED takes the write lock on the first write.
            conn.execute_batch("BEGIN DEFERRED")
                .map_err(|e| VaultError::Query(format!("Failed to begin transaction: {}", e)))?;
        }
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            committed: false,
            rolled_back: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!(database = %self.database_name, "closing SQLite connection");
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for SqliteConnection {
    /// Tables in creation order (`sqlite_master` rowid), skipping SQLite's internal tables
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        tracing::debug!("listing tables from sqlite_master");
        let result = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
                &[],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str()))
            .map(|name| TableInfo {
                schema: Some("main".to_string()),
                ..TableInfo::base_table(name)
            })
            .collect();

        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    /// SQLite table names are case-insensitive
    #[tracing::instrument(skip(self))]
    async fn table_exists(&self, _schema: Option<&str>, table: &str) -> Result<bool> {
        let result = self
            .query(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
                &[Value::String(table.to_string())],
            )
            .await?;
        Ok(result.has_rows())
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, _schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        tracing::trace!(table = %table, "fetching column information");
        let result = self
            .query(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)",
                &[Value::String(table.to_string())],
            )
            .await?;

        let pk_count = result
            .rows
            .iter()
            .filter(|row| row.get(5).and_then(|v| v.as_i64()).unwrap_or(0) > 0)
            .count();

        let columns = result
            .rows
            .iter()
            .map(|row| {
                let ordinal = row.get(0).and_then(|v| v.as_i64()).unwrap_or(0) as usize;
                let name = row
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let data_type = row
                    .get(2)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let nullable = row.get(3).and_then(|v| v.as_i64()).unwrap_or(0) == 0;
                let default_value = row
                    .get(4)
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string());
                let is_primary_key = row.get(5).and_then(|v| v.as_i64()).unwrap_or(0) > 0;
                // Only a lone INTEGER PRIMARY KEY aliases the rowid.
                let is_auto_increment =
                    is_primary_key && pk_count == 1 && data_type.eq_ignore_ascii_case("INTEGER");

                ColumnInfo {
                    name,
                    ordinal,
                    data_type,
                    nullable,
                    default_value,
                    is_primary_key,
                    is_auto_increment,
                }
            })
            .collect();

        Ok(columns)
    }
}

/// SQLite transaction wrapper.
///
/// Issues raw `BEGIN DEFERRED` / `COMMIT` / `ROLLBACK` SQL so that it can share
/// the connection `Arc<Mutex<…>>` without borrowing it for the transaction's lifetime.
pub struct SqliteTransaction {
    conn: Arc<Mutex<RusqliteConnection>>,
    committed: bool,
    rolled_back: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.rolled_back {
            tracing::warn!(
                "SQLite transaction dropped without commit or rollback, issuing automatic rollback"
            );
            let conn = self.conn.lock();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "automatic rollback on drop failed");
            }
        }
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing SQLite transaction");
        if self.rolled_back {
            return Err(VaultError::Query("Transaction already rolled back".into()));
        }
        if self.committed {
            return Err(VaultError::Query("Transaction already committed".into()));
        }

        {
            let conn = self.conn.lock();
            conn.execute_batch("COMMIT")
                .map_err(|e| VaultError::Query(format!("Failed to commit transaction: {}", e)))?;
        }
        self.committed = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");
        if self.committed {
            return Err(VaultError::Query("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Ok(());
        }

        {
            let conn = self.conn.lock();
            conn.execute_batch("ROLLBACK").map_err(|e| {
                VaultError::Query(format!("Failed to rollback transaction: {}", e))
            })?;
        }
        self.rolled_back = true;
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query in SQLite transaction");
        let conn = self.conn.lock();
        run_query(&conn, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in SQLite transaction");
        let conn = self.conn.lock();
        run_statement(&conn, sql, params)
    }
}

fn run_statement(
    conn: &RusqliteConnection,
    sql: &str,
    params: &[Value],
) -> Result<StatementResult> {
    let rusqlite_params = values_to_rusqlite(params);
    let rows_affected = conn
        .execute(sql, params_from_iter(rusqlite_params.iter()))
        .map_err(|e| VaultError::Query(format!("Failed to execute statement: {}", e)))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected as u64,
        last_insert_id: u64::try_from(conn.last_insert_rowid()).ok(),
    })
}

fn run_query(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = std::time::Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| VaultError::Query(format!("Failed to prepare query: {}", e)))?;

    let mut column_names: Vec<String> = Vec::with_capacity(stmt.column_count());
    let mut columns: Vec<ColumnMeta> = Vec::with_capacity(stmt.column_count());
    for (idx, col) in stmt.columns().iter().enumerate() {
        let name = col.name().to_string();
        // sqlite3_column_decltype: the type as written in CREATE TABLE
        let data_type = col.decl_type().unwrap_or("DYNAMIC").to_string();
        column_names.push(name.clone());
        columns.push(ColumnMeta {
            name,
            data_type,
            nullable: true,
            ordinal: idx,
        });
    }

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| VaultError::Query(format!("Failed to execute query: {}", e)))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| VaultError::Query(format!("Failed to fetch row: {}", e)))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(rusqlite_to_value(row, i)?);
        }
        rows.push(Row::new(column_names.clone(), values));
    }

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        row_count = rows.len(),
        execution_time_ms = execution_time_ms,
        "query executed successfully"
    );
    Ok(QueryResult {
        columns,
        rows,
        affected_rows: 0,
        execution_time_ms,
    })
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as SqlValue;
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Int8(i) => SqlValue::Integer(*i as i64),
        Value::Int16(i) => SqlValue::Integer(*i as i64),
        Value::Int32(i) => SqlValue::Integer(*i as i64),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float32(f) => SqlValue::Real(*f as f64),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Decimal(d) => SqlValue::Text(d.clone()),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Date(d) => SqlValue::Text(d.to_string()),
        Value::Time(t) => SqlValue::Text(t.to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => SqlValue::Text(dt.to_rfc3339()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

/// Convert a rusqlite row cell to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| VaultError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // BLOB cells often hold text written through untyped columns.
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
    };

    Ok(value)
}
