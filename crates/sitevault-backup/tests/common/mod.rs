//! Common test utilities and mocks
#![allow(dead_code)]

use async_trait::async_trait;
use sitevault_backup::BackupEngine;
use sitevault_core::{
    ColumnInfo, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, QueryResult,
    Result, SchemaIntrospection, StatementResult, TableInfo, Transaction, Value, VaultError,
};
use sitevault_driver_sqlite::{SqliteConnection, SqliteDriver};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// SQLite connection with injectable per-table failures.
///
/// Reads of tables listed in `failing_reads` and catalog lookups of tables listed in
/// `failing_columns` return errors; everything else goes to the real database.
pub struct FlakyConnection {
    inner: SqliteConnection,
    failing_reads: Vec<String>,
    failing_columns: Vec<String>,
    fail_catalog: bool,
    closes: Arc<AtomicUsize>,
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl FlakyConnection {
    fn reads_table(sql: &str, table: &str) -> bool {
        sql.starts_with("SELECT * FROM") && sql.contains(&format!("\"{}\"", table))
    }
}

#[async_trait]
impl Connection for FlakyConnection {
    fn driver_name(&self) -> &str {
        self.inner.driver_name()
    }

    fn database_name(&self) -> Option<String> {
        self.inner.database_name()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.query_log.lock().push(sql.to_string());
        self.inner.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.query_log.lock().push(sql.to_string());
        if self
            .failing_reads
            .iter()
            .any(|table| Self::reads_table(sql, table))
        {
            return Err(VaultError::Query("disk I/O error".into()));
        }
        self.inner.query(sql, params).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.inner.begin_transaction().await
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for FlakyConnection {
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        if self.fail_catalog {
            return Err(VaultError::Schema("catalog unavailable".into()));
        }
        self.inner.list_tables(schema).await
    }

    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        if self.failing_columns.iter().any(|t| t == table) {
            return Err(VaultError::Schema(format!("cannot describe {}", table)));
        }
        self.inner.get_columns(schema, table).await
    }

    async fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        if self.fail_catalog {
            return Err(VaultError::Schema("catalog unavailable".into()));
        }
        self.inner.table_exists(schema, table).await
    }
}

/// Driver that opens `FlakyConnection`s over a SQLite file, or refuses to connect
#[derive(Default)]
pub struct TestDriver {
    pub unreachable: bool,
    pub failing_reads: Vec<String>,
    pub failing_columns: Vec<String>,
    pub fail_catalog: bool,
    pub connects: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl TestDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn failing_read(mut self, table: &str) -> Self {
        self.failing_reads.push(table.to_string());
        self
    }

    pub fn failing_columns(mut self, table: &str) -> Self {
        self.failing_columns.push(table.to_string());
        self
    }

    pub fn failing_catalog(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }
}

#[async_trait]
impl DatabaseDriver for TestDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> DriverCapabilities {
        SqliteDriver::new().capabilities()
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(VaultError::Connection("Connection refused (os error 111)".into()));
        }
        let path = config
            .get_string("path")
            .ok_or_else(|| VaultError::Configuration("no path".into()))?;
        Ok(Arc::new(FlakyConnection {
            inner: if config.create_if_missing() {
                SqliteConnection::open(&path)?
            } else {
                SqliteConnection::open_existing(&path)?
            },
            failing_reads: self.failing_reads.clone(),
            failing_columns: self.failing_columns.clone(),
            fail_catalog: self.fail_catalog,
            closes: Arc::clone(&self.closes),
            query_log: Arc::clone(&self.query_log),
        }))
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        self.connect(config).await?.close().await
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        config.get_string("path").unwrap_or_default()
    }
}

/// A SQLite file in a fresh temporary directory
pub struct TestDatabase {
    _dir: TempDir,
    pub path: String,
}

impl TestDatabase {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir
            .path()
            .join(format!("{}.db", name))
            .to_string_lossy()
            .into_owned();
        Self { _dir: dir, path }
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new_sqlite(&self.path)
    }

    /// Engine over the real SQLite driver
    pub fn engine(&self) -> BackupEngine {
        BackupEngine::new(Arc::new(SqliteDriver::new()), self.config())
    }

    /// Engine over a `TestDriver`, keeping a handle for assertions
    pub fn engine_with(&self, driver: TestDriver) -> (BackupEngine, Arc<TestDriver>) {
        let driver = Arc::new(driver);
        let engine =
            BackupEngine::new(Arc::clone(&driver) as Arc<dyn DatabaseDriver>, self.config());
        (engine, driver)
    }

    /// Open a direct session for seeding and assertions
    pub fn open(&self) -> SqliteConnection {
        SqliteConnection::open(&self.path).expect("open sqlite")
    }

    pub async fn run(&self, statements: &[&str]) {
        let conn = self.open();
        for statement in statements {
            conn.execute(statement, &[]).await.expect(statement);
        }
    }

    /// All rows of `table` as `(col1, col2, ..)` strings, ordered by rowid
    pub async fn dump(&self, table: &str) -> Vec<Vec<String>> {
        let conn = self.open();
        let result = conn
            .query(&format!("SELECT * FROM \"{}\" ORDER BY rowid", table), &[])
            .await
            .expect("dump table");
        result
            .rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| row.get(i).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    pub async fn count(&self, table: &str) -> i64 {
        let conn = self.open();
        conn.query(&format!("SELECT COUNT(*) FROM \"{}\"", table), &[])
            .await
            .expect("count")
            .rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(|v| v.as_i64())
            .unwrap_or(-1)
    }

    pub async fn tables(&self) -> Vec<String> {
        let conn = self.open();
        conn.list_tables(None)
            .await
            .expect("list tables")
            .into_iter()
            .map(|t| t.name)
            .collect()
    }
}

/// Schema and content of a small agency site
pub const SITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE menus (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL,
        url TEXT NOT NULL,
        position INTEGER DEFAULT 0
    )"#,
    r#"CREATE TABLE pages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL,
        title TEXT NOT NULL,
        status TEXT DEFAULT 'draft',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE newsletters (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL,
        subscribed BOOLEAN DEFAULT 1,
        score REAL
    )"#,
    "INSERT INTO menus (label, url, position) VALUES ('Home', '/', 1), ('Blog', '/blog', 2)",
    "INSERT INTO pages (slug, title, status, created_at) VALUES ('home', 'Welcome', 'published', '2024-01-01 09:00:00')",
    "INSERT INTO pages (slug, title) VALUES ('about', 'About ''us''')",
    "INSERT INTO newsletters (id, email, subscribed, score) VALUES (10, 'reader@example.com', 1, 0.5), (11, 'quiet@example.com', 0, NULL)",
];
