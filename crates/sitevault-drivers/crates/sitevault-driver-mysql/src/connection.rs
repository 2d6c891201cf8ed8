//! MySQL connection implementation

use async_trait::async_trait;
use mysql_async::{
    Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row as MySqlRow,
    consts::ColumnType, prelude::*,
};
use sitevault_core::{
    ColumnMeta, Connection, QueryResult, Result, Row, SchemaIntrospection, StatementResult,
    Transaction, Value, VaultError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::params::interpolate_params;

/// Dedicated Tokio runtime for MySQL operations.
///
/// mysql_async spawns pool-management tasks with `tokio::spawn`; running every call on
/// one runtime keeps those tasks alive no matter which executor the caller is on.
fn get_mysql_runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sitevault-mysql-runtime")
            .build()
            .expect("Failed to create Tokio runtime for MySQL driver")
    })
}

/// MySQL connection wrapper
///
/// Backed by a single-connection pool, so every statement runs on the same session.
pub struct MySqlConnection {
    pool: Pool,
    database_name: Option<String>,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Connect to a MySQL database
    pub async fn connect(
        host: &str,
        port: u16,
        database: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        tracing::info!(host = %host, port = %port, database = ?database, "connecting to MySQL database");

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(host)
            .tcp_port(port);

        if let Some(db) = database {
            opts_builder = opts_builder.db_name(Some(db));
        }
        if let Some(u) = user {
            opts_builder = opts_builder.user(Some(u));
        }
        if let Some(p) = password {
            opts_builder = opts_builder.pass(Some(p));
        }

        let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
            VaultError::Connection(
                "Failed to configure MySQL pool constraints (min=1, max=1)".into(),
            )
        })?;
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);
        opts_builder = opts_builder.pool_opts(pool_opts);

        let opts: Opts = opts_builder.into();

        let pool = get_mysql_runtime()
            .spawn(async move {
                let pool = Pool::new(opts);
                // Acquire once so an unreachable server fails here and not on first use.
                let _conn = pool.get_conn().await.map_err(|e| {
                    VaultError::Connection(format!("Failed to connect to MySQL: {}", e))
                })?;
                Ok::<Pool, VaultError>(pool)
            })
            .await
            .map_err(|e| {
                VaultError::Connection(format!("MySQL connection task failed: {}", e))
            })??;

        let database_name = match database {
            Some(db) => Some(db.to_string()),
            None => {
                let pool_clone = pool.clone();
                get_mysql_runtime()
                    .spawn(async move {
                        let mut conn = pool_clone.get_conn().await.map_err(|e| {
                            VaultError::Connection(format!(
                                "Failed to get connection for DATABASE() query: {}",
                                e
                            ))
                        })?;
                        let row: Option<(Option<String>,)> =
                            conn.query_first("SELECT DATABASE()").await.map_err(|e| {
                                VaultError::Query(format!("Failed to query DATABASE(): {}", e))
                            })?;
                        Ok::<Option<String>, VaultError>(row.and_then(|(db,)| db))
                    })
                    .await
                    .map_err(|e| {
                        VaultError::Connection(format!("MySQL DATABASE() task failed: {}", e))
                    })?
                    .unwrap_or(None)
            }
        };

        tracing::info!(host = %host, port = %port, database = ?database_name, "MySQL connection established");
        Ok(Self {
            pool,
            database_name,
            closed: AtomicBool::new(false),
        })
    }

    /// Get the pooled session, dispatched on the MySQL Tokio runtime
    async fn get_conn(&self) -> Result<Conn> {
        if self.closed.load(Ordering::Acquire) {
            return Err(VaultError::Connection("MySQL connection is closed".into()));
        }
        let pool = self.pool.clone();
        get_mysql_runtime()
            .spawn(async move { pool.get_conn().await })
            .await
            .map_err(|e| VaultError::Connection(format!("MySQL get_conn task failed: {}", e)))?
            .map_err(|e| VaultError::Connection(format!("Failed to get MySQL connection: {}", e)))
    }

    /// The database selected at connect time, used when introspection gets `schema: None`
    pub fn default_database(&self) -> Option<&str> {
        self.database_name.as_deref()
    }
}

/// Convert a mysql_async value to our Value type, using the column type to interpret
/// the byte strings the text protocol returns.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT => {
                    s.parse::<f32>().map(Value::Float32).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Int64(i),
            Err(_) => Value::Decimal(u.to_string()),
        },
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            let is_date_column = matches!(
                col_type,
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE
            );
            match date {
                Some(d) if is_date_column => Value::Date(d),
                Some(d) => d
                    .and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                    .map(Value::DateTime)
                    .unwrap_or_else(|| Value::String(d.to_string())),
                // Zero dates ('0000-00-00') have no chrono representation.
                None => Value::String(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, min, sec
                )),
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

/// Collect a text-protocol result set into our row and column types
fn collect_rows(mysql_rows: Vec<MySqlRow>) -> (Vec<ColumnMeta>, Vec<Row>) {
    let mut columns = Vec::new();
    let mut column_names = Vec::new();
    let mut column_types = Vec::new();

    if let Some(first_row) = mysql_rows.first() {
        for (idx, col) in first_row.columns_ref().iter().enumerate() {
            let name = col.name_str().to_string();
            column_names.push(name.clone());
            column_types.push(col.column_type());
            columns.push(ColumnMeta {
                name,
                data_type: format!("{:?}", col.column_type()),
                nullable: true,
                ordinal: idx,
            });
        }
    }

    let rows = mysql_rows
        .into_iter()
        .map(|mut mysql_row| {
            let values = (0..column_names.len())
                .map(|idx| {
                    let raw = mysql_row.take(idx).unwrap_or(mysql_async::Value::NULL);
                    let col_type = column_types
                        .get(idx)
                        .copied()
                        .unwrap_or(ColumnType::MYSQL_TYPE_STRING);
                    mysql_value_to_value(raw, col_type)
                })
                .collect();
            Row::new(column_names.clone(), values)
        })
        .collect();

    (columns, rows)
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn database_name(&self) -> Option<String> {
        self.database_name.clone()
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let final_sql = interpolate_params(sql, params)?;
        let mut conn = self.get_conn().await?;

        let result = get_mysql_runtime()
            .spawn(async move {
                conn.query_drop(&final_sql).await.map_err(|e| {
                    VaultError::Query(format!("Failed to execute statement: {}", e))
                })?;
                Ok::<StatementResult, VaultError>(StatementResult {
                    affected_rows: conn.affected_rows(),
                    last_insert_id: conn.last_insert_id(),
                })
            })
            .await
            .map_err(|e| VaultError::Query(format!("MySQL execute task failed: {}", e)))??;

        tracing::debug!(affected_rows = result.affected_rows, "statement executed");
        Ok(result)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let final_sql = interpolate_params(sql, params)?;
        let mut conn = self.get_conn().await?;

        let (columns, rows) = get_mysql_runtime()
            .spawn(async move {
                let mysql_rows: Vec<MySqlRow> = conn.query(&final_sql).await.map_err(|e| {
                    VaultError::Query(format!("Failed to execute query: {}", e))
                })?;
                Ok::<_, VaultError>(collect_rows(mysql_rows))
            })
            .await
            .map_err(|e| VaultError::Query(format!("MySQL query task failed: {}", e)))??;

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

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning MySQL transaction");
        let mut conn = self.get_conn().await?;

        let conn = get_mysql_runtime()
            .spawn(async move {
                conn.query_drop("START TRANSACTION").await.map_err(|e| {
                    VaultError::Query(format!("Failed to begin transaction: {}", e))
                })?;
                Ok::<Conn, VaultError>(conn)
            })
            .await
            .map_err(|e| {
                VaultError::Connection(format!("MySQL begin transaction task failed: {}", e))
            })??;

        Ok(Box::new(MySqlTransaction {
            conn: Arc::new(tokio::sync::Mutex::new(Some(conn))),
            committed: false,
            rolled_back: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(database = ?self.database_name, "closing MySQL connection pool");
        let pool = self.pool.clone();
        get_mysql_runtime()
            .spawn(async move { pool.disconnect().await })
            .await
            .map_err(|e| VaultError::Connection(format!("MySQL close task failed: {}", e)))?
            .map_err(|e| {
                VaultError::Connection(format!("Failed to close MySQL connection: {}", e))
            })?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

/// MySQL transaction implementation
///
/// Holds the pool's only session from `START TRANSACTION` until commit or rollback;
/// the session returns to the pool when the inner `Conn` is dropped. Dropping an
/// unfinished transaction returns the session mid-transaction, and the server rolls it
/// back when the pool disconnects.
pub struct MySqlTransaction {
    conn: Arc<tokio::sync::Mutex<Option<Conn>>>,
    committed: bool,
    rolled_back: bool,
}

impl MySqlTransaction {
    async fn finish(&self, statement: &'static str) -> Result<()> {
        let conn_mutex = self.conn.clone();
        get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn_mutex.lock().await;
                if let Some(mut conn) = guard.take() {
                    conn.query_drop(statement).await.map_err(|e| {
                        VaultError::Query(format!("Failed to {} transaction: {}", statement, e))
                    })?;
                }
                Ok::<(), VaultError>(())
            })
            .await
            .map_err(|e| VaultError::Connection(format!("MySQL {} task failed: {}", statement, e)))?
    }

    fn ensure_active(&self) -> Result<()> {
        if self.committed {
            return Err(VaultError::Query("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Err(VaultError::Query("Transaction already rolled back".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MySqlTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.ensure_active()?;
        tracing::debug!("committing MySQL transaction");
        self.finish("COMMIT").await?;
        self.committed = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.ensure_active()?;
        tracing::debug!("rolling back MySQL transaction");
        self.finish("ROLLBACK").await?;
        self.rolled_back = true;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_active()?;
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in transaction");
        let final_sql = interpolate_params(sql, params)?;
        let conn_mutex = self.conn.clone();

        get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn_mutex.lock().await;
                let conn = guard.as_mut().ok_or_else(|| {
                    VaultError::Query("Transaction connection no longer available".into())
                })?;
                conn.query_drop(&final_sql).await.map_err(|e| {
                    VaultError::Query(format!("Failed to execute statement: {}", e))
                })?;
                Ok::<StatementResult, VaultError>(StatementResult {
                    affected_rows: conn.affected_rows(),
                    last_insert_id: conn.last_insert_id(),
                })
            })
            .await
            .map_err(|e| VaultError::Query(format!("MySQL execute task failed: {}", e)))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_active()?;
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query in transaction");
        let final_sql = interpolate_params(sql, params)?;
        let conn_mutex = self.conn.clone();
        let start_time = std::time::Instant::now();

        let (columns, rows) = get_mysql_runtime()
            .spawn(async move {
                let mut guard = conn_mutex.lock().await;
                let conn = guard.as_mut().ok_or_else(|| {
                    VaultError::Query("Transaction connection no longer available".into())
                })?;
                let mysql_rows: Vec<MySqlRow> = conn.query(&final_sql).await.map_err(|e| {
                    VaultError::Query(format!("Failed to execute query: {}", e))
                })?;
                Ok::<_, VaultError>(collect_rows(mysql_rows))
            })
            .await
            .map_err(|e| VaultError::Query(format!("MySQL query task failed: {}", e)))??;

        Ok(QueryResult {
            columns,
            rows,
            affected_rows: 0,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
