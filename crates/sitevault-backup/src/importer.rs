//! Snapshot restore
//!
//! Tables are applied one at a time in `metadata.table_names` order. Each table is
//! created from its recorded structure when missing, emptied, then reloaded row by
//! row. Existing tables are never altered.

use serde::Serialize;
use sitevault_core::{
    Connection, Result as VaultResult, StatementResult, Transaction, Value, VaultError,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::artifact::{ArtifactError, RowRecord, SnapshotArtifact};
use crate::ddl::{DdlDialect, synthesize_create_table};
use crate::introspect::SchemaIntrospector;

/// Import errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid backup file: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Could not open a database session: {0}")]
    Connection(VaultError),

    #[error("Could not read the database catalog: {0}")]
    Database(VaultError),

    #[error("Failed to restore table '{table}': {message}")]
    Table { table: String, message: String },

    #[error("Transaction failed: {0}")]
    Transaction(VaultError),
}

impl ImportError {
    /// The payload was rejected before any database access
    pub fn is_malformed(&self) -> bool {
        matches!(self, ImportError::Artifact(_))
    }
}

/// What to do when a table fails to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failing table
    #[default]
    FailFast,
    /// Record the failure and move on to the next table
    ContinueOnError,
}

/// Import options
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub policy: ErrorPolicy,
    /// Run the whole import in one transaction; implies `FailFast`
    pub atomic: bool,
}

impl ImportOptions {
    pub fn continue_on_error() -> Self {
        Self {
            policy: ErrorPolicy::ContinueOnError,
            atomic: false,
        }
    }

    pub fn atomic() -> Self {
        Self {
            policy: ErrorPolicy::FailFast,
            atomic: true,
        }
    }

    fn effective_policy(&self) -> ErrorPolicy {
        if self.atomic {
            ErrorPolicy::FailFast
        } else {
            self.policy
        }
    }
}

/// A table skipped under `ContinueOnError`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Result of a completed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported_records: usize,
    pub imported_tables: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tables_created: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TableFailure>,
}

/// Statement target: the bare session or an open transaction
enum Executor<'a> {
    Session(&'a dyn Connection),
    Transaction(&'a dyn Transaction),
}

impl Executor<'_> {
    async fn execute(&self, sql: &str, params: &[Value]) -> VaultResult<StatementResult> {
        match self {
            Executor::Session(conn) => conn.execute(sql, params).await,
            Executor::Transaction(tx) => tx.execute(sql, params).await,
        }
    }
}

/// Restores snapshots through one open session
pub struct SnapshotImporter {
    connection: Arc<dyn Connection>,
    dialect: DdlDialect,
    transactional_ddl: bool,
}

impl SnapshotImporter {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        let dialect = DdlDialect::for_driver(connection.driver_name());
        Self {
            connection,
            dialect,
            transactional_ddl: dialect != DdlDialect::MySql,
        }
    }

    /// Override whether CREATE TABLE participates in transactions
    pub fn with_transactional_ddl(mut self, transactional_ddl: bool) -> Self {
        self.transactional_ddl = transactional_ddl;
        self
    }

    #[tracing::instrument(
        skip(self, artifact, options),
        fields(database = %artifact.metadata.database_name, tables = artifact.table_names().len(), atomic = options.atomic)
    )]
    pub async fn import(
        &self,
        artifact: &SnapshotArtifact,
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let connection = self.connection.as_ref();

        // Probe the catalog before any transaction opens. The driver compares names the
        // way its database does, so `widgets` finds an existing `Widgets` on SQLite.
        let introspector = SchemaIntrospector::new(connection);
        let mut existing = HashSet::new();
        for table in artifact.table_names() {
            if introspector
                .table_exists(table)
                .await
                .map_err(ImportError::Database)?
            {
                existing.insert(table.clone());
            }
        }

        if artifact.is_synthetic() {
            tracing::warn!("restoring a synthetic sample artifact");
        }

        if options.atomic {
            let missing = artifact
                .table_names()
                .iter()
                .any(|t| !existing.contains(t));
            if missing && !self.transactional_ddl {
                tracing::warn!(
                    driver = connection.driver_name(),
                    "CREATE TABLE commits implicitly on this database; created tables survive a rollback"
                );
            }

            let tx = connection
                .begin_transaction()
                .await
                .map_err(ImportError::Transaction)?;
            let outcome = self
                .apply(
                    Executor::Transaction(tx.as_ref()),
                    artifact,
                    &mut existing,
                    ErrorPolicy::FailFast,
                )
                .await;

            return match outcome {
                Ok(report) => {
                    tx.commit().await.map_err(ImportError::Transaction)?;
                    tracing::info!(
                        records = report.imported_records,
                        tables = report.imported_tables,
                        "atomic import committed"
                    );
                    Ok(report)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::error!(error = %rollback_err, "rollback after failed import also failed");
                    }
                    Err(e)
                }
            };
        }

        let report = self
            .apply(
                Executor::Session(connection),
                artifact,
                &mut existing,
                options.effective_policy(),
            )
            .await?;
        tracing::info!(
            records = report.imported_records,
            tables = report.imported_tables,
            failed = report.errors.len(),
            "import complete"
        );
        Ok(report)
    }

    async fn apply(
        &self,
        executor: Executor<'_>,
        artifact: &SnapshotArtifact,
        existing: &mut HashSet<String>,
        policy: ErrorPolicy,
    ) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();

        for table in artifact.table_names() {
            match self.restore_table(&executor, artifact, table, existing).await {
                Ok((rows, created)) => {
                    report.imported_records += rows;
                    report.imported_tables += 1;
                    if created {
                        report.tables_created.push(table.clone());
                    }
                }
                Err(message) => {
                    tracing::error!(table = %table, error = %message, "table restore failed");
                    match policy {
                        ErrorPolicy::FailFast => {
                            return Err(ImportError::Table {
                                table: table.clone(),
                                message,
                            });
                        }
                        ErrorPolicy::ContinueOnError => report.errors.push(TableFailure {
                            table: table.clone(),
                            error: message,
                        }),
                    }
                }
            }
        }
        Ok(report)
    }

    /// Create-if-absent, clear, reload. Returns rows inserted and whether the table was created.
    async fn restore_table(
        &self,
        executor: &Executor<'_>,
        artifact: &SnapshotArtifact,
        table: &str,
        existing: &mut HashSet<String>,
    ) -> Result<(usize, bool), String> {
        let quoted = self.dialect.quote_identifier(table);
        let mut created = false;

        if !existing.contains(table) {
            let structure = artifact.structure(table);
            if structure.is_empty() {
                return Err(
                    "table does not exist and the backup has no structure for it".to_string()
                );
            }
            let ddl = synthesize_create_table(table, structure, self.dialect)
                .map_err(|e| e.to_string())?;
            tracing::info!(table = %table, "creating missing table");
            executor
                .execute(&ddl, &[])
                .await
                .map_err(|e| e.to_string())?;
            existing.insert(table.to_string());
            created = true;
        }

        let cleared = executor
            .execute(&format!("DELETE FROM {}", quoted), &[])
            .await
            .map_err(|e| e.to_string())?;
        tracing::debug!(table = %table, removed = cleared.affected_rows, "table cleared");

        let rows = artifact.rows(table);
        for (idx, row) in rows.iter().enumerate() {
            let (sql, params) = self.insert_statement(&quoted, row);
            executor
                .execute(&sql, &params)
                .await
                .map_err(|e| format!("row {}: {}", idx, e))?;
        }

        tracing::debug!(table = %table, rows = rows.len(), "table restored");
        Ok((rows.len(), created))
    }

    /// `INSERT` built from the row's own keys
    fn insert_statement(&self, quoted_table: &str, row: &RowRecord) -> (String, Vec<Value>) {
        if row.is_empty() {
            let sql = match self.dialect {
                DdlDialect::MySql => format!("INSERT INTO {} () VALUES ()", quoted_table),
                DdlDialect::Sqlite | DdlDialect::Generic => {
                    format!("INSERT INTO {} DEFAULT VALUES", quoted_table)
                }
            };
            return (sql, Vec::new());
        }

        let columns: Vec<String> = row
            .columns()
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let params = row.values().iter().map(|v| v.to_value()).collect();
        (
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quoted_table,
                columns.join(", "),
                placeholders
            ),
            params,
        )
    }
}
