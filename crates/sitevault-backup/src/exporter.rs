//! Whole-database snapshot export
//!
//! Walks every base table in catalog order, capturing its structure and all of its
//! rows. A table whose structure or rows cannot be read degrades to an empty entry;
//! only a failure to enumerate tables aborts the export.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sitevault_core::{Connection, Result as VaultResult, Row, VaultError};
use std::sync::Arc;
use thiserror::Error;

use crate::artifact::{RowRecord, SnapshotArtifact};
use crate::ddl::DdlDialect;
use crate::introspect::SchemaIntrospector;
use crate::scalar::Scalar;

/// Failures that prevent a live export; the engine answers both with the fallback dataset
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not open a database session: {0}")]
    Connect(VaultError),

    #[error("Could not enumerate tables: {0}")]
    Catalog(VaultError),
}

impl ExportError {
    pub fn source_error(&self) -> &VaultError {
        match self {
            ExportError::Connect(e) | ExportError::Catalog(e) => e,
        }
    }
}

/// Export options
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Name recorded in `metadata.database_name`; defaults to the session's database
    pub database_name: Option<String>,
    /// Timestamp recorded in the metadata; defaults to now
    pub timestamp: Option<DateTime<Utc>>,
}

impl ExportOptions {
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub(crate) fn resolve_timestamp(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}

/// Per-table export summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableExportSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    /// Row extraction failed and the table was written with no rows
    pub degraded: bool,
}

/// What an export produced, for logging and CLI output
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub database_name: String,
    pub synthetic: bool,
    pub tables: Vec<TableExportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ExportReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn degraded_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.degraded)
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// An artifact together with its report
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub artifact: SnapshotArtifact,
    pub report: ExportReport,
}

/// Builds snapshots from one open session
pub struct SnapshotExporter {
    connection: Arc<dyn Connection>,
}

impl SnapshotExporter {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }

    /// Snapshot every base table.
    ///
    /// Per-table failures are logged and recorded in the report; the only error is an
    /// unreadable table list.
    #[tracing::instrument(skip(self, options), fields(driver = self.connection.driver_name()))]
    pub async fn snapshot(&self, options: &ExportOptions) -> Result<ExportOutcome, ExportError> {
        let connection = self.connection.as_ref();
        let introspector = SchemaIntrospector::new(connection);
        let dialect = DdlDialect::for_driver(connection.driver_name());

        let table_names = introspector
            .list_tables()
            .await
            .map_err(ExportError::Catalog)?;

        let database_name = options
            .database_name
            .clone()
            .or_else(|| connection.database_name())
            .unwrap_or_else(|| "unknown".to_string());

        let mut artifact = SnapshotArtifact::new(&database_name, options.resolve_timestamp());
        let mut report = ExportReport {
            database_name,
            ..Default::default()
        };

        tracing::info!(table_count = table_names.len(), "exporting tables");

        for table in table_names {
            let structure = introspector.describe_table(&table).await;
            let (rows, degraded) = match read_rows(connection, dialect, &table).await {
                Ok(rows) => (rows, false),
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "could not read rows; exporting table empty");
                    (Vec::new(), true)
                }
            };

            tracing::debug!(table = %table, rows = rows.len(), columns = structure.len(), "table captured");
            report.tables.push(TableExportSummary {
                name: table.clone(),
                rows: rows.len(),
                columns: structure.len(),
                degraded,
            });
            artifact.push_table(table, structure, rows);
        }

        tracing::info!(
            tables = report.tables.len(),
            rows = report.total_rows(),
            degraded = report.degraded_tables().len(),
            "export complete"
        );
        Ok(ExportOutcome { artifact, report })
    }
}

/// Unrestricted read of a table's rows, cells flattened to scalars
async fn read_rows(
    connection: &dyn Connection,
    dialect: DdlDialect,
    table: &str,
) -> VaultResult<Vec<RowRecord>> {
    let sql = format!("SELECT * FROM {}", dialect.quote_identifier(table));
    let result = connection.query(&sql, &[]).await?;
    Ok(result.rows.into_iter().map(row_to_record).collect())
}

fn row_to_record(row: Row) -> RowRecord {
    let (columns, values) = row.into_parts();
    RowRecord::from_parts(columns, values.iter().map(Scalar::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use sitevault_core::Value;
    use sitevault_driver_sqlite::SqliteConnection;

    #[tokio::test]
    async fn test_snapshot_captures_structure_and_rows() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE menus (id INTEGER PRIMARY KEY, label TEXT NOT NULL, weight REAL)",
            &[],
        )
        .await
        .unwrap();
        conn.execute(
            "INSERT INTO menus (id, label, weight) VALUES (?, ?, ?), (?, ?, ?)",
            &[
                Value::Int64(1),
                Value::String("Home".into()),
                Value::Float64(1.5),
                Value::Int64(2),
                Value::String("Blog".into()),
                Value::Null,
            ],
        )
        .await
        .unwrap();
        conn.execute("CREATE TABLE pages (slug TEXT)", &[])
            .await
            .unwrap();

        let at = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        let options = ExportOptions::default()
            .with_database_name("agency_site")
            .with_timestamp(at);
        let outcome = SnapshotExporter::new(Arc::new(conn))
            .snapshot(&options)
            .await
            .unwrap();

        let artifact = outcome.artifact;
        assert_eq!(artifact.table_names(), &["menus", "pages"]);
        assert_eq!(artifact.metadata.database_name, "agency_site");
        assert_eq!(artifact.suggested_filename(), "backup-2024-07-01.json");
        assert_eq!(artifact.structure("menus").len(), 3);

        let rows = artifact.rows("menus");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["id", "label", "weight"]);
        assert_eq!(rows[0].get("weight"), Some(&Scalar::Float(1.5)));
        assert_eq!(rows[1].get("weight"), Some(&Scalar::Null));
        assert!(artifact.rows("pages").is_empty());

        assert_eq!(outcome.report.total_rows(), 2);
        assert!(outcome.report.degraded_tables().is_empty());
        assert!(!outcome.report.synthetic);
    }

    #[tokio::test]
    async fn test_closed_session_is_a_catalog_error() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.close().await.unwrap();
        let result = SnapshotExporter::new(Arc::new(conn))
            .snapshot(&ExportOptions::default())
            .await;
        assert!(matches!(result, Err(ExportError::Catalog(_))));
    }
}
