//! Session-owning entry points for export and import
//!
//! Each call opens its own connection through the configured driver and closes it on
//! every exit path.

use sitevault_core::{Connection, ConnectionConfig, DatabaseDriver};
use std::path::Path;
use std::sync::Arc;

use crate::artifact::SnapshotArtifact;
use crate::exporter::{
    ExportError, ExportOptions, ExportOutcome, ExportReport, SnapshotExporter, TableExportSummary,
};
use crate::fallback::fallback_artifact;
use crate::importer::{ImportError, ImportOptions, ImportReport, SnapshotImporter};

/// Backup/restore engine bound to one database configuration
#[derive(Clone)]
pub struct BackupEngine {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
}

impl BackupEngine {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Name recorded in artifacts when the session cannot report one
    fn configured_database_name(&self) -> String {
        // SQLite paths reduce to their file stem, MySQL names pass through
        self.config
            .get_string("database")
            .as_deref()
            .and_then(|db| Path::new(db).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Produce a snapshot. Never fails: an unreachable database yields the sample dataset.
    #[tracing::instrument(skip(self, options), fields(driver = self.driver.name()))]
    pub async fn export(&self, options: ExportOptions) -> ExportOutcome {
        let timestamp = options.resolve_timestamp();
        let options = options.with_timestamp(timestamp);

        // A mistyped SQLite path must not export an empty new database.
        let config = self
            .config
            .clone()
            .with_param(ConnectionConfig::CREATE_IF_MISSING, false);
        let live = match self.driver.connect(&config).await {
            Ok(connection) => {
                let outcome = SnapshotExporter::new(Arc::clone(&connection))
                    .snapshot(&options)
                    .await;
                close_quietly(connection.as_ref()).await;
                outcome
            }
            Err(e) => Err(ExportError::Connect(e)),
        };

        match live {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "database unavailable; exporting sample dataset");
                let database_name = options
                    .database_name
                    .clone()
                    .unwrap_or_else(|| self.configured_database_name());
                let artifact = fallback_artifact(timestamp, &database_name);
                let report = fallback_report(&artifact, e.to_string());
                ExportOutcome { artifact, report }
            }
        }
    }

    /// Parse `payload` and restore it. Malformed payloads are rejected before connecting.
    #[tracing::instrument(skip(self, payload, options), fields(driver = self.driver.name(), bytes = payload.len()))]
    pub async fn import(
        &self,
        payload: &[u8],
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let artifact = SnapshotArtifact::from_slice(payload)?;
        self.import_artifact(&artifact, options).await
    }

    /// Restore an already-parsed artifact
    pub async fn import_artifact(
        &self,
        artifact: &SnapshotArtifact,
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        artifact.validate()?;

        let connection = self
            .driver
            .connect(&self.config)
            .await
            .map_err(ImportError::Connection)?;

        let transactional_ddl = self.driver.capabilities().supports_transactional_ddl;
        let outcome = SnapshotImporter::new(Arc::clone(&connection))
            .with_transactional_ddl(transactional_ddl)
            .import(artifact, options)
            .await;
        close_quietly(connection.as_ref()).await;
        outcome
    }
}

fn fallback_report(artifact: &SnapshotArtifact, reason: String) -> ExportReport {
    ExportReport {
        database_name: artifact.metadata.database_name.clone(),
        synthetic: true,
        tables: artifact
            .table_names()
            .iter()
            .map(|name| TableExportSummary {
                name: name.clone(),
                rows: artifact.rows(name).len(),
                columns: artifact.structure(name).len(),
                degraded: false,
            })
            .collect(),
        fallback_reason: Some(reason),
    }
}

async fn close_quietly(connection: &dyn Connection) {
    if let Err(e) = connection.close().await {
        tracing::warn!(error = %e, "failed to close database session");
    }
}
