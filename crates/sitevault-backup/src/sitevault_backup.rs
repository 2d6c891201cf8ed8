//! SiteVault backup/restore engine
//!
//! Produces one self-describing JSON snapshot of a whole database (structure and data)
//! and rebuilds a database from such a snapshot, recreating missing tables.
//!
//! # Architecture
//!
//! ```text
//! export: Connection → SchemaIntrospector → SnapshotExporter → SnapshotArtifact → JSON
//!                  (unreachable) → fallback_artifact ─────────┘
//!
//! import: JSON → SnapshotArtifact (validated) → SnapshotImporter
//!                                   create-if-absent → DELETE → INSERT per row
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = BackupEngine::new(driver, config);
//! let outcome = engine.export(ExportOptions::default()).await;
//! let bytes = outcome.artifact.to_json_vec()?;
//!
//! let report = engine.import(&bytes, &ImportOptions::default()).await?;
//! ```

mod artifact;
mod ddl;
mod engine;
mod exporter;
mod fallback;
mod importer;
mod introspect;
mod scalar;

pub use artifact::*;
pub use ddl::{DdlDialect, DdlError, synthesize_create_table};
pub use engine::BackupEngine;
pub use exporter::{
    ExportError, ExportOptions, ExportOutcome, ExportReport, SnapshotExporter, TableExportSummary,
};
pub use fallback::{FALLBACK_TABLES, fallback_artifact};
pub use importer::{
    ErrorPolicy, ImportError, ImportOptions, ImportReport, SnapshotImporter, TableFailure,
};
pub use introspect::{SchemaIntrospector, describe_column};
pub use scalar::Scalar;
