//! HTTP surface for backup and restore
//!
//! - `GET  /api/backup/export` downloads a snapshot
//! - `POST /api/backup/import` restores an uploaded snapshot (multipart field `backup_file`)
//! - `GET  /api/health`

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use sitevault_backup::{BackupEngine, ExportOptions, ImportError, ImportOptions, ImportReport};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Multipart field carrying the backup file
const UPLOAD_FIELD: &str = "backup_file";

/// Shared state for all handlers
pub struct AppState {
    pub engine: BackupEngine,
    pub import_options: ImportOptions,
    /// Overrides `metadata.database_name` on export
    pub database_name: Option<String>,
}

/// Body of every import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: Option<ImportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResponse {
    /// Status code and body for an import outcome
    pub fn from_result(result: Result<ImportReport, ImportError>) -> (StatusCode, Self) {
        match result {
            Ok(report) => (
                StatusCode::OK,
                Self {
                    success: true,
                    report: Some(report),
                    error: None,
                },
            ),
            Err(e) => {
                let status = if e.is_malformed() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, Self::failure(e.to_string()))
            }
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(message.into()),
        }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/backup/export", get(export_backup))
        .route("/api/backup/import", post(import_backup))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, "backup server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn export_backup(State(state): State<Arc<AppState>>) -> Response {
    let options = ExportOptions {
        database_name: state.database_name.clone(),
        timestamp: None,
    };
    let outcome = state.engine.export(options).await;

    let body = match outcome.artifact.to_json_vec() {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize snapshot");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    tracing::info!(
        tables = outcome.report.tables.len(),
        rows = outcome.report.total_rows(),
        synthetic = outcome.report.synthetic,
        "serving snapshot download"
    );
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    outcome.artifact.suggested_filename()
                ),
            ),
        ],
        body,
    )
        .into_response()
}

async fn import_backup(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut payload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ImportResponse::failure(format!("Unreadable upload: {}", e))),
                )
                    .into_response();
            }
        };

        // The named field wins; otherwise take the first file part.
        let named = field.name() == Some(UPLOAD_FIELD);
        if !named && (payload.is_some() || field.file_name().is_none()) {
            continue;
        }

        match field.bytes().await {
            Ok(bytes) => payload = Some(bytes),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ImportResponse::failure(format!("Unreadable upload: {}", e))),
                )
                    .into_response();
            }
        }
        if named {
            break;
        }
    }

    let Some(payload) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ImportResponse::failure("No backup file uploaded")),
        )
            .into_response();
    };

    import_payload(&state, &payload).await.into_response()
}

/// Restore an uploaded payload
async fn import_payload(state: &AppState, payload: &[u8]) -> (StatusCode, Json<ImportResponse>) {
    let result = state.engine.import(payload, &state.import_options).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "import request failed");
    }
    let (status, body) = ImportResponse::from_result(result);
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sitevault_core::{Connection, ConnectionConfig};
    use sitevault_drivers::sqlite::{SqliteConnection, SqliteDriver};

    const WIDGETS: &str = r#"{
        "metadata": {"timestamp": "2024-01-01T00:00:00Z", "format_version": "1.0",
                     "database_name": "x", "table_names": ["widgets"]},
        "structures": {"widgets": [
            {"name": "id", "data_type": "int", "key_role": "primary"},
            {"name": "label", "data_type": "varchar(20)"}
        ]},
        "tables": {"widgets": [{"id": 1, "label": "A"}, {"id": 2, "label": "B"}]}
    }"#;

    fn state_for(path: &str) -> Arc<AppState> {
        Arc::new(AppState {
            engine: BackupEngine::new(
                Arc::new(SqliteDriver::new()),
                ConnectionConfig::new_sqlite(path),
            ),
            import_options: ImportOptions::default(),
            database_name: None,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_export_is_a_dated_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency_site.db");
        let path = path.to_str().unwrap();
        let conn = SqliteConnection::open(path).unwrap();
        conn.execute("CREATE TABLE menus (id INTEGER PRIMARY KEY, label TEXT)", &[])
            .await
            .unwrap();
        conn.close().await.unwrap();

        let response = export_backup(State(state_for(path))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"backup-"));
        assert!(disposition.ends_with(".json\""));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["metadata"]["table_names"], serde_json::json!(["menus"]));
        assert_eq!(body["metadata"]["database_name"], "agency_site");
    }

    #[tokio::test]
    async fn test_import_success_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.db");
        let state = state_for(path.to_str().unwrap());

        let (status, Json(body)) = import_payload(&state, WIDGETS.as_bytes()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "success": true,
                "imported_records": 2,
                "imported_tables": 1,
                "tables_created": ["widgets"]
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_upload_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path().join("site.db").to_str().unwrap());

        let (status, Json(body)) = import_payload(&state, b"<html>not a backup</html>").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.error.unwrap().starts_with("Invalid backup file"));
    }

    #[tokio::test]
    async fn test_database_failure_is_a_server_error() {
        let state = state_for("/definitely/missing/dir/site.db");

        let (status, Json(body)) = import_payload(&state, WIDGETS.as_bytes()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("imported_records").is_none());
    }
}
