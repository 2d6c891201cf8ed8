//! SQLite driver implementation

use async_trait::async_trait;
use sitevault_core::{
    Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Result, VaultError,
};
use std::sync::Arc;

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_transactions: true,
            supports_transactional_ddl: true,
        }
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").or_else(|| config.get_string("database")).as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = config
            .get_string("path")
            .or_else(|| config.get_string("database"))
            .ok_or_else(|| {
                VaultError::Configuration(
                    "SQLite requires a 'path' or 'database' setting, e.g. path = \"./site.db\""
                        .into(),
                )
            })?;

        let opened = if config.create_if_missing() {
            SqliteConnection::open(&path)
        } else {
            SqliteConnection::open_existing(&path)
        };
        let conn = opened.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            match e {
                VaultError::Connection(_) => e,
                other => VaultError::Connection(format!(
                    "Failed to connect to SQLite database: {}",
                    other
                )),
            }
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }

    #[tracing::instrument(skip(self, config))]
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!("testing SQLite connection");
        let conn = self.connect(config).await?;
        let outcome = conn.query("SELECT 1", &[]).await.map(|_| ());
        conn.close().await?;
        outcome
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        config
            .get_string("path")
            .or_else(|| config.get_string("database"))
            .unwrap_or_else(|| ":memory:".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_path() {
        let driver = SqliteDriver::new();
        let config = ConnectionConfig::new("sqlite", "no path");
        match driver.connect(&config).await {
            Err(VaultError::Configuration(_)) => {}
            Err(other) => panic!("expected configuration error, got {other}"),
            Ok(_) => panic!("expected configuration error"),
        }
    }

    #[tokio::test]
    async fn test_connect_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agency_site.db");
        let driver = SqliteDriver::new();
        let config = ConnectionConfig::new_sqlite(path.to_str().unwrap());

        let conn = driver.connect(&config).await.unwrap();
        assert_eq!(conn.driver_name(), "sqlite");
        assert_eq!(conn.database_name().as_deref(), Some("agency_site"));
        assert!(conn.as_schema_introspection().is_some());
        driver.test_connection(&config).await.unwrap();
    }

    #[test]
    fn test_connection_string_defaults_to_memory() {
        let driver = SqliteDriver::new();
        assert_eq!(
            driver.build_connection_string(&ConnectionConfig::new("sqlite", "x")),
            ":memory:"
        );
    }
}
