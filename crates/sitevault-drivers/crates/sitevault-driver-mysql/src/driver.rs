//! MySQL driver implementation

use async_trait::async_trait;
use sitevault_core::{
    Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, Result, VaultError,
};
use std::sync::Arc;

use crate::MySqlConnection;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_transactions: true,
            // CREATE TABLE commits the open transaction implicitly
            supports_transactional_ddl: false,
        }
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = if config.port > 0 { config.port } else { 3306 };
        let database = config.get_string("database");
        let user = config
            .get_string("user")
            .or_else(|| config.get_string("username"));
        let password = config.get_string("password");

        let conn = MySqlConnection::connect(
            &host,
            port,
            database.as_deref(),
            user.as_deref(),
            password.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to MySQL database");
            match e {
                VaultError::Connection(_) => e,
                other => VaultError::Connection(format!(
                    "Failed to connect to MySQL database: {}",
                    other
                )),
            }
        })?;

        tracing::info!(host = %host, port = %port, database = ?database, "MySQL connection created");
        Ok(Arc::new(conn))
    }

    #[tracing::instrument(skip(self, config))]
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!("testing MySQL connection");
        let conn = self.connect(config).await?;
        let outcome = conn.query("SELECT 1", &[]).await.map(|_| ());
        conn.close().await?;
        outcome
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = if config.port > 0 { config.port } else { 3306 };
        let database = config.get_string("database");
        let user = config
            .get_string("user")
            .or_else(|| config.get_string("username"));

        let mut conn_str = String::from("mysql://");
        if let Some(u) = user {
            conn_str.push_str(&u);
            // Never render the password; the string ends up in logs.
            if config.get_string("password").is_some() {
                conn_str.push_str(":***");
            }
            conn_str.push('@');
        }
        conn_str.push_str(&format!("{}:{}", host, port));
        if let Some(db) = database {
            conn_str.push('/');
            conn_str.push_str(&db);
        }
        conn_str
    }
}
