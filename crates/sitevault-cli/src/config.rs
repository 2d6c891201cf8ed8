//! TOML configuration for the `sitevault` binary
//!
//! String values support `${ENV_VAR}` expansion, so credentials can stay out of the file.
//!
//! ```toml
//! [database]
//! driver = "mysql"
//! host = "db.internal"
//! database = "agency_site"
//! user = "backup"
//! password = "${SITEVAULT_DB_PASSWORD}"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [import]
//! continue_on_error = false
//! atomic = false
//!
//! [logging]
//! json = false
//! dir = "/var/log/sitevault"
//! ```

use serde::Deserialize;
use sitevault_backup::{ErrorPolicy, ImportOptions};
use sitevault_core::ConnectionConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub import: ImportSettings,
    pub logging: LogSettings,
}

/// Which database to back up
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `sqlite` or `mysql` (`mariadb` is accepted as an alias)
    pub driver: String,
    /// SQLite database file
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Name recorded in snapshot metadata instead of the session's database name
    pub name: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            path: Some("./site.db".to_string()),
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            name: None,
        }
    }
}

fn expand(value: &Option<String>) -> Result<Option<String>, SettingsError> {
    value.as_deref().map(expand_env_vars).transpose()
}

impl DatabaseSettings {
    /// Resolve into a driver connection configuration, expanding environment variables
    pub fn connection_config(&self) -> Result<ConnectionConfig, SettingsError> {
        match self.driver.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => {
                let path = expand(&self.path)?
                    .or(expand(&self.database)?)
                    .unwrap_or_else(|| "./site.db".to_string());
                Ok(ConnectionConfig::new_sqlite(&path))
            }
            "mysql" | "mariadb" => {
                let host = expand(&self.host)?.unwrap_or_else(|| "localhost".to_string());
                let database = expand(&self.database)?.unwrap_or_default();
                let user = expand(&self.user)?.unwrap_or_else(|| "root".to_string());
                let mut config =
                    ConnectionConfig::new_mysql(&host, self.port.unwrap_or(3306), &database, &user);
                if database.is_empty() {
                    config.database = None;
                }
                config.password = expand(&self.password)?;
                Ok(config)
            }
            other => Err(SettingsError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn metadata_name(&self) -> Result<Option<String>, SettingsError> {
        expand(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub continue_on_error: bool,
    pub atomic: bool,
}

impl ImportSettings {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            policy: if self.continue_on_error {
                ErrorPolicy::ContinueOnError
            } else {
                ErrorPolicy::FailFast
            },
            atomic: self.atomic,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Directory for daily-rotated JSON log files
    pub dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from an explicit path or the default locations.
    ///
    /// Without an explicit path, searches `./sitevault.toml` then
    /// `<config dir>/sitevault/config.toml`, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local_config = PathBuf::from("sitevault.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sitevault").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand `${VAR}` and `$VAR` references; a lone `$` is kept
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
