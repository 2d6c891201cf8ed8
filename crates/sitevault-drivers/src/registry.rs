//! Driver registry for managing available database drivers

use sitevault_core::{ConnectionConfig, DatabaseDriver, Result, VaultError};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available database drivers
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "mysql")]
        registry.register(Arc::new(crate::mysql::MySqlDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name; "mariadb" resolves to the MySQL driver
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let key = match name.to_ascii_lowercase().as_str() {
            "mariadb" => "mysql".to_string(),
            "sqlite3" => "sqlite".to_string(),
            other => other.to_string(),
        };
        let driver = self.drivers.get(&key).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Get the driver a configuration asks for
    pub fn for_config(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(&config.driver).ok_or_else(|| {
            let mut known = self.list();
            known.sort_unstable();
            VaultError::Configuration(format!(
                "Unknown database driver '{}' (available: {})",
                config.driver,
                known.join(", ")
            ))
        })
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "sqlite", feature = "mysql"))]
    #[test]
    fn test_defaults_register_both_drivers() {
        let registry = DriverRegistry::with_defaults();
        assert!(registry.has("sqlite"));
        assert!(registry.has("mysql"));
        assert_eq!(registry.get("MariaDB").map(|d| d.name()), Some("mysql"));
    }

    #[test]
    fn test_unknown_driver_is_a_configuration_error() {
        let registry = DriverRegistry::new();
        let config = ConnectionConfig::new("oracle", "Oracle");
        assert!(matches!(
            registry.for_config(&config),
            Err(VaultError::Configuration(_))
        ));
    }
}
