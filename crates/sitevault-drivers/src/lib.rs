//! SiteVault Drivers - Database driver implementations
//!
//! Concrete implementations of the driver traits defined in `sitevault-core`,
//! selected by cargo feature.

#[cfg(feature = "mysql")]
pub use sitevault_driver_mysql as mysql;
#[cfg(feature = "sqlite")]
pub use sitevault_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from sitevault-core
pub use sitevault_core::{
    ColumnMeta, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities, QueryResult,
    Result, Row, SchemaIntrospection, StatementResult, Transaction, Value, VaultError,
};
