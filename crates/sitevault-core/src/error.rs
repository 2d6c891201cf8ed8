//! Error types for SiteVault

use thiserror::Error;

/// Core error type shared by drivers and the backup engine
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// True when the error means the database could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(self, VaultError::Connection(_))
    }
}

/// Result type alias for SiteVault operations
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(VaultError::Connection("refused".into()).is_connectivity());
        assert!(!VaultError::Query("syntax".into()).is_connectivity());
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = VaultError::Query("no such table: widgets".into());
        assert_eq!(err.to_string(), "Query error: no such table: widgets");
    }
}
