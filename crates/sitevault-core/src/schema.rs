//! Schema introspection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection interface
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List all base tables in catalog order
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>>;

    /// Get columns for a table in their declared order
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Check whether a base table with this exact name exists
    async fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        let tables = self.list_tables(schema).await?;
        Ok(tables.iter().any(|t| t.name == table))
    }
}

/// Table information (basic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
    pub table_type: TableType,
}

impl TableInfo {
    pub fn base_table(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            table_type: TableType::Table,
        }
    }
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Table,
    View,
    System,
}

/// Column information as reported by the catalog
///
/// `default_value` is the raw catalog text (e.g. `'draft'` on SQLite, `draft` on MySQL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
}
