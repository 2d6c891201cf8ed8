//! MySQL schema introspection via information_schema

use async_trait::async_trait;
use sitevault_core::{ColumnInfo, Connection, Result, SchemaIntrospection, TableInfo, Value};

use crate::MySqlConnection;

/// `TABLE_SCHEMA = ?` when a database is known, otherwise the session's `DATABASE()`
fn schema_filter(schema: Option<&str>) -> (&'static str, Vec<Value>) {
    match schema {
        Some(db) => ("TABLE_SCHEMA = ?", vec![Value::String(db.to_string())]),
        None => ("TABLE_SCHEMA = DATABASE()", Vec::new()),
    }
}

#[async_trait]
impl SchemaIntrospection for MySqlConnection {
    /// Base tables ordered by name, matching `SHOW TABLES`
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let schema = schema.or(self.default_database());
        let (filter, params) = schema_filter(schema);
        let query = format!(
            "SELECT TABLE_NAME
             FROM information_schema.TABLES
             WHERE {} AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
            filter
        );

        let result = self.query(&query, &params).await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.get(0).and_then(|v| v.as_str())?;
                Some(TableInfo {
                    schema: schema.map(|s| s.to_string()),
                    ..TableInfo::base_table(name)
                })
            })
            .collect();

        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    /// The server does the comparison, so `lower_case_table_names` applies
    #[tracing::instrument(skip(self))]
    async fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        let schema = schema.or(self.default_database());
        let (filter, mut params) = schema_filter(schema);
        params.push(Value::String(table.to_string()));
        let query = format!(
            "SELECT 1
             FROM information_schema.TABLES
             WHERE {} AND TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = ?",
            filter
        );

        Ok(self.query(&query, &params).await?.has_rows())
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        let schema = schema.or(self.default_database());
        let (filter, mut params) = schema_filter(schema);
        params.push(Value::String(table.to_string()));
        // COLUMN_TYPE keeps length and unsigned modifiers (`int(10) unsigned`) for DDL reuse.
        let query = format!(
            "SELECT
                COLUMN_NAME,
                ORDINAL_POSITION,
                COLUMN_TYPE,
                IS_NULLABLE,
                COLUMN_DEFAULT,
                COLUMN_KEY,
                EXTRA
             FROM information_schema.COLUMNS
             WHERE {} AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
            filter
        );

        let result = self.query(&query, &params).await?;

        let columns = result
            .rows
            .iter()
            .map(|row| {
                let name = row
                    .get(0)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let ordinal = row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize;
                let data_type = row
                    .get(2)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let nullable = row.get(3).and_then(|v| v.as_str()).unwrap_or("NO") == "YES";
                let default_value = row.get(4).and_then(|v| v.as_str()).map(|s| s.to_string());
                let column_key = row.get(5).and_then(|v| v.as_str()).unwrap_or("");
                let extra = row.get(6).and_then(|v| v.as_str()).unwrap_or("");

                ColumnInfo {
                    name,
                    // information_schema positions are 1-based
                    ordinal: ordinal.saturating_sub(1),
                    data_type,
                    nullable,
                    default_value,
                    is_primary_key: column_key == "PRI",
                    is_auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
                }
            })
            .collect();

        Ok(columns)
    }
}
