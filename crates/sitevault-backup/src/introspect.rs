//! Catalog introspection for snapshots
//!
//! Wraps a connection's `SchemaIntrospection` and maps the driver's column metadata
//! onto artifact column descriptors.

use sitevault_core::{ColumnInfo, Connection, Result, SchemaIntrospection, VaultError};

use crate::artifact::{ColumnDefault, ColumnDescriptor, KeyRole};

/// Reads table lists and table structures from a live connection
pub struct SchemaIntrospector<'a> {
    connection: &'a dyn Connection,
    schema: Option<String>,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(connection: &'a dyn Connection) -> Self {
        Self {
            connection,
            schema: connection.database_name(),
        }
    }

    /// Introspect a named database instead of the session default
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        if schema.is_some() {
            self.schema = schema;
        }
        self
    }

    fn catalog(&self) -> Result<&'a dyn SchemaIntrospection> {
        self.connection.as_schema_introspection().ok_or_else(|| {
            VaultError::NotSupported(format!(
                "schema introspection is not available for driver '{}'",
                self.connection.driver_name()
            ))
        })
    }

    /// Base table names in catalog order
    #[tracing::instrument(skip(self), fields(driver = self.connection.driver_name()))]
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.catalog()?.list_tables(self.schema.as_deref()).await?;
        Ok(tables.into_iter().map(|t| t.name).collect())
    }

    /// Column descriptors for one table, in declared order.
    ///
    /// A catalog failure resolves to an empty structure; callers read rows regardless.
    pub async fn describe_table(&self, table: &str) -> Vec<ColumnDescriptor> {
        let columns = match self.catalog() {
            Ok(catalog) => catalog.get_columns(self.schema.as_deref(), table).await,
            Err(e) => Err(e),
        };

        match columns {
            Ok(mut columns) => {
                columns.sort_by_key(|c| c.ordinal);
                columns.into_iter().map(describe_column).collect()
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "could not read table structure");
                Vec::new()
            }
        }
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        self.catalog()?
            .table_exists(self.schema.as_deref(), table)
            .await
    }
}

/// Map catalog column metadata onto an artifact descriptor
pub fn describe_column(column: ColumnInfo) -> ColumnDescriptor {
    ColumnDescriptor {
        default_value: ColumnDefault::from_catalog(column.default_value.as_deref()),
        name: column.name,
        data_type: column.data_type,
        is_nullable: column.nullable,
        key_role: if column.is_primary_key {
            KeyRole::Primary
        } else {
            KeyRole::None
        },
        is_auto_increment: column.is_auto_increment,
    }
}
