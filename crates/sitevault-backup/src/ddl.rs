//! CREATE TABLE synthesis from column descriptors

use thiserror::Error;

use crate::artifact::{ColumnDefault, ColumnDescriptor};

/// Errors from DDL synthesis
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DdlError {
    #[error("Table '{0}' has no columns to create")]
    NoColumns(String),

    #[error("Empty identifier in structure of table '{0}'")]
    EmptyIdentifier(String),
}

/// SQL flavor the statement is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DdlDialect {
    /// ANSI double-quoted identifiers, MySQL-style `AUTO_INCREMENT`
    #[default]
    Generic,
    MySql,
    Sqlite,
}

impl DdlDialect {
    /// Dialect for a driver name as reported by `Connection::driver_name`
    pub fn for_driver(driver: &str) -> Self {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => DdlDialect::MySql,
            "sqlite" | "sqlite3" => DdlDialect::Sqlite,
            _ => DdlDialect::Generic,
        }
    }

    /// Quote an identifier, doubling any embedded quote character
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            DdlDialect::MySql => format!("`{}`", name.replace('`', "``")),
            DdlDialect::Generic | DdlDialect::Sqlite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
        }
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn render_default(default: &ColumnDefault) -> Option<String> {
    match default {
        ColumnDefault::None => None,
        ColumnDefault::Literal(value) => Some(format!("DEFAULT {}", quote_literal(value))),
        ColumnDefault::Expression(expression) => Some(format!("DEFAULT {}", expression.as_sql())),
    }
}

/// Build a `CREATE TABLE` statement from a table's structure.
///
/// Columns keep their descriptor order. Per column the clauses are, in order:
/// `NOT NULL`, `DEFAULT`, `AUTO_INCREMENT`, `PRIMARY KEY`. Composite keys collapse
/// into one table-level `PRIMARY KEY (..)`. Declared types are passed through untouched.
pub fn synthesize_create_table(
    table: &str,
    columns: &[ColumnDescriptor],
    dialect: DdlDialect,
) -> Result<String, DdlError> {
    if table.is_empty() {
        return Err(DdlError::EmptyIdentifier(table.to_string()));
    }
    if columns.is_empty() {
        return Err(DdlError::NoColumns(table.to_string()));
    }
    if columns.iter().any(|c| c.name.is_empty()) {
        return Err(DdlError::EmptyIdentifier(table.to_string()));
    }

    let primary: Vec<&ColumnDescriptor> = columns.iter().filter(|c| c.is_primary()).collect();
    let composite_key = primary.len() > 1;

    let mut definitions: Vec<String> = columns
        .iter()
        .map(|column| render_column(column, dialect, composite_key))
        .collect();

    if composite_key {
        let key_columns: Vec<String> = primary
            .iter()
            .map(|c| dialect.quote_identifier(&c.name))
            .collect();
        definitions.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        dialect.quote_identifier(table),
        definitions.join(", ")
    ))
}

fn render_column(column: &ColumnDescriptor, dialect: DdlDialect, composite_key: bool) -> String {
    let mut parts = vec![dialect.quote_identifier(&column.name)];
    if !column.data_type.trim().is_empty() {
        parts.push(column.data_type.clone());
    }

    if !column.is_nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = render_default(&column.default_value) {
        parts.push(default);
    }

    let inline_key = column.is_primary() && !composite_key;
    match dialect {
        DdlDialect::Sqlite => {
            // SQLite only accepts AUTOINCREMENT on a lone INTEGER PRIMARY KEY.
            let rowid_alias = column.data_type.trim().eq_ignore_ascii_case("INTEGER");
            if inline_key {
                parts.push("PRIMARY KEY".to_string());
                if column.is_auto_increment && rowid_alias {
                    parts.push("AUTOINCREMENT".to_string());
                }
            } else if column.is_auto_increment {
                tracing::debug!(column = %column.name, "dropping auto-increment flag unsupported by SQLite");
            }
        }
        DdlDialect::Generic | DdlDialect::MySql => {
            if column.is_auto_increment {
                parts.push("AUTO_INCREMENT".to_string());
            }
            if inline_key {
                parts.push("PRIMARY KEY".to_string());
            }
        }
    }

    parts.join(" ")
}
