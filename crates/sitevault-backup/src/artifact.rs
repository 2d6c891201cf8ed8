//! Snapshot artifact structure
//!
//! One artifact holds a whole database: a metadata header, per-table column
//! descriptors, and per-table rows. `metadata.table_names` is the processing order
//! for both export and import; `structures` and `tables` are keyed lookups.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::scalar::Scalar;

/// Errors raised while reading or writing an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact is not valid JSON of the expected shape: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Artifact format version '{0}' is not a MAJOR.MINOR version")]
    InvalidVersion(String),

    #[error(
        "Artifact format version '{artifact_version}' is newer than the supported '{max_supported}'"
    )]
    TooNew {
        artifact_version: String,
        max_supported: String,
    },

    #[error("Table '{0}' is listed more than once in metadata.table_names")]
    DuplicateTable(String),

    #[error("Row {row} of table '{table}' has column '{column}' which the table's structure does not declare")]
    UnknownColumn {
        table: String,
        row: usize,
        column: String,
    },
}

/// Non-literal column defaults the synthesizer renders unquoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultExpression {
    CurrentTimestamp,
    CurrentDate,
    CurrentTime,
}

impl DefaultExpression {
    pub fn as_sql(&self) -> &'static str {
        match self {
            DefaultExpression::CurrentTimestamp => "CURRENT_TIMESTAMP",
            DefaultExpression::CurrentDate => "CURRENT_DATE",
            DefaultExpression::CurrentTime => "CURRENT_TIME",
        }
    }

    /// Recognize the spellings catalogs report for the built-in clock functions
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()" | "NOW()" | "LOCALTIMESTAMP"
            | "LOCALTIMESTAMP()" => Some(DefaultExpression::CurrentTimestamp),
            "CURRENT_DATE" | "CURRENT_DATE()" | "CURDATE()" => {
                Some(DefaultExpression::CurrentDate)
            }
            "CURRENT_TIME" | "CURRENT_TIME()" | "CURTIME()" => Some(DefaultExpression::CurrentTime),
            _ => None,
        }
    }
}

/// A column's default value
///
/// Serialized as a nullable JSON string: `null`, the literal text, or the
/// expression's SQL keyword.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnDefault {
    #[default]
    None,
    Literal(String),
    Expression(DefaultExpression),
}

impl ColumnDefault {
    pub fn literal(value: impl Into<String>) -> Self {
        ColumnDefault::Literal(value.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ColumnDefault::None)
    }

    /// Classify a raw catalog default.
    ///
    /// Surrounding single quotes (SQLite, MariaDB) are stripped with `''` unescaped;
    /// an unquoted `NULL` means no default.
    pub fn from_catalog(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ColumnDefault::None;
        };
        let trimmed = raw.trim();
        if let Some(expression) = DefaultExpression::parse(trimmed) {
            return ColumnDefault::Expression(expression);
        }
        if trimmed.eq_ignore_ascii_case("NULL") {
            return ColumnDefault::None;
        }
        if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
            let inner = &trimmed[1..trimmed.len() - 1];
            return ColumnDefault::Literal(inner.replace("''", "'"));
        }
        // Parenthesized numeric defaults such as SQLite's `DEFAULT (0)`
        if trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')') {
            let inner = trimmed[1..trimmed.len() - 1].trim();
            if inner.parse::<f64>().is_ok() {
                return ColumnDefault::Literal(inner.to_string());
            }
        }
        ColumnDefault::Literal(raw.to_string())
    }

    fn as_json_text(&self) -> Option<&str> {
        match self {
            ColumnDefault::None => None,
            ColumnDefault::Literal(s) => Some(s),
            ColumnDefault::Expression(e) => Some(e.as_sql()),
        }
    }
}

impl Serialize for ColumnDefault {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_json_text() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnDefault {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Hand-written artifacts may carry numeric or boolean defaults.
        let scalar = Option::<Scalar>::deserialize(deserializer)?;
        Ok(match scalar {
            None | Some(Scalar::Null) => ColumnDefault::None,
            Some(Scalar::String(s)) => match DefaultExpression::parse(&s) {
                Some(expression) => ColumnDefault::Expression(expression),
                None => ColumnDefault::Literal(s),
            },
            Some(Scalar::Integer(i)) => ColumnDefault::Literal(i.to_string()),
            Some(Scalar::Float(f)) => ColumnDefault::Literal(f.to_string()),
            Some(Scalar::Bool(b)) => ColumnDefault::Literal(if b { "1" } else { "0" }.to_string()),
        })
    }
}

/// Whether a column participates in the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
}

fn default_true() -> bool {
    true
}

/// One column of a table's structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type exactly as the catalog reported it
    pub data_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_value: ColumnDefault,
    #[serde(default)]
    pub key_role: KeyRole,
    #[serde(default)]
    pub is_auto_increment: bool,
}

impl ColumnDescriptor {
    /// A nullable, non-key column without a default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default_value: ColumnDefault::None,
            key_role: KeyRole::None,
            is_auto_increment: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.key_role = KeyRole::Primary;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default_value = default;
        self
    }

    pub fn is_primary(&self) -> bool {
        self.key_role == KeyRole::Primary
    }
}

/// One row of a table: ordered `(column, value)` pairs
///
/// Serialized as a JSON object whose key order follows `columns`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowRecord {
    columns: Vec<String>,
    values: Vec<Scalar>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from parallel column and value lists; extra entries on either side are dropped
    pub fn from_parts(columns: Vec<String>, values: Vec<Scalar>) -> Self {
        let len = columns.len().min(values.len());
        let mut columns = columns;
        let mut values = values;
        columns.truncate(len);
        values.truncate(len);
        Self { columns, values }
    }

    /// Set a cell, replacing an earlier value for the same column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RowRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = RowRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RowRecord, A::Error> {
                let mut row = RowRecord::default();
                while let Some((column, value)) = access.next_entry::<String, Scalar>()? {
                    if row.get(&column).is_some() {
                        return Err(de::Error::custom(format!(
                            "duplicate column '{}' in row",
                            column
                        )));
                    }
                    row.columns.push(column);
                    row.values.push(value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Artifact header
///
/// Only `table_names` is required on read; hand-written artifacts may omit the rest.
/// A missing `format_version` reads as the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_format_version")]
    pub format_version: String,
    #[serde(default)]
    pub database_name: String,
    pub table_names: Vec<String>,
    /// Set when the data came from the fallback dataset instead of a live database
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

fn default_format_version() -> String {
    SnapshotArtifact::FORMAT_VERSION.to_string()
}

/// Pulls the version out before the full parse so version errors win over shape errors.
#[derive(Deserialize)]
struct VersionProbe {
    metadata: Option<MetadataVersionProbe>,
}

#[derive(Deserialize)]
struct MetadataVersionProbe {
    format_version: Option<String>,
}

/// A whole-database snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotArtifact {
    pub metadata: SnapshotMetadata,
    #[serde(default)]
    pub structures: IndexMap<String, Vec<ColumnDescriptor>>,
    #[serde(default)]
    pub tables: IndexMap<String, Vec<RowRecord>>,
}

impl SnapshotArtifact {
    /// Format version written by this build
    pub const FORMAT_VERSION: &'static str = "1.0";

    /// An empty artifact with a metadata header
    pub fn new(database_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            metadata: SnapshotMetadata {
                timestamp,
                format_version: Self::FORMAT_VERSION.to_string(),
                database_name: database_name.into(),
                table_names: Vec::new(),
                synthetic: false,
            },
            structures: IndexMap::new(),
            tables: IndexMap::new(),
        }
    }

    /// Append a table; its position in `table_names` is the call order
    pub fn push_table(
        &mut self,
        name: impl Into<String>,
        structure: Vec<ColumnDescriptor>,
        rows: Vec<RowRecord>,
    ) {
        let name = name.into();
        if !self.metadata.table_names.contains(&name) {
            self.metadata.table_names.push(name.clone());
        }
        self.structures.insert(name.clone(), structure);
        self.tables.insert(name, rows);
    }

    pub fn table_names(&self) -> &[String] {
        &self.metadata.table_names
    }

    /// Structure for a table; empty when unknown
    pub fn structure(&self, table: &str) -> &[ColumnDescriptor] {
        self.structures.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows for a table; a missing entry means no rows
    pub fn rows(&self, table: &str) -> &[RowRecord] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_rows(&self) -> usize {
        self.metadata
            .table_names
            .iter()
            .map(|name| self.rows(name).len())
            .sum()
    }

    pub fn is_synthetic(&self) -> bool {
        self.metadata.synthetic
    }

    /// `backup-YYYY-MM-DD.json`, dated by the artifact timestamp
    pub fn suggested_filename(&self) -> String {
        format!("backup-{}.json", self.metadata.timestamp.format("%Y-%m-%d"))
    }

    /// Parse and validate an artifact from raw bytes
    pub fn from_slice(data: &[u8]) -> Result<Self, ArtifactError> {
        let probe: VersionProbe = serde_json::from_slice(data)?;
        if let Some(version) = probe.metadata.and_then(|m| m.format_version) {
            Self::check_version(&version)?;
        }

        let artifact: Self = serde_json::from_slice(data)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        Self::from_slice(json.as_bytes())
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ArtifactError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Reject versions newer than `FORMAT_VERSION`, comparing MAJOR then MINOR
    fn check_version(version: &str) -> Result<(), ArtifactError> {
        fn parse_version(v: &str) -> Option<(u64, u64)> {
            let mut parts = v.trim().splitn(2, '.');
            let major: u64 = parts.next()?.parse().ok()?;
            let minor: u64 = parts.next().unwrap_or("0").parse().ok()?;
            Some((major, minor))
        }

        let (artifact_major, artifact_minor) = parse_version(version)
            .ok_or_else(|| ArtifactError::InvalidVersion(version.to_string()))?;
        let (our_major, our_minor) = parse_version(Self::FORMAT_VERSION).unwrap_or((1, 0));

        if artifact_major > our_major || (artifact_major == our_major && artifact_minor > our_minor)
        {
            return Err(ArtifactError::TooNew {
                artifact_version: version.to_string(),
                max_supported: Self::FORMAT_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// Structural checks that JSON shape alone cannot express
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let mut seen = HashSet::new();
        for name in &self.metadata.table_names {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::DuplicateTable(name.clone()));
            }

            let structure = self.structure(name);
            if structure.is_empty() {
                continue;
            }
            let declared: HashSet<&str> = structure.iter().map(|c| c.name.as_str()).collect();
            for (idx, row) in self.rows(name).iter().enumerate() {
                if let Some(column) = row.columns().iter().find(|c| !declared.contains(c.as_str()))
                {
                    return Err(ArtifactError::UnknownColumn {
                        table: name.clone(),
                        row: idx,
                        column: column.clone(),
                    });
                }
            }
        }

        for orphan in self.tables.keys().filter(|k| !seen.contains(k.as_str())) {
            tracing::warn!(table = %orphan, "artifact carries rows for a table not listed in table_names; ignoring");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const WIDGETS: &str = r#"{
        "metadata": {
            "timestamp": "2024-01-01T00:00:00Z",
            "format_version": "1.0",
            "database_name": "x",
            "table_names": ["widgets"]
        },
        "structures": {
            "widgets": [
                {"name": "id", "data_type": "int", "key_role": "primary"},
                {"name": "label", "data_type": "varchar(20)"}
            ]
        },
        "tables": {
            "widgets": [{"id": 1, "label": "A"}, {"id": 2, "label": "B"}]
        }
    }"#;

    #[test]
    fn test_minimal_descriptors_take_defaults() {
        let artifact = SnapshotArtifact::from_json_str(WIDGETS).unwrap();
        let structure = artifact.structure("widgets");

        assert_eq!(structure.len(), 2);
        assert!(structure[0].is_primary());
        assert!(structure[0].is_nullable);
        assert!(!structure[0].is_auto_increment);
        assert_eq!(structure[1].default_value, ColumnDefault::None);
        assert_eq!(structure[1].key_role, KeyRole::None);

        let rows = artifact.rows("widgets");
        assert_eq!(rows[1].get("label"), Some(&Scalar::from("B")));
        assert_eq!(artifact.total_rows(), 2);
        assert!(!artifact.is_synthetic());
    }

    #[test]
    fn test_row_key_order_is_preserved() {
        let row: RowRecord =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": null}"#).unwrap();
        assert_eq!(row.columns(), &["zeta", "alpha", "mid"]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"zeta":1,"alpha":2,"mid":null}"#
        );
    }

    #[test]
    fn test_duplicate_row_keys_rejected() {
        assert!(serde_json::from_str::<RowRecord>(r#"{"a": 1, "a": 2}"#).is_err());
    }

    #[test]
    fn test_newer_minor_version_rejected() {
        let json = WIDGETS.replace(r#""format_version": "1.0""#, r#""format_version": "1.1""#);
        assert!(matches!(
            SnapshotArtifact::from_json_str(&json),
            Err(ArtifactError::TooNew { .. })
        ));
    }

    #[test]
    fn test_older_and_equal_versions_accepted() {
        let json = WIDGETS.replace(r#""format_version": "1.0""#, r#""format_version": "0.9""#);
        assert!(SnapshotArtifact::from_json_str(&json).is_ok());
    }

    #[test]
    fn test_garbage_version_rejected() {
        let json = WIDGETS.replace(r#""format_version": "1.0""#, r#""format_version": "latest""#);
        assert!(matches!(
            SnapshotArtifact::from_json_str(&json),
            Err(ArtifactError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_minimal_metadata_accepted() {
        let json = r#"{
            "metadata": {"table_names": ["widgets"]},
            "tables": {"widgets": [{"id": 1}]}
        }"#;
        let artifact = SnapshotArtifact::from_json_str(json).unwrap();
        assert_eq!(artifact.metadata.format_version, SnapshotArtifact::FORMAT_VERSION);
        assert_eq!(artifact.metadata.database_name, "");
        assert_eq!(artifact.metadata.timestamp, DateTime::<Utc>::default());
        assert_eq!(artifact.total_rows(), 1);
    }

    #[test]
    fn test_missing_table_names_is_a_parse_error() {
        let json = r#"{"metadata": {"format_version": "1.0"}, "tables": {}}"#;
        assert!(matches!(
            SnapshotArtifact::from_json_str(json),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn test_not_json_is_a_parse_error() {
        assert!(matches!(
            SnapshotArtifact::from_slice(b"PK\x03\x04 not json"),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_shape_is_a_parse_error() {
        let json = r#"{"metadata": {"format_version": "1.0"}, "tables": []}"#;
        assert!(matches!(
            SnapshotArtifact::from_json_str(json),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_table_names_rejected() {
        let json = WIDGETS.replace(r#"["widgets"]"#, r#"["widgets", "widgets"]"#);
        assert!(matches!(
            SnapshotArtifact::from_json_str(&json),
            Err(ArtifactError::DuplicateTable(name)) if name == "widgets"
        ));
    }

    #[test]
    fn test_undeclared_row_column_rejected() {
        let json = WIDGETS.replace(r#"{"id": 2, "label": "B"}"#, r#"{"id": 2, "colour": "B"}"#);
        match SnapshotArtifact::from_json_str(&json) {
            Err(ArtifactError::UnknownColumn { table, row, column }) => {
                assert_eq!((table.as_str(), row, column.as_str()), ("widgets", 1, "colour"));
            }
            other => panic!("expected UnknownColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_without_structure_are_accepted() {
        let json = r#"{
            "metadata": {
                "timestamp": "2024-01-01T00:00:00Z",
                "format_version": "1.0",
                "database_name": "x",
                "table_names": ["widgets"]
            },
            "structures": {"widgets": []},
            "tables": {"widgets": [{"id": 1, "anything": "A"}, {"other": 2}]}
        }"#;
        let artifact = SnapshotArtifact::from_json_str(json).unwrap();
        assert!(artifact.structure("widgets").is_empty());
        assert_eq!(artifact.rows("widgets").len(), 2);
    }

    #[rstest::rstest]
    #[case(None, ColumnDefault::None)]
    #[case(Some("NULL"), ColumnDefault::None)]
    #[case(Some("'draft'"), ColumnDefault::literal("draft"))]
    #[case(Some("'it''s'"), ColumnDefault::literal("it's"))]
    #[case(Some("draft"), ColumnDefault::literal("draft"))]
    #[case(Some("0"), ColumnDefault::literal("0"))]
    #[case(Some("(5)"), ColumnDefault::literal("5"))]
    #[case(Some("CURRENT_TIMESTAMP"), ColumnDefault::Expression(DefaultExpression::CurrentTimestamp))]
    #[case(Some("current_timestamp()"), ColumnDefault::Expression(DefaultExpression::CurrentTimestamp))]
    #[case(Some("NOW()"), ColumnDefault::Expression(DefaultExpression::CurrentTimestamp))]
    #[case(Some("CURRENT_DATE"), ColumnDefault::Expression(DefaultExpression::CurrentDate))]
    #[case(Some("CURRENT_TIME"), ColumnDefault::Expression(DefaultExpression::CurrentTime))]
    fn test_catalog_default_classification(
        #[case] raw: Option<&str>,
        #[case] expected: ColumnDefault,
    ) {
        assert_eq!(ColumnDefault::from_catalog(raw), expected);
    }

    #[test]
    fn test_defaults_serialize_as_nullable_strings() {
        let columns = vec![
            ColumnDescriptor::new("a", "TEXT"),
            ColumnDescriptor::new("b", "TEXT").default_value(ColumnDefault::literal("x")),
            ColumnDescriptor::new("c", "DATETIME")
                .default_value(ColumnDefault::Expression(DefaultExpression::CurrentTimestamp)),
        ];
        let json = serde_json::to_value(&columns).unwrap();
        assert_eq!(json[0]["default_value"], serde_json::Value::Null);
        assert_eq!(json[1]["default_value"], "x");
        assert_eq!(json[2]["default_value"], "CURRENT_TIMESTAMP");

        let back: Vec<ColumnDescriptor> = serde_json::from_value(json).unwrap();
        assert_eq!(back, columns);
    }

    #[test]
    fn test_numeric_default_in_hand_written_artifact() {
        let column: ColumnDescriptor =
            serde_json::from_str(r#"{"name": "qty", "data_type": "INTEGER", "default_value": 0}"#)
                .unwrap();
        assert_eq!(column.default_value, ColumnDefault::literal("0"));
    }

    #[test]
    fn test_synthetic_flag_only_written_when_set() {
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 0).unwrap();
        let mut artifact = SnapshotArtifact::new("agency", at);
        let json = String::from_utf8(artifact.to_json_vec().unwrap()).unwrap();
        assert!(!json.contains("synthetic"));

        artifact.metadata.synthetic = true;
        let json = String::from_utf8(artifact.to_json_vec().unwrap()).unwrap();
        assert!(json.contains(r#""synthetic": true"#));
        assert_eq!(artifact.suggested_filename(), "backup-2024-06-30.json");
    }

    #[test]
    fn test_push_table_keeps_call_order() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut artifact = SnapshotArtifact::new("agency", at);
        artifact.push_table("pages", vec![], vec![]);
        artifact.push_table("menus", vec![], vec![RowRecord::new().with("id", 1)]);
        assert_eq!(artifact.table_names(), &["pages", "menus"]);
        assert_eq!(artifact.total_rows(), 1);
    }
}
