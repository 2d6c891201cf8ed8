//! Fixed sample dataset served when the live database cannot be reached
//!
//! Export never fails outright: without a session the engine returns this artifact,
//! flagged `synthetic`, so the caller still gets a well-formed download.

use chrono::{DateTime, Utc};

use crate::artifact::{
    ColumnDefault, ColumnDescriptor, DefaultExpression, RowRecord, SnapshotArtifact,
};
use crate::scalar::Scalar;

fn id_column() -> ColumnDescriptor {
    ColumnDescriptor::new("id", "INTEGER")
        .not_null()
        .auto_increment()
        .primary_key()
}

fn created_at_column() -> ColumnDescriptor {
    ColumnDescriptor::new("created_at", "DATETIME")
        .default_value(ColumnDefault::Expression(DefaultExpression::CurrentTimestamp))
}

fn row(cells: &[(&str, Scalar)]) -> RowRecord {
    cells
        .iter()
        .fold(RowRecord::new(), |row, (column, value)| row.with(*column, value.clone()))
}

fn menus() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("label", "VARCHAR(100)").not_null(),
        ColumnDescriptor::new("url", "VARCHAR(255)").not_null(),
        ColumnDescriptor::new("position", "INTEGER")
            .not_null()
            .default_value(ColumnDefault::literal("0")),
    ];
    let rows = vec![
        row(&[
            ("id", 1.into()),
            ("label", "Home".into()),
            ("url", "/".into()),
            ("position", 1.into()),
        ]),
        row(&[
            ("id", 2.into()),
            ("label", "Services".into()),
            ("url", "/services".into()),
            ("position", 2.into()),
        ]),
        row(&[
            ("id", 3.into()),
            ("label", "Blog".into()),
            ("url", "/blog".into()),
            ("position", 3.into()),
        ]),
        row(&[
            ("id", 4.into()),
            ("label", "Contact".into()),
            ("url", "/contact".into()),
            ("position", 4.into()),
        ]),
    ];
    (structure, rows)
}

fn pages() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("slug", "VARCHAR(150)").not_null(),
        ColumnDescriptor::new("title", "VARCHAR(200)").not_null(),
        ColumnDescriptor::new("body", "TEXT"),
        ColumnDescriptor::new("status", "VARCHAR(20)")
            .not_null()
            .default_value(ColumnDefault::literal("draft")),
        created_at_column(),
    ];
    let rows = vec![
        row(&[
            ("id", 1.into()),
            ("slug", "home".into()),
            ("title", "Welcome".into()),
            ("body", "We build websites that work as hard as you do.".into()),
            ("status", "published".into()),
            ("created_at", "2024-01-01 09:00:00".into()),
        ]),
        row(&[
            ("id", 2.into()),
            ("slug", "about".into()),
            ("title", "About Us".into()),
            ("body", "A small studio for design, development and hosting.".into()),
            ("status", "published".into()),
            ("created_at", "2024-01-01 09:05:00".into()),
        ]),
    ];
    (structure, rows)
}

fn blog_posts() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("title", "VARCHAR(200)").not_null(),
        ColumnDescriptor::new("excerpt", "VARCHAR(500)"),
        ColumnDescriptor::new("author", "VARCHAR(100)"),
        ColumnDescriptor::new("published", "BOOLEAN")
            .not_null()
            .default_value(ColumnDefault::literal("0")),
        created_at_column(),
    ];
    let rows = vec![
        row(&[
            ("id", 1.into()),
            ("title", "Five signs your site needs a refresh".into()),
            ("excerpt", "Slow pages and stale copy cost you leads.".into()),
            ("author", "Studio Team".into()),
            ("published", true.into()),
            ("created_at", "2024-02-12 10:30:00".into()),
        ]),
        row(&[
            ("id", 2.into()),
            ("title", "Draft: hosting checklist".into()),
            ("excerpt", Scalar::Null),
            ("author", "Studio Team".into()),
            ("published", false.into()),
            ("created_at", "2024-03-04 16:00:00".into()),
        ]),
    ];
    (structure, rows)
}

fn demos() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("name", "VARCHAR(150)").not_null(),
        ColumnDescriptor::new("category", "VARCHAR(50)"),
        ColumnDescriptor::new("preview_url", "VARCHAR(255)"),
    ];
    let rows = vec![
        row(&[
            ("id", 1.into()),
            ("name", "Restaurant landing page".into()),
            ("category", "hospitality".into()),
            ("preview_url", "/demos/restaurant".into()),
        ]),
        row(&[
            ("id", 2.into()),
            ("name", "Dental clinic booking".into()),
            ("category", "health".into()),
            ("preview_url", "/demos/clinic".into()),
        ]),
    ];
    (structure, rows)
}

fn appointments() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("client_name", "VARCHAR(150)").not_null(),
        ColumnDescriptor::new("email", "VARCHAR(200)").not_null(),
        ColumnDescriptor::new("scheduled_for", "DATETIME").not_null(),
        ColumnDescriptor::new("status", "VARCHAR(20)")
            .not_null()
            .default_value(ColumnDefault::literal("pending")),
    ];
    let rows = vec![row(&[
        ("id", 1.into()),
        ("client_name", "Jordan Example".into()),
        ("email", "jordan@example.com".into()),
        ("scheduled_for", "2024-04-15 14:00:00".into()),
        ("status", "confirmed".into()),
    ])];
    (structure, rows)
}

fn newsletters() -> (Vec<ColumnDescriptor>, Vec<RowRecord>) {
    let structure = vec![
        id_column(),
        ColumnDescriptor::new("email", "VARCHAR(200)").not_null(),
        ColumnDescriptor::new("subscribed", "BOOLEAN")
            .not_null()
            .default_value(ColumnDefault::literal("1")),
        created_at_column(),
    ];
    let rows = vec![
        row(&[
            ("id", 1.into()),
            ("email", "reader@example.com".into()),
            ("subscribed", true.into()),
            ("created_at", "2024-01-20 08:15:00".into()),
        ]),
        row(&[
            ("id", 2.into()),
            ("email", "former@example.org".into()),
            ("subscribed", false.into()),
            ("created_at", "2024-02-02 19:45:00".into()),
        ]),
    ];
    (structure, rows)
}

/// Tables covered by the sample dataset, in artifact order
pub const FALLBACK_TABLES: [&str; 6] = [
    "menus",
    "pages",
    "blog_posts",
    "demos",
    "appointments",
    "newsletters",
];

/// Build the sample artifact stamped with `timestamp`
pub fn fallback_artifact(timestamp: DateTime<Utc>, database_name: &str) -> SnapshotArtifact {
    let mut artifact = SnapshotArtifact::new(database_name, timestamp);
    artifact.metadata.synthetic = true;

    let builders: [fn() -> (Vec<ColumnDescriptor>, Vec<RowRecord>); 6] =
        [menus, pages, blog_posts, demos, appointments, newsletters];
    for (name, build) in FALLBACK_TABLES.iter().zip(builders) {
        let (structure, rows) = build();
        artifact.push_table(*name, structure, rows);
    }
    artifact
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_covers_core_tables_in_order() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let artifact = fallback_artifact(at, "agency_site");

        assert_eq!(artifact.table_names(), &FALLBACK_TABLES);
        assert!(artifact.is_synthetic());
        assert_eq!(artifact.metadata.format_version, SnapshotArtifact::FORMAT_VERSION);
        assert_eq!(artifact.metadata.timestamp, at);
        for table in FALLBACK_TABLES {
            assert!(!artifact.structure(table).is_empty(), "{table} has no structure");
            assert!(!artifact.rows(table).is_empty(), "{table} has no rows");
        }
    }

    #[test]
    fn test_deterministic_and_valid() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let first = fallback_artifact(at, "agency_site");
        let second = fallback_artifact(at, "agency_site");
        assert_eq!(first, second);

        let bytes = first.to_json_vec().unwrap();
        let parsed = SnapshotArtifact::from_slice(&bytes).unwrap();
        assert_eq!(parsed, first);
    }
}
