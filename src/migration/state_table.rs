//! Migration state table management
//!
//! The tracking table holds one row per applied revision:
//!
//! | column        | type           |                     |
//! |---------------|----------------|---------------------|
//! | `version_num` | `VARCHAR(36)`  | primary key         |
//! | `applied_at`  | `TIMESTAMP`    | not null, UTC       |
//! | `description` | `VARCHAR(255)` | nullable            |

use crate::executor::{ExecError, SqlExecutor};
use crate::migration::store::{AppliedRecord, RevisionStore};
use crate::migration::MigrationError;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use sea_query::{Alias, ColumnDef, Expr, Index, IndexCreateStatement, Table, TableCreateStatement};
use std::fmt;
use std::sync::LazyLock;

/// Default tracking table name
pub const DEFAULT_TABLE_NAME: &str = "custom_migration_version";

const DESCRIPTION_MAX_LEN: usize = 255;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier pattern")
});

/// A tracking table name that is safe to interpolate into SQL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validate a table name
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidTableName` unless the name is a plain identifier.
    pub fn parse(name: &str) -> Result<Self, MigrationError> {
        if IDENTIFIER.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(MigrationError::InvalidTableName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name double-quoted for use in SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    fn index_name(&self) -> String {
        format!("idx_{}_applied_at", self.0)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE_NAME.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `CREATE TABLE IF NOT EXISTS` for the tracking table
pub fn create_state_table(table: &TableName) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(table.as_str()))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("version_num"))
                .string_len(36)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Alias::new("applied_at")).timestamp().not_null())
        .col(ColumnDef::new(Alias::new("description")).string_len(255).null())
        .to_owned()
}

/// Index on `applied_at`, which orders the applied set
pub fn create_state_table_index(table: &TableName) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(table.index_name())
        .table(Alias::new(table.as_str()))
        .col(Expr::col(Alias::new("applied_at")))
        .to_owned()
}

/// `RevisionStore` over the tracking table, using a borrowed executor
///
/// Statements run on whatever session the executor wraps: inside the engine's
/// per-revision transaction a write commits with the revision's procedure,
/// otherwise each write commits on its own.
pub struct PgRevisionStore<'a> {
    executor: &'a dyn SqlExecutor,
    table: TableName,
}

impl<'a> PgRevisionStore<'a> {
    pub fn new(executor: &'a dyn SqlExecutor, table: TableName) -> Self {
        Self { executor, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }
}

impl RevisionStore for PgRevisionStore<'_> {
    fn ensure_table(&self) -> Result<(), MigrationError> {
        let table_sql = create_state_table(&self.table).build(sea_query::PostgresQueryBuilder);
        self.executor.execute(&table_sql, &[])?;

        let index_sql =
            create_state_table_index(&self.table).build(sea_query::PostgresQueryBuilder);
        self.executor.execute(&index_sql, &[])?;
        Ok(())
    }

    fn table_exists(&self) -> Result<bool, MigrationError> {
        let row = self.executor.query_one(
            "SELECT EXISTS (SELECT FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
            &[&self.table.as_str()],
        )?;
        let exists: bool = row
            .try_get(0)
            .map_err(|e| ExecError::Parse(format!("table existence flag: {e}")))?;
        Ok(exists)
    }

    fn applied_records(&self) -> Result<Vec<AppliedRecord>, MigrationError> {
        if !self.table_exists()? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT version_num, applied_at::text, description FROM {} \
             ORDER BY applied_at ASC, version_num ASC",
            self.table.quoted()
        );
        let rows = self.executor.query_all(&sql, &[])?;

        rows.iter()
            .map(|row| -> Result<AppliedRecord, MigrationError> {
                let revision: String = row
                    .try_get(0)
                    .map_err(|e| ExecError::Parse(format!("version_num: {e}")))?;
                let applied_at: String = row
                    .try_get(1)
                    .map_err(|e| ExecError::Parse(format!("applied_at: {e}")))?;
                let description: Option<String> = row
                    .try_get(2)
                    .map_err(|e| ExecError::Parse(format!("description: {e}")))?;
                Ok(AppliedRecord {
                    revision,
                    applied_at: parse_timestamp(&applied_at)?,
                    description,
                })
            })
            .collect()
    }

    fn mark_applied(
        &self,
        revision: &str,
        description: Option<&str>,
    ) -> Result<(), MigrationError> {
        let sql = format!(
            "INSERT INTO {} (version_num, applied_at, description) \
             VALUES ($1, clock_timestamp() AT TIME ZONE 'UTC', $2) \
             ON CONFLICT (version_num) DO NOTHING",
            self.table.quoted()
        );
        let description = description.map(truncate_description);
        let inserted = self
            .executor
            .execute(&sql, &[&revision, &description.as_deref()])?;

        if inserted == 0 {
            return Err(MigrationError::DuplicateRevision {
                revision: revision.to_string(),
            });
        }
        Ok(())
    }

    fn unmark_applied(&self, revision: &str) -> Result<(), MigrationError> {
        let sql = format!("DELETE FROM {} WHERE version_num = $1", self.table.quoted());
        let deleted = self.executor.execute(&sql, &[&revision])?;
        if deleted == 0 {
            log::debug!("Revision {revision} was not recorded; nothing to delete");
        }
        Ok(())
    }

    fn current_head(&self) -> Result<Option<String>, MigrationError> {
        if !self.table_exists()? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT version_num FROM {} ORDER BY applied_at DESC, version_num DESC LIMIT 1",
            self.table.quoted()
        );
        let rows = self.executor.query_all(&sql, &[])?;
        match rows.first() {
            Some(row) => {
                let revision: String = row
                    .try_get(0)
                    .map_err(|e| ExecError::Parse(format!("version_num: {e}")))?;
                Ok(Some(revision))
            }
            None => Ok(None),
        }
    }
}

fn truncate_description(description: &str) -> String {
    description.chars().take(DESCRIPTION_MAX_LEN).collect()
}

/// Parse the textual form of a `TIMESTAMP` column as UTC
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ExecError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            ExecError::Parse(format!(
                "Failed to parse timestamp '{value}': unrecognized format"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingExecutor;

    #[test]
    fn test_table_name_validation() {
        assert!(TableName::parse("custom_migration_version").is_ok());
        assert!(TableName::parse("_private").is_ok());
        assert!(TableName::parse(&"a".repeat(63)).is_ok());

        for bad in ["", "1table", "users; DROP TABLE x", "my-table", "a\"b", &"a".repeat(64)] {
            assert!(
                matches!(TableName::parse(bad), Err(MigrationError::InvalidTableName(_))),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(TableName::default().as_str(), DEFAULT_TABLE_NAME);
        assert_eq!(TableName::default().quoted(), "\"custom_migration_version\"");
    }

    #[test]
    fn test_state_table_ddl() {
        let table = TableName::parse("schema_revisions").expect("valid");
        let sql = create_state_table(&table).build(sea_query::PostgresQueryBuilder);
        assert!(sql.contains("IF NOT EXISTS"));
        assert!(sql.contains("\"schema_revisions\""));
        assert!(sql.contains("\"version_num\""));
        assert!(sql.contains("\"applied_at\""));
        assert!(sql.contains("\"description\""));
        assert!(sql.to_uppercase().contains("PRIMARY KEY"));

        let index = create_state_table_index(&table).build(sea_query::PostgresQueryBuilder);
        assert!(index.contains("idx_schema_revisions_applied_at"));
    }

    #[test]
    fn test_ensure_table_issues_table_and_index() {
        let executor = RecordingExecutor::new();
        let store = PgRevisionStore::new(&executor, TableName::default());
        store.ensure_table().expect("ensure table");

        let statements = executor.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS"));
        assert!(statements[1].contains("idx_custom_migration_version_applied_at"));
    }

    #[test]
    fn test_mark_applied_with_no_inserted_row_is_duplicate() {
        let executor = RecordingExecutor::new();
        executor.set_affected_rows(0);
        let store = PgRevisionStore::new(&executor, TableName::default());

        let err = store.mark_applied("r1", Some("first")).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateRevision { ref revision } if revision == "r1"));
        assert!(executor.statements()[0].contains("ON CONFLICT (version_num) DO NOTHING"));
    }

    #[test]
    fn test_unmark_applied_targets_quoted_table() {
        let executor = RecordingExecutor::new();
        let store = PgRevisionStore::new(&executor, TableName::parse("revs").expect("valid"));
        store.unmark_applied("r1").expect("unmark");
        assert_eq!(
            executor.statements(),
            vec!["DELETE FROM \"revs\" WHERE version_num = $1"]
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let parsed = parse_timestamp("2025-06-19 09:46:00.123456").expect("with fraction");
        assert_eq!(parsed.to_rfc3339(), "2025-06-19T09:46:00.123456+00:00");
        assert!(parse_timestamp("2025-06-19 09:46:00").is_ok());
        assert!(parse_timestamp("2025-06-19T09:46:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_description_is_truncated() {
        assert_eq!(truncate_description(&"d".repeat(300)).len(), DESCRIPTION_MAX_LEN);
        assert_eq!(truncate_description("short"), "short");
    }
}
