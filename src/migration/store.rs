//! Durable record of applied revisions

use crate::migration::MigrationError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the tracking table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecord {
    /// Revision identifier (primary key)
    pub revision: String,
    /// When the revision was applied
    pub applied_at: DateTime<Utc>,
    /// Description copied from the script when it was applied
    pub description: Option<String>,
}

/// Storage for the set of applied revisions
///
/// Read paths never fail because the tracking table is missing: they report an
/// empty set instead. `ensure_table` must have been called before writing.
pub trait RevisionStore {
    /// Create the tracking table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the DDL fails.
    fn ensure_table(&self) -> Result<(), MigrationError>;

    /// Whether the tracking table exists
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the lookup fails.
    fn table_exists(&self) -> Result<bool, MigrationError>;

    /// Applied records ordered by `applied_at` ascending
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the query fails.
    fn applied_records(&self) -> Result<Vec<AppliedRecord>, MigrationError>;

    /// Applied revision ids ordered by `applied_at` ascending
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the query fails.
    fn applied_revisions(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self
            .applied_records()?
            .into_iter()
            .map(|r| r.revision)
            .collect())
    }

    /// Record a revision as applied
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DuplicateRevision` if it is already recorded.
    fn mark_applied(&self, revision: &str, description: Option<&str>)
        -> Result<(), MigrationError>;

    /// Remove a revision's record; absent records are ignored
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the delete fails.
    fn unmark_applied(&self, revision: &str) -> Result<(), MigrationError>;

    /// The most recently applied revision
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the query fails.
    fn current_head(&self) -> Result<Option<String>, MigrationError> {
        Ok(self.applied_revisions()?.pop())
    }
}
