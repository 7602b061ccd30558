//! Migration status tracking

use crate::migration::revision::Revision;
use crate::migration::store::AppliedRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One line of `history`: a discovered revision and whether it is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub revision: String,
    pub parent_revision: Option<String>,
    pub description: String,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
    pub filename: String,
}

/// Migration status information
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Applied revisions, oldest first
    pub applied: Vec<AppliedRecord>,

    /// Discovered revisions not yet applied, in chain order
    pub pending: Vec<Revision>,

    /// Number of discovered revisions
    pub total: usize,

    pub applied_count: usize,

    pub pending_count: usize,

    /// Applied revisions with no script on disk
    pub orphaned: Vec<String>,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<AppliedRecord>, pending: Vec<Revision>, orphaned: Vec<String>) -> Self {
        let applied_count = applied.len();
        let pending_count = pending.len();
        let total = applied_count - orphaned.len().min(applied_count) + pending_count;

        Self {
            applied,
            pending,
            total,
            applied_count,
            pending_count,
            orphaned,
        }
    }

    /// Check if all discovered revisions are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count == 0
    }

    /// The most recently applied revision
    #[must_use]
    pub fn latest_applied(&self) -> Option<&str> {
        self.applied.last().map(|r| r.revision.as_str())
    }

    /// The revision the next `upgrade` would apply first
    #[must_use]
    pub fn next_pending(&self) -> Option<&Revision> {
        self.pending.first()
    }
}
