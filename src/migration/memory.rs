//! In-memory `RevisionStore`
//!
//! Useful for dry runs and for exercising the engine without a database. The
//! store is not transactional: a rolled-back revision transaction does not undo
//! a write made through it.

use crate::executor::ExecError;
use crate::migration::store::{AppliedRecord, RevisionStore};
use crate::migration::MigrationError;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    table_created: bool,
    records: Vec<AppliedRecord>,
}

/// Applied revisions kept in process memory
#[derive(Debug, Default)]
pub struct MemoryRevisionStore {
    state: Mutex<State>,
}

impl MemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, MigrationError> {
        self.state.lock().map_err(|e| {
            MigrationError::Database(ExecError::Other(format!(
                "Failed to lock in-memory revision store: {e}"
            )))
        })
    }

    fn require_table(state: &State) -> Result<(), MigrationError> {
        if state.table_created {
            Ok(())
        } else {
            Err(MigrationError::Database(ExecError::Query(
                "tracking table does not exist".to_string(),
            )))
        }
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn ensure_table(&self) -> Result<(), MigrationError> {
        self.lock()?.table_created = true;
        Ok(())
    }

    fn table_exists(&self) -> Result<bool, MigrationError> {
        Ok(self.lock()?.table_created)
    }

    fn applied_records(&self) -> Result<Vec<AppliedRecord>, MigrationError> {
        Ok(self.lock()?.records.clone())
    }

    fn mark_applied(
        &self,
        revision: &str,
        description: Option<&str>,
    ) -> Result<(), MigrationError> {
        let mut state = self.lock()?;
        Self::require_table(&state)?;

        if state.records.iter().any(|r| r.revision == revision) {
            return Err(MigrationError::DuplicateRevision {
                revision: revision.to_string(),
            });
        }

        // Keep insertion order and applied order identical even if the clock steps back.
        let now = Utc::now();
        let applied_at: DateTime<Utc> = state
            .records
            .last()
            .map_or(now, |last| last.applied_at.max(now));

        state.records.push(AppliedRecord {
            revision: revision.to_string(),
            applied_at,
            description: description.map(str::to_string),
        });
        Ok(())
    }

    fn unmark_applied(&self, revision: &str) -> Result<(), MigrationError> {
        let mut state = self.lock()?;
        Self::require_table(&state)?;
        state.records.retain(|r| r.revision != revision);
        Ok(())
    }
}
