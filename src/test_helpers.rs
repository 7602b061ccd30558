//! Test doubles shared by unit tests and downstream crates (feature `test-helpers`)

use crate::executor::{ExecError, SqlExecutor};
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::sync::Mutex;

/// A `SqlExecutor` that records statements instead of running them
///
/// Queries return no rows. A statement containing a registered failure pattern
/// is recorded and then fails with `ExecError::Query`.
#[derive(Debug)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
    affected_rows: Mutex<u64>,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            affected_rows: Mutex::new(1),
        }
    }
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every statement containing `pattern` fail
    pub fn fail_on(&self, pattern: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(pattern.to_string());
        }
    }

    /// Row count reported by `execute` (defaults to 1)
    pub fn set_affected_rows(&self, rows: u64) {
        if let Ok(mut affected) = self.affected_rows.lock() {
            *affected = rows;
        }
    }

    /// Everything issued so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn record(&self, query: &str) -> Result<(), ExecError> {
        self.statements
            .lock()
            .map_err(|e| ExecError::Other(e.to_string()))?
            .push(query.to_string());

        let failures = self
            .failures
            .lock()
            .map_err(|e| ExecError::Other(e.to_string()))?;
        match failures.iter().find(|pattern| query.contains(pattern.as_str())) {
            Some(pattern) => Err(ExecError::Query(format!("injected failure for '{pattern}'"))),
            None => Ok(()),
        }
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, ExecError> {
        self.record(query)?;
        self.affected_rows
            .lock()
            .map(|rows| *rows)
            .map_err(|e| ExecError::Other(e.to_string()))
    }

    fn query_all(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, ExecError> {
        self.record(query)?;
        Ok(Vec::new())
    }
}
