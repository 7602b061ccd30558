//! The handle a migration procedure receives

use crate::config::MigrationConfig;
use crate::executor::SqlExecutor;
use crate::migration::revision::{Direction, Revision};
use crate::migration::MigrationError;
use may_postgres::types::ToSql;
use may_postgres::Row;

/// Per-execution context handed to `upgrade` / `downgrade`
///
/// Everything issued through the context runs inside the revision's
/// transaction; the engine commits or rolls it back after the procedure returns.
pub struct MigrationContext<'a> {
    executor: &'a dyn SqlExecutor,
    config: &'a MigrationConfig,
    revision: &'a Revision,
    direction: Direction,
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        executor: &'a dyn SqlExecutor,
        config: &'a MigrationConfig,
        revision: &'a Revision,
        direction: Direction,
    ) -> Self {
        Self {
            executor,
            config,
            revision,
            direction,
        }
    }

    /// Run a single statement
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Statement` naming the failing SQL.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<(), MigrationError> {
        self.executor
            .execute(sql, params)
            .map(|_| ())
            .map_err(|source| MigrationError::Statement {
                sql: sql.to_string(),
                source,
            })
    }

    /// Run a `;`-separated script, statement by statement
    ///
    /// Semicolons inside quotes, comments and dollar-quoted bodies do not split.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::ScriptExecution` with the 1-based position of the
    /// failing statement.
    pub fn execute_script(&self, script: &str) -> Result<(), MigrationError> {
        let statements = split_statements(script);
        let total = statements.len();

        for (i, statement) in statements.iter().enumerate() {
            log::debug!("Executing statement {}/{total}", i + 1);
            self.execute(statement, &[])
                .map_err(|e| MigrationError::ScriptExecution {
                    index: i + 1,
                    total,
                    statement: statement.clone(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Run a query and return its rows, for data migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Statement` naming the failing SQL.
    pub fn query_all(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, MigrationError> {
        self.executor
            .query_all(sql, params)
            .map_err(|source| MigrationError::Statement {
                sql: sql.to_string(),
                source,
            })
    }

    /// The executor bound to the revision's transaction
    pub fn executor(&self) -> &'a dyn SqlExecutor {
        self.executor
    }

    pub fn config(&self) -> &'a MigrationConfig {
        self.config
    }

    pub fn revision(&self) -> &'a Revision {
        self.revision
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Split a SQL script on top-level semicolons
///
/// Fragments holding nothing but whitespace and comments are dropped. The
/// returned statements carry no trailing `;`.
pub fn split_statements(script: &str) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut significant = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                // A doubled quote closes and immediately reopens, so escapes need no special case.
                significant = true;
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
            }
            b'$' => {
                significant = true;
                match dollar_tag_len(&bytes[i..]) {
                    Some(tag_len) => {
                        let tag = &bytes[i..i + tag_len];
                        i += tag_len;
                        i = match find(&bytes[i..], tag) {
                            Some(pos) => i + pos + tag_len,
                            None => bytes.len(),
                        };
                    }
                    None => i += 1,
                }
            }
            b';' => {
                if significant {
                    statements.push(script[start..i].trim().to_string());
                }
                significant = false;
                i += 1;
                start = i;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                significant = true;
                i += 1;
            }
        }
    }

    if significant && start < script.len() {
        statements.push(script[start..].trim().to_string());
    }
    statements
}

/// Length of a `$tag$` opener at the start of `bytes`
fn dollar_tag_len(bytes: &[u8]) -> Option<usize> {
    let mut j = 1;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    let is_tag = j < bytes.len() && bytes[j] == b'$' && !(j > 1 && bytes[1].is_ascii_digit());
    is_tag.then_some(j + 1)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
