//! Migration-specific error types

use crate::executor::ExecError;
use crate::migration::revision::Direction;
use std::path::PathBuf;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database error outside of a migration procedure (tracking table, transaction control)
    Database(ExecError),
    /// A single statement issued by a procedure failed
    Statement { sql: String, source: ExecError },
    /// A sub-statement of a multi-statement script failed (`index` is 1-based)
    ScriptExecution {
        index: usize,
        total: usize,
        statement: String,
        source: Box<MigrationError>,
    },
    /// Free-form failure raised by a migration procedure
    Procedure(String),
    /// The revision has no procedure for the requested direction
    MissingProcedure { revision: String, direction: Direction },
    /// Any failure while running one revision's procedure
    MigrationExecution {
        revision: String,
        direction: Direction,
        source: Box<MigrationError>,
    },
    /// An upgrade batch stopped at `revision`
    UpgradeFailed {
        revision: String,
        source: Box<MigrationError>,
    },
    /// A downgrade batch stopped at `revision`
    DowngradeFailed {
        revision: String,
        source: Box<MigrationError>,
    },
    /// The revision is already recorded as applied
    DuplicateRevision { revision: String },
    /// The requested revision is not in the catalog
    InvalidRevision(String),
    /// Reading or writing a script file failed
    Io { path: PathBuf, source: std::io::Error },
    /// Two script files declare the same revision
    CatalogConflict {
        revision: String,
        first: String,
        second: String,
    },
    /// A body was registered twice for the same revision
    AlreadyRegistered { revision: String },
    /// The tracking table name is not a plain SQL identifier
    InvalidTableName(String),
    /// Configuration could not be loaded
    Config(String),
}

impl MigrationError {
    /// Wrap a free-form procedure failure
    pub fn procedure(message: impl Into<String>) -> Self {
        MigrationError::Procedure(message.into())
    }

    /// The revision a batch or execution error is about, if any
    pub fn revision(&self) -> Option<&str> {
        match self {
            MigrationError::MissingProcedure { revision, .. }
            | MigrationError::MigrationExecution { revision, .. }
            | MigrationError::UpgradeFailed { revision, .. }
            | MigrationError::DowngradeFailed { revision, .. }
            | MigrationError::DuplicateRevision { revision }
            | MigrationError::CatalogConflict { revision, .. }
            | MigrationError::AlreadyRegistered { revision } => Some(revision),
            MigrationError::InvalidRevision(revision) => Some(revision),
            _ => None,
        }
    }

    /// The innermost migration error in a wrapped chain
    pub fn root(&self) -> &MigrationError {
        match self {
            MigrationError::ScriptExecution { source, .. }
            | MigrationError::MigrationExecution { source, .. }
            | MigrationError::UpgradeFailed { source, .. }
            | MigrationError::DowngradeFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {e}"),
            MigrationError::Statement { sql, source } => {
                write!(f, "SQL execution failed: {}\nError: {source}", sql.trim())
            }
            MigrationError::ScriptExecution {
                index,
                total,
                statement,
                source,
            } => write!(
                f,
                "SQL script execution failed at statement {index}/{total}: {statement}\nError: {source}"
            ),
            MigrationError::Procedure(msg) => write!(f, "{msg}"),
            MigrationError::MissingProcedure { revision, direction } => write!(
                f,
                "No {direction} procedure found for revision {revision}\n\
                 Suggestion: Ensure the revision's script is compiled into the registry \
                 and defines `pub fn {direction}`"
            ),
            MigrationError::MigrationExecution {
                revision,
                direction,
                source,
            } => write!(f, "Migration {direction} failed for revision {revision}: {source}"),
            MigrationError::UpgradeFailed { revision, source } => {
                write!(f, "Migration upgrade failed at {revision}: {source}")
            }
            MigrationError::DowngradeFailed { revision, source } => {
                write!(f, "Migration downgrade failed at {revision}: {source}")
            }
            MigrationError::DuplicateRevision { revision } => write!(
                f,
                "Revision {revision} is already recorded as applied.\n\
                 Another process may be running migrations against this database."
            ),
            MigrationError::InvalidRevision(revision) => {
                write!(f, "Invalid target revision: {revision}")
            }
            MigrationError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            MigrationError::CatalogConflict {
                revision,
                first,
                second,
            } => write!(
                f,
                "Revision {revision} is declared by both {first} and {second}"
            ),
            MigrationError::AlreadyRegistered { revision } => {
                write!(f, "A script body is already registered for revision {revision}")
            }
            MigrationError::InvalidTableName(name) => write!(
                f,
                "Invalid migration table name '{name}': expected letters, digits and underscores, \
                 not starting with a digit, at most 63 characters"
            ),
            MigrationError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Database(e) => Some(e),
            MigrationError::Statement { source, .. } => Some(source),
            MigrationError::ScriptExecution { source, .. }
            | MigrationError::MigrationExecution { source, .. }
            | MigrationError::UpgradeFailed { source, .. }
            | MigrationError::DowngradeFailed { source, .. } => Some(source.as_ref()),
            MigrationError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExecError> for MigrationError {
    fn from(error: ExecError) -> Self {
        MigrationError::Database(error)
    }
}
