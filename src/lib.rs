//! # Tidemark
//!
//! Revision-based schema migrations for PostgreSQL on `may_postgres`.
//!
//! Tidemark tracks which revisions of a linear chain have been applied to a
//! database and moves it forward (`upgrade`) or backward (`downgrade`), running
//! each revision's procedure and its tracking-table write in one transaction.
//!
//! See [`migration`] for the script format and [`migration::MigrationEngine`]
//! for the entry point. The `tidemark-migrate` crate wraps it in a CLI.

pub mod config;
pub mod connection;
pub mod executor;
pub mod migration;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{ExecError, PostgresExecutor, SqlExecutor};
pub use migration::MigrationError;
