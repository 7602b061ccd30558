//! Migration system for Tidemark
//!
//! This module provides the infrastructure for revision-based migrations:
//! - Script discovery and generation (`RevisionCatalog`)
//! - The tracking table and its stores (`PgRevisionStore`, `MemoryRevisionStore`)
//! - Compiled migration bodies (`Registry`)
//! - Upgrade / downgrade orchestration (`MigrationEngine`)
//!
//! # Example
//!
//! A script in the versions directory:
//!
//! ```rust,ignore
//! //! Add users table
//!
//! use tidemark::migration::{MigrationContext, MigrationError};
//!
//! pub const REVISION: &str = "45e150f3-2d72-4c8e-9d1a-0b5c6a1f7e21";
//! pub const DOWN_REVISION: Option<&str> = None;
//!
//! pub fn upgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
//!     ctx.execute_script(
//!         "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL);
//!          CREATE UNIQUE INDEX users_email ON users (email);",
//!     )
//! }
//!
//! pub fn downgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
//!     ctx.execute("DROP TABLE users", &[])
//! }
//! ```

pub mod catalog;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod memory;
pub mod registry;
pub mod revision;
pub mod startup;
pub mod state_table;
pub mod status;
pub mod store;
pub mod template;

pub use catalog::{slugify, RevisionCatalog};
pub use context::{split_statements, MigrationContext};
pub use engine::{DowngradeReport, MigrationEngine, MigrationListener, UpgradeReport, ROLLBACK_LATEST};
pub use error::MigrationError;
pub use executor::MigrationExecutor;
pub use memory::MemoryRevisionStore;
pub use registry::{Procedure, ProcedureFn, Registry, ScriptBody};
pub use revision::{Direction, Revision, ScriptMetadata};
pub use startup::{MigrationInitializer, StartupStatus};
pub use state_table::{PgRevisionStore, TableName, DEFAULT_TABLE_NAME};
pub use status::{HistoryEntry, MigrationStatus};
pub use store::{AppliedRecord, RevisionStore};
