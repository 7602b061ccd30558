//! Create ledger accounts
//!
//! Revision ID: 6f1c2a7e-8b41-4d0a-9c55-2e7d3f0b9a11
//! Revises: None
//! Create Date: 2025-01-10 09:00:00.000000

use tidemark::migration::{MigrationContext, MigrationError};

pub const REVISION: &str = "6f1c2a7e-8b41-4d0a-9c55-2e7d3f0b9a11";
pub const DOWN_REVISION: Option<&str> = None;

pub fn upgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute_script(
        "CREATE TABLE tidemark_it_accounts (
             id BIGSERIAL PRIMARY KEY,
             code VARCHAR(20) NOT NULL,
             name TEXT NOT NULL
         );
         CREATE UNIQUE INDEX idx_tidemark_it_accounts_code ON tidemark_it_accounts (code);",
    )
}

pub fn downgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute("DROP TABLE IF EXISTS tidemark_it_accounts", &[])
}
