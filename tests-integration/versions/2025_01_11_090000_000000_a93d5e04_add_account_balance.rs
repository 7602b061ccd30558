//! Add account balance

use tidemark::migration::{MigrationContext, MigrationError};

pub const REVISION: &str = "a93d5e04-17c2-4f6b-8e3a-5b9d0c4e2f72";
pub const DOWN_REVISION: Option<&str> = Some("6f1c2a7e-8b41-4d0a-9c55-2e7d3f0b9a11");

pub fn upgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute_script(
        "ALTER TABLE tidemark_it_accounts ADD COLUMN balance NUMERIC(19, 4) NOT NULL DEFAULT 0;
         -- Seed one row so the downgrade has data to drop with the column
         INSERT INTO tidemark_it_accounts (code, name) VALUES ('1000', 'Cash; on hand');",
    )
}

pub fn downgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute_script(
        "DELETE FROM tidemark_it_accounts WHERE code = '1000';
         ALTER TABLE tidemark_it_accounts DROP COLUMN balance;",
    )
}
