//! Create account audit log

use tidemark::migration::{MigrationContext, MigrationError};

pub const REVISION: &str = "c2b87f19-03de-4a27-b6f8-91e4d5a7c033";
pub const DOWN_REVISION: Option<&str> = Some("a93d5e04-17c2-4f6b-8e3a-5b9d0c4e2f72");

pub fn upgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute_script(
        "CREATE TABLE tidemark_it_account_audit (
             id BIGSERIAL PRIMARY KEY,
             account_id BIGINT NOT NULL REFERENCES tidemark_it_accounts (id),
             note TEXT
         );
         CREATE FUNCTION tidemark_it_touch() RETURNS trigger AS $body$
         BEGIN
             NEW.note := coalesce(NEW.note, 'created; no note');
             RETURN NEW;
         END;
         $body$ LANGUAGE plpgsql;",
    )
}

pub fn downgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
    ctx.execute_script(
        "DROP FUNCTION IF EXISTS tidemark_it_touch();
         DROP TABLE IF EXISTS tidemark_it_account_audit;",
    )
}
