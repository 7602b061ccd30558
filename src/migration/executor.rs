//! Runs one revision's procedure

use crate::config::MigrationConfig;
use crate::executor::SqlExecutor;
use crate::migration::context::MigrationContext;
use crate::migration::registry::Registry;
use crate::migration::revision::{Direction, Revision};
use crate::migration::MigrationError;
use std::time::Instant;

/// Looks up and invokes migration procedures
///
/// The executor never opens, commits or rolls back a transaction; callers wrap
/// `run` in a `TransactionScope`.
pub struct MigrationExecutor<'a> {
    registry: &'a Registry,
    config: &'a MigrationConfig,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(registry: &'a Registry, config: &'a MigrationConfig) -> Self {
        Self { registry, config }
    }

    /// Run `revision`'s procedure for `direction` on `executor`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::MigrationExecution` wrapping the cause, which is
    /// `MissingProcedure` when the registry has nothing to run.
    pub fn run(
        &self,
        revision: &Revision,
        direction: Direction,
        executor: &dyn SqlExecutor,
    ) -> Result<(), MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "migration.run",
            revision = %revision.id,
            direction = %direction
        )
        .entered();

        let start = Instant::now();
        self.invoke(revision, direction, executor)
            .map_err(|source| MigrationError::MigrationExecution {
                revision: revision.id.clone(),
                direction,
                source: Box::new(source),
            })?;

        log::debug!(
            "{direction} of {} finished in {}ms",
            revision.id,
            start.elapsed().as_millis()
        );
        Ok(())
    }

    fn invoke(
        &self,
        revision: &Revision,
        direction: Direction,
        executor: &dyn SqlExecutor,
    ) -> Result<(), MigrationError> {
        let procedure = self
            .registry
            .get(&revision.id)
            .and_then(|body| body.procedure(direction))
            .ok_or_else(|| MigrationError::MissingProcedure {
                revision: revision.id.clone(),
                direction,
            })?;

        let ctx = MigrationContext::new(executor, self.config, revision, direction);
        procedure(&ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::registry::ScriptBody;
    use crate::test_helpers::RecordingExecutor;
    use std::path::PathBuf;

    fn revision(id: &str) -> Revision {
        Revision {
            id: id.into(),
            parent_revision: None,
            description: String::new(),
            filename: format!("{id}.rs"),
            path: PathBuf::from(format!("{id}.rs")),
        }
    }

    #[test]
    fn test_runs_registered_procedure() {
        let mut registry = Registry::new();
        registry
            .register(
                "r1",
                ScriptBody::new().upgrade(|ctx| ctx.execute("CREATE TABLE t (id INT)", &[])),
            )
            .expect("register");
        let config = MigrationConfig::default();
        let executor = RecordingExecutor::new();

        MigrationExecutor::new(&registry, &config)
            .run(&revision("r1"), Direction::Upgrade, &executor)
            .expect("run");
        assert_eq!(executor.statements(), vec!["CREATE TABLE t (id INT)"]);
    }

    #[test]
    fn test_missing_body_and_missing_direction() {
        let mut registry = Registry::new();
        registry
            .register("r1", ScriptBody::new().upgrade(|_| Ok(())))
            .expect("register");
        let config = MigrationConfig::default();
        let executor = RecordingExecutor::new();
        let runner = MigrationExecutor::new(&registry, &config);

        let err = runner
            .run(&revision("r1"), Direction::Downgrade, &executor)
            .unwrap_err();
        assert!(matches!(err, MigrationError::MigrationExecution { .. }));
        assert!(matches!(
            err.root(),
            MigrationError::MissingProcedure { direction: Direction::Downgrade, .. }
        ));

        let err = runner
            .run(&revision("unknown"), Direction::Upgrade, &executor)
            .unwrap_err();
        assert_eq!(err.revision(), Some("unknown"));
        assert!(matches!(err.root(), MigrationError::MissingProcedure { .. }));
    }

    #[test]
    fn test_procedure_failure_is_wrapped() {
        let mut registry = Registry::new();
        registry
            .register(
                "r1",
                ScriptBody::new().upgrade(|_| Err(MigrationError::procedure("bad data"))),
            )
            .expect("register");
        let config = MigrationConfig::default();
        let executor = RecordingExecutor::new();

        let err = MigrationExecutor::new(&registry, &config)
            .run(&revision("r1"), Direction::Upgrade, &executor)
            .unwrap_err();
        assert!(err.to_string().contains("Migration upgrade failed for revision r1"));
        assert!(err.to_string().contains("bad data"));
    }
}
