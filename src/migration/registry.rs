//! Compiled migration bodies, keyed by revision
//!
//! Scripts are ordinary Rust modules, so their `upgrade`/`downgrade` functions
//! have to be compiled into the binary that runs them. A `Registry` maps each
//! revision id to those functions. Build it by hand, or generate a
//! `registry()` function at build time with `tidemark_migrate::build_script`.
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//! registry.register_fns(
//!     m0001_add_users::REVISION,
//!     Some(m0001_add_users::upgrade),
//!     Some(m0001_add_users::downgrade),
//! )?;
//! ```

use crate::migration::context::MigrationContext;
use crate::migration::revision::Direction;
use crate::migration::MigrationError;
use std::collections::HashMap;
use std::fmt;

/// A migration procedure
pub type Procedure =
    Box<dyn Fn(&MigrationContext<'_>) -> Result<(), MigrationError> + Send + Sync>;

/// The signature of a script's `upgrade` and `downgrade` functions
pub type ProcedureFn = fn(&MigrationContext<'_>) -> Result<(), MigrationError>;

/// The procedures one script provides
#[derive(Default)]
pub struct ScriptBody {
    upgrade: Option<Procedure>,
    downgrade: Option<Procedure>,
}

impl ScriptBody {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn upgrade<F>(mut self, procedure: F) -> Self
    where
        F: Fn(&MigrationContext<'_>) -> Result<(), MigrationError> + Send + Sync + 'static,
    {
        self.upgrade = Some(Box::new(procedure));
        self
    }

    #[must_use]
    pub fn downgrade<F>(mut self, procedure: F) -> Self
    where
        F: Fn(&MigrationContext<'_>) -> Result<(), MigrationError> + Send + Sync + 'static,
    {
        self.downgrade = Some(Box::new(procedure));
        self
    }

    /// The procedure for `direction`, if the script defines one
    pub fn procedure(&self, direction: Direction) -> Option<&Procedure> {
        match direction {
            Direction::Upgrade => self.upgrade.as_ref(),
            Direction::Downgrade => self.downgrade.as_ref(),
        }
    }
}

impl fmt::Debug for ScriptBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptBody")
            .field("upgrade", &self.upgrade.is_some())
            .field("downgrade", &self.downgrade.is_some())
            .finish()
    }
}

/// Revision id to script body
#[derive(Debug, Default)]
pub struct Registry {
    bodies: HashMap<String, ScriptBody>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the body for a revision
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if the revision already has a body.
    pub fn register(
        &mut self,
        revision: impl Into<String>,
        body: ScriptBody,
    ) -> Result<(), MigrationError> {
        let revision = revision.into();
        if self.bodies.contains_key(&revision) {
            return Err(MigrationError::AlreadyRegistered { revision });
        }
        self.bodies.insert(revision, body);
        Ok(())
    }

    /// Register plain functions, the shape script modules export
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if the revision already has a body.
    pub fn register_fns(
        &mut self,
        revision: impl Into<String>,
        upgrade: Option<ProcedureFn>,
        downgrade: Option<ProcedureFn>,
    ) -> Result<(), MigrationError> {
        let mut body = ScriptBody::new();
        if let Some(procedure) = upgrade {
            body = body.upgrade(procedure);
        }
        if let Some(procedure) = downgrade {
            body = body.downgrade(procedure);
        }
        self.register(revision, body)
    }

    pub fn get(&self, revision: &str) -> Option<&ScriptBody> {
        self.bodies.get(revision)
    }

    pub fn contains(&self, revision: &str) -> bool {
        self.bodies.contains_key(revision)
    }

    /// Registered revision ids, sorted
    pub fn revisions(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bodies.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {
        Ok(())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register_fns("r1", Some(noop as ProcedureFn), None)
            .expect("register");

        let body = registry.get("r1").expect("body");
        assert!(body.procedure(Direction::Upgrade).is_some());
        assert!(body.procedure(Direction::Downgrade).is_none());
        assert!(registry.get("r2").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register("r1", ScriptBody::new()).expect("first");
        let err = registry.register("r1", ScriptBody::new()).unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyRegistered { ref revision } if revision == "r1"));
    }

    #[test]
    fn test_revisions_are_sorted() {
        let mut registry = Registry::new();
        for id in ["c", "a", "b"] {
            registry.register(id, ScriptBody::new()).expect("register");
        }
        assert_eq!(registry.revisions(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_closures_can_be_registered() {
        let mut registry = Registry::new();
        let table = String::from("users");
        registry
            .register(
                "r1",
                ScriptBody::new().upgrade(move |ctx| {
                    ctx.execute(&format!("CREATE TABLE {table} (id BIGINT)"), &[])
                }),
            )
            .expect("register");
        assert!(format!("{:?}", registry.get("r1").expect("body")).contains("upgrade: true"));
    }
}
