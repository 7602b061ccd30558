//! Migration configuration
//!
//! Settings are read from `config/migrations.toml` (section `[migrations]`),
//! then from `TIDEMARK__MIGRATIONS__*` environment variables. The legacy
//! `MIGRATION_TABLE_NAME` variable overrides the table name last.

use crate::migration::state_table::{TableName, DEFAULT_TABLE_NAME};
use crate::migration::MigrationError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "config/migrations.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MigrationConfig {
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_script_location")]
    pub script_location: String,
    #[serde(default = "default_version_locations")]
    pub version_locations: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_script_location() -> String {
    "migrations".to_string()
}

fn default_version_locations() -> String {
    "migrations/versions".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            script_location: default_script_location(),
            version_locations: default_version_locations(),
            log_level: default_log_level(),
        }
    }
}

impl MigrationConfig {
    /// Load from `config/migrations.toml` (optional) and the environment
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Config` if a source cannot be parsed, and
    /// `MigrationError::InvalidTableName` if the resulting table name is unusable.
    pub fn load() -> Result<Self, MigrationError> {
        Self::load_from(None)
    }

    /// Load with an explicit configuration file, which must then exist
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Config` if a source cannot be read or parsed, and
    /// `MigrationError::InvalidTableName` if the resulting table name is unusable.
    pub fn load_from(path: Option<&Path>) -> Result<Self, MigrationError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("TIDEMARK").separator("__"))
            .set_override_option(
                "migrations.table_name",
                std::env::var("MIGRATION_TABLE_NAME").ok(),
            )
            .map_err(|e| MigrationError::Config(e.to_string()))?
            .build()
            .map_err(|e| MigrationError::Config(format!("Failed to load migration configuration: {e}")))?;

        let loaded = match settings.get::<MigrationConfig>("migrations") {
            Ok(loaded) => loaded,
            Err(config::ConfigError::NotFound(_)) => MigrationConfig::default(),
            Err(e) => {
                return Err(MigrationError::Config(format!(
                    "Invalid [migrations] configuration: {e}"
                )))
            }
        };

        loaded.table()?;
        log::debug!("Loaded migration configuration: {loaded:?}");
        Ok(loaded)
    }

    /// The validated tracking table name
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidTableName` if `table_name` is not a plain identifier.
    pub fn table(&self) -> Result<TableName, MigrationError> {
        TableName::parse(&self.table_name)
    }

    /// Directory holding the revision scripts
    ///
    /// A relative `version_locations` is taken relative to `script_location`
    /// unless it already starts with it.
    pub fn versions_dir(&self) -> PathBuf {
        let versions = Path::new(&self.version_locations);
        let scripts = Path::new(&self.script_location);
        if versions.is_absolute() || versions.starts_with(scripts) {
            versions.to_path_buf()
        } else {
            scripts.join(versions)
        }
    }
}
