//! Migration script discovery and creation

use crate::migration::revision::{Revision, ScriptMetadata};
use crate::migration::template::{self, TemplateParams};
use crate::migration::MigrationError;
use chrono::Utc;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use uuid::Uuid;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r"[^\w\s-]").expect("valid slug pattern")
});

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r"[-\s]+").expect("valid slug pattern")
});

const MAX_SLUG_LEN: usize = 40;

/// Reads the versions directory into an ordered chain of revisions
///
/// Nothing is cached: every call rescans the directory.
#[derive(Debug, Clone)]
pub struct RevisionCatalog {
    versions_dir: PathBuf,
}

impl RevisionCatalog {
    pub fn new(versions_dir: impl AsRef<Path>) -> Self {
        Self {
            versions_dir: versions_dir.as_ref().to_path_buf(),
        }
    }

    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    /// Discover all revisions, sorted by filename ascending
    ///
    /// A missing directory yields an empty chain. Files without a `REVISION`
    /// declaration are skipped with a warning. Parent links that disagree with
    /// filename order are logged, not rejected.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` if the directory or a script cannot be read, and
    /// `MigrationError::CatalogConflict` if two scripts declare the same revision.
    pub fn discover(&self) -> Result<Vec<Revision>, MigrationError> {
        if !self.versions_dir.exists() {
            log::debug!(
                "Versions directory {} does not exist; no revisions",
                self.versions_dir.display()
            );
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.versions_dir).map_err(|e| MigrationError::Io {
            path: self.versions_dir.clone(),
            source: e,
        })?;

        let mut revisions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::Io {
                path: self.versions_dir.clone(),
                source: e,
            })?;
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                log::warn!("Skipping script with non UTF-8 name: {}", path.display());
                continue;
            };
            if filename == "mod.rs" {
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Skipping {filename}: {e}");
                    continue;
                }
            };
            let meta = ScriptMetadata::parse(&content);
            let Some(id) = meta.revision else {
                log::warn!("Skipping {filename}: no REVISION declaration found");
                continue;
            };

            revisions.push(Revision {
                id,
                parent_revision: meta.down_revision,
                description: meta.description.unwrap_or_default(),
                filename,
                path,
            });
        }

        revisions.sort_by(|a, b| a.filename.cmp(&b.filename));

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for revision in &revisions {
            if let Some(first) = seen.insert(&revision.id, &revision.filename) {
                return Err(MigrationError::CatalogConflict {
                    revision: revision.id.clone(),
                    first: first.to_string(),
                    second: revision.filename.clone(),
                });
            }
        }

        warn_on_parent_mismatch(&revisions);
        Ok(revisions)
    }

    /// Write a new script whose parent is the last discovered revision
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` if the directory cannot be created or the file
    /// already exists or cannot be written.
    pub fn create(&self, message: &str) -> Result<Revision, MigrationError> {
        let existing = self.discover()?;
        let parent = existing.last().map(|r| r.id.clone());

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let filename = format!(
            "{}_{}_{}.rs",
            now.format("%Y_%m_%d_%H%M%S_%6f"),
            id,
            slugify(message)
        );

        fs::create_dir_all(&self.versions_dir).map_err(|e| MigrationError::Io {
            path: self.versions_dir.clone(),
            source: e,
        })?;

        let path = self.versions_dir.join(&filename);
        let content = template::render(&TemplateParams {
            message,
            revision: &id,
            down_revision: parent.as_deref(),
            created_at: now,
        });

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| MigrationError::Io {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| MigrationError::Io {
                path: path.clone(),
                source: e,
            })?;

        log::info!("Generated migration: {filename}");

        Ok(Revision {
            id,
            parent_revision: parent,
            description: message.replace(['\r', '\n'], " "),
            filename,
            path,
        })
    }
}

/// Lowercase, strip punctuation, join words with `_`, cap at 40 characters
pub fn slugify(message: &str) -> String {
    let lowered = message.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(stripped.trim(), "_");
    joined.chars().take(MAX_SLUG_LEN).collect()
}

fn warn_on_parent_mismatch(revisions: &[Revision]) {
    let mut previous: Option<&str> = None;
    for revision in revisions {
        if revision.parent_revision.as_deref() != previous {
            log::warn!(
                "Revision {} ({}) declares parent {} but follows {} in filename order",
                revision.id,
                revision.filename,
                revision.parent_revision.as_deref().unwrap_or("None"),
                previous.unwrap_or("None"),
            );
        }
        previous = Some(&revision.id);
    }
}
