//! Revisions and migration script metadata
//!
//! A script file declares its own identity; the filename only orders the chain:
//!
//! ```rust,ignore
//! //! Add users table
//!
//! pub const REVISION: &str = "45e150f3-2d72-4c8e-9d1a-0b5c6a1f7e21";
//! pub const DOWN_REVISION: Option<&str> = None;
//!
//! pub fn upgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> { .. }
//! pub fn downgrade(ctx: &MigrationContext<'_>) -> Result<(), MigrationError> { .. }
//! ```

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

static REVISION_DECL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r#"(?m)^\s*(?:pub\s+)?const\s+REVISION\s*:\s*&(?:'static\s+)?str\s*=\s*"([^"]+)"\s*;"#)
        .expect("valid REVISION pattern")
});

static DOWN_REVISION_DECL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(
        r#"(?m)^\s*(?:pub\s+)?const\s+DOWN_REVISION\s*:\s*Option<&(?:'static\s+)?str>\s*=\s*(?:Some\(\s*"([^"]*)"\s*\)|None)\s*;"#,
    )
    .expect("valid DOWN_REVISION pattern")
});

static UPGRADE_FN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r"(?m)^\s*pub\s+fn\s+upgrade\s*\(").expect("valid upgrade pattern")
});

static DOWNGRADE_FN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern
    Regex::new(r"(?m)^\s*pub\s+fn\s+downgrade\s*\(").expect("valid downgrade pattern")
});

/// Direction a revision is executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply the revision
    Upgrade,
    /// Roll the revision back
    Downgrade,
}

impl Direction {
    /// Name of the procedure a script defines for this direction
    pub fn procedure_name(self) -> &'static str {
        match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.procedure_name())
    }
}

/// A discovered migration script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    /// Unique revision identifier (UUID for generated scripts)
    pub id: String,
    /// Declared parent revision
    pub parent_revision: Option<String>,
    /// First paragraph of the script's module doc
    pub description: String,
    /// File name, which embeds the creation timestamp and orders the chain
    pub filename: String,
    /// Location of the script on disk
    pub path: PathBuf,
}

/// Fields a script declares about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptMetadata {
    pub revision: Option<String>,
    pub down_revision: Option<String>,
    pub description: Option<String>,
    pub has_upgrade: bool,
    pub has_downgrade: bool,
}

impl ScriptMetadata {
    /// Extract the declarations from script source
    ///
    /// `DOWN_REVISION = Some("")` is read as no parent.
    pub fn parse(content: &str) -> Self {
        let revision = REVISION_DECL
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        let down_revision = DOWN_REVISION_DECL
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            revision,
            down_revision,
            description: module_doc_summary(content),
            has_upgrade: UPGRADE_FN.is_match(content),
            has_downgrade: DOWNGRADE_FN.is_match(content),
        }
    }
}

/// First paragraph of the leading `//!` block, joined into one line
fn module_doc_summary(content: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        let Some(doc) = trimmed.strip_prefix("//!") else {
            if lines.is_empty() && trimmed.is_empty() {
                continue;
            }
            break;
        };
        let doc = doc.trim();
        if doc.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(doc);
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}
