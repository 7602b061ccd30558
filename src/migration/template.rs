//! Script template written by `RevisionCatalog::create`

use chrono::{DateTime, Utc};

/// Values substituted into a new script
pub struct TemplateParams<'a> {
    pub message: &'a str,
    pub revision: &'a str,
    pub down_revision: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// Render the source of a new migration script
pub fn render(params: &TemplateParams<'_>) -> String {
    let revises = params.down_revision.unwrap_or("None");
    let down_revision = match params.down_revision {
        Some(parent) => format!("Some(\"{parent}\")"),
        None => "None".to_string(),
    };
    // The message becomes a doc comment; keep it on one line.
    let message = params.message.replace(['\r', '\n'], " ");

    format!(
        r#"//! {message}
//!
//! Revision ID: {revision}
//! Revises: {revises}
//! Create Date: {created}

use tidemark::migration::{{MigrationContext, MigrationError}};

pub const REVISION: &str = "{revision}";
pub const DOWN_REVISION: Option<&str> = {down_revision};

pub fn upgrade(_ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {{
    Ok(())
}}

pub fn downgrade(_ctx: &MigrationContext<'_>) -> Result<(), MigrationError> {{
    Ok(())
}}
"#,
        revision = params.revision,
        created = params.created_at.format("%Y-%m-%d %H:%M:%S%.6f"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::revision::ScriptMetadata;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 19, 9, 46, 0).single().expect("valid date")
    }

    #[test]
    fn test_rendered_script_parses_back() {
        let source = render(&TemplateParams {
            message: "Add users table",
            revision: "aaaa",
            down_revision: Some("bbbb"),
            created_at: created_at(),
        });

        let meta = ScriptMetadata::parse(&source);
        assert_eq!(meta.revision.as_deref(), Some("aaaa"));
        assert_eq!(meta.down_revision.as_deref(), Some("bbbb"));
        assert_eq!(meta.description.as_deref(), Some("Add users table"));
        assert!(meta.has_upgrade && meta.has_downgrade);
        assert!(source.contains("Create Date: 2025-06-19 09:46:00.000000"));
        assert!(source.contains("pub fn upgrade(_ctx: &MigrationContext<'_>)"));
        assert!(!source.contains("let _ = ctx;"));
    }

    #[test]
    fn test_root_script_has_no_parent() {
        let source = render(&TemplateParams {
            message: "Initial",
            revision: "aaaa",
            down_revision: None,
            created_at: created_at(),
        });

        assert!(source.contains("pub const DOWN_REVISION: Option<&str> = None;"));
        assert!(source.contains("Revises: None"));
        assert_eq!(ScriptMetadata::parse(&source).down_revision, None);
    }

    #[test]
    fn test_multi_line_message_stays_in_doc_comment() {
        let source = render(&TemplateParams {
            message: "first\nsecond",
            revision: "aaaa",
            down_revision: None,
            created_at: created_at(),
        });
        assert!(source.starts_with("//! first second\n"));
    }
}
