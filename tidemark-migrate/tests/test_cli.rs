//! Tests for the command line surface

use clap::Parser;
use std::fs;
use tempfile::TempDir;
use tidemark::migration::{Registry, RevisionCatalog};
use tidemark_migrate::{execute, Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["tidemark-migrate"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("arguments should parse")
}

#[test]
fn test_parse_create() {
    let cli = parse(&["create", "Add users table"]);
    assert_eq!(
        cli.command,
        Commands::Create {
            message: "Add users table".to_string()
        }
    );
}

#[test]
fn test_parse_upgrade_with_target() {
    let cli = parse(&["upgrade", "--target", "abc"]);
    assert_eq!(
        cli.command,
        Commands::Upgrade {
            target: Some("abc".to_string())
        }
    );

    let cli = parse(&["upgrade"]);
    assert_eq!(cli.command, Commands::Upgrade { target: None });
}

#[test]
fn test_parse_downgrade_latest() {
    let cli = parse(&["downgrade", "-1"]);
    assert_eq!(
        cli.command,
        Commands::Downgrade {
            revision: "-1".to_string()
        }
    );
}

#[test]
fn test_parse_history_json_and_global_flags() {
    let cli = parse(&[
        "history",
        "--json",
        "--database-url",
        "postgres://u:p@localhost/db",
        "--table-name",
        "revs",
        "-v",
    ]);
    assert_eq!(cli.command, Commands::History { json: true });
    assert_eq!(cli.database_url.as_deref(), Some("postgres://u:p@localhost/db"));
    assert_eq!(cli.table_name.as_deref(), Some("revs"));
    assert!(cli.verbose);
}

#[test]
fn test_verbose_and_quiet_conflict() {
    assert!(Cli::try_parse_from(["tidemark-migrate", "-v", "-q", "current"]).is_err());
}

#[test]
fn test_downgrade_requires_revision() {
    assert!(Cli::try_parse_from(["tidemark-migrate", "downgrade"]).is_err());
}

#[test]
fn test_create_writes_linked_scripts() {
    let temp = TempDir::new().expect("tempdir");
    let versions = temp.path().join("versions");
    let versions_arg = versions.display().to_string();

    for message in ["Add users table", "Add email column"] {
        let cli = parse(&["-q", "--versions-dir", &versions_arg, "create", message]);
        execute(cli, Registry::new()).expect("create");
    }

    let revisions = RevisionCatalog::new(&versions).discover().expect("discover");
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0].description, "Add users table");
    assert_eq!(
        revisions[1].parent_revision.as_deref(),
        Some(revisions[0].id.as_str())
    );
    assert!(fs::read_to_string(&revisions[1].path)
        .expect("read script")
        .contains("pub fn downgrade(_ctx: &MigrationContext<'_>)"));
}

#[test]
fn test_invalid_table_name_is_rejected_before_connecting() {
    let cli = parse(&[
        "--table-name",
        "bad name",
        "--database-url",
        "postgres://u:p@127.0.0.1:1/none",
        "current",
    ]);
    let err = execute(cli, Registry::new()).unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}
