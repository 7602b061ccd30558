//! Command tree and command handlers

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tidemark::config::MigrationConfig;
use tidemark::migration::{
    Direction, MigrationEngine, MigrationError, MigrationInitializer, MigrationListener,
    PgRevisionStore, Registry, Revision, RevisionStore,
};
use tidemark::connection::redact_connection_string;
use tidemark::{connect, ConnectionError, PostgresExecutor};

#[derive(Parser, Debug)]
#[command(name = "tidemark-migrate")]
#[command(about = "Revision-based migration tool for Tidemark")]
#[command(version)]
pub struct Cli {
    /// Database connection URL (else TIDEMARK_DATABASE_URL, else DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Configuration file (default: config/migrations.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the revision scripts
    #[arg(long, global = true)]
    pub versions_dir: Option<PathBuf>,

    /// Tracking table name
    #[arg(long, global = true)]
    pub table_name: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Generate a new revision script
    Create {
        /// Short description of the change
        message: String,
    },

    /// Apply unapplied revisions
    Upgrade {
        /// Stop after this revision (default: apply everything)
        #[arg(long)]
        target: Option<String>,
    },

    /// Roll back applied revisions
    Downgrade {
        /// Roll back newest first until this revision (kept), or -1 for the latest only
        #[arg(allow_hyphen_values = true)]
        revision: String,
    },

    /// Show the most recently applied revision
    Current,

    /// List every revision and whether it is applied
    History {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show applied, pending and orphaned revisions
    Status,

    /// Create the versions directory and the tracking table
    Init,
}

/// Failures setting up a command, before the engine runs
#[derive(Debug, Error)]
pub enum CliError {
    #[error(
        "Database URL not provided. Use --database-url or set TIDEMARK_DATABASE_URL or DATABASE_URL."
    )]
    MissingDatabaseUrl,

    #[error("Error connecting to database: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Invalid configuration: {0}")]
    Config(#[source] MigrationError),
}

/// Parse the process arguments and run the command with `registry`
///
/// This is the whole CLI; a project binary with compiled scripts calls it with
/// its generated registry.
pub fn run(registry: Registry) -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match execute(cli, registry) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_line(&e));
            ExitCode::FAILURE
        }
    }
}

/// The one closing line printed for a failed command
fn failure_line(error: &anyhow::Error) -> String {
    format!("{} {error}", "✗ Error:".red().bold())
}

/// Run a parsed command
///
/// # Errors
///
/// Returns the setup or migration error that stopped the command.
pub fn execute(cli: Cli, registry: Registry) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_logging(&cli, &config);

    let console = Console { quiet: cli.quiet };
    let engine = MigrationEngine::new(config.clone(), registry)
        .with_listener(Box::new(console));

    if let Commands::Create { message } = &cli.command {
        let revision = engine.create(message)?;
        console.line(format!("Created migration with revision ID: {}", revision.id));
        console.line(format!("  {}", revision.path.display()));
        return Ok(());
    }

    let database_url = resolve_database_url(cli.database_url.clone())?;
    log::info!("Connecting to {}", redact_connection_string(&database_url));
    let client = connect(&database_url).map_err(CliError::from)?;
    let executor = PostgresExecutor::new(client);
    let store = PgRevisionStore::new(&executor, config.table().map_err(CliError::Config)?);
    log::debug!("Tracking table: {}", store.table());

    match cli.command {
        Commands::Create { .. } => Ok(()),
        Commands::Upgrade { target } => {
            // Failures are reported by the listener and by `run`.
            let report = engine.upgrade(&executor, &store, target.as_deref())?;
            if report.applied.is_empty() {
                console.line("Database is already up to date".to_string());
            }
            console.success("Database upgrade completed successfully");
            Ok(())
        }
        Commands::Downgrade { revision } => {
            let report = engine.downgrade(&executor, &store, &revision)?;
            if report.rolled_back.is_empty() {
                console.line("Nothing to roll back".to_string());
            }
            console.success("Database downgrade completed successfully");
            Ok(())
        }
        Commands::Current => {
            match engine.current(&store)? {
                Some(head) => println!("Current head: {head}"),
                None => println!("No migrations have been applied"),
            }
            Ok(())
        }
        Commands::History { json } => print_history(&engine, &store, json),
        Commands::Status => print_status(&engine, &store),
        Commands::Init => {
            let status = MigrationInitializer::new(config).initialize(&store)?;
            console.success(&format!(
                "Initialized: table ready, {} revision(s) applied, head {}",
                status.applied_count,
                status.current_head.as_deref().unwrap_or("None")
            ));
            Ok(())
        }
    }
}

/// Database URL from the flag or the environment
///
/// # Errors
///
/// Returns `CliError::MissingDatabaseUrl` when none is set.
pub fn resolve_database_url(flag: Option<String>) -> Result<String, CliError> {
    flag.or_else(|| std::env::var("TIDEMARK_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .ok_or(CliError::MissingDatabaseUrl)
}

fn load_config(cli: &Cli) -> Result<MigrationConfig, CliError> {
    let mut config =
        MigrationConfig::load_from(cli.config.as_deref()).map_err(CliError::Config)?;

    if let Some(dir) = &cli.versions_dir {
        // Taken as given, not relative to script_location.
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
        config.version_locations = dir.display().to_string();
    }
    if let Some(table) = &cli.table_name {
        config.table_name = table.clone();
        config.table().map_err(CliError::Config)?;
    }
    Ok(config)
}

fn init_logging(cli: &Cli, config: &MigrationConfig) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    // A second CLI run in the same process keeps the first logger.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn print_history(
    engine: &MigrationEngine,
    store: &dyn RevisionStore,
    json: bool,
) -> anyhow::Result<()> {
    let history = engine.history(store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    println!("Migration History:");
    println!("{}", "-".repeat(80));
    for entry in &history {
        let marker = if entry.applied {
            "✓".green()
        } else {
            "✗".red()
        };
        let applied_at = entry
            .applied_at
            .map(|t| format!(" ({})", local_time(t)))
            .unwrap_or_default();
        println!("{marker} {} - {}{applied_at}", entry.revision, entry.description);
    }
    Ok(())
}

fn print_status(engine: &MigrationEngine, store: &dyn RevisionStore) -> anyhow::Result<()> {
    let status = engine.status(store)?;

    println!("\n{}\n", "Migration Status".bold());

    if status.applied.is_empty() {
        println!("Applied: None");
    } else {
        println!("Applied ({}):", status.applied_count);
        for record in &status.applied {
            println!(
                "  {} {} ({})",
                "✓".green(),
                record.revision,
                local_time(record.applied_at)
            );
        }
    }

    println!();
    if status.pending.is_empty() {
        println!("Pending: None");
    } else {
        println!("Pending ({}):", status.pending_count);
        for revision in &status.pending {
            println!("  {} {} - {}", "…".yellow(), revision.id, revision.description);
        }
    }

    if !status.orphaned.is_empty() {
        println!();
        println!("{}", "Applied revisions with no script:".yellow());
        for revision in &status.orphaned {
            println!("  ? {revision}");
        }
    }

    println!(
        "\nSummary: {} applied, {} pending",
        status.applied_count, status.pending_count
    );
    if status.is_up_to_date() {
        println!("{}", "Database is up to date".green());
    } else if let Some(next) = status.next_pending() {
        println!("Next to apply: {}", next.id);
    }
    Ok(())
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Prints a ✓ / ✗ line per revision
#[derive(Debug, Clone, Copy)]
struct Console {
    quiet: bool,
}

impl Console {
    fn line(&self, text: String) {
        if !self.quiet {
            println!("{text}");
        }
    }

    fn success(&self, text: &str) {
        if !self.quiet {
            println!("{} {text}", "✓".green());
        }
    }

    fn failure(&self, text: &str) {
        eprintln!("{} {text}", "✗".red());
    }
}

impl MigrationListener for Console {
    fn succeeded(&self, revision: &Revision, direction: Direction, elapsed: Duration) {
        let verb = match direction {
            Direction::Upgrade => "Applied",
            Direction::Downgrade => "Rolled back",
        };
        self.success(&format!(
            "{verb} {}: {} ({}ms)",
            revision.id,
            revision.description,
            elapsed.as_millis()
        ));
    }

    fn failed(&self, revision: &Revision, direction: Direction, error: &MigrationError) {
        self.failure(&format!("{direction} of {} failed: {}", revision.id, error.root()));
    }
}
