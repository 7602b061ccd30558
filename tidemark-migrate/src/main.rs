//! Tidemark Migration CLI Tool
//!
//! Runs with an empty registry: `create`, `current`, `history`, `status` and
//! `init` work on any project, while `upgrade` and `downgrade` report a missing
//! procedure for every revision. Build a project binary around
//! `tidemark_migrate::run` to execute compiled scripts.

use std::process::ExitCode;
use tidemark::migration::Registry;

fn main() -> ExitCode {
    tidemark_migrate::run(Registry::new())
}
