//! Tidemark Migration Library
//!
//! The CLI tool (main.rs) is a thin wrapper over [`run`]; projects that compile
//! their revision scripts call [`run`] with the registry generated by
//! [`build_script`].

pub mod build_script;
pub mod cli;

pub use cli::{execute, run, Cli, CliError, Commands};
