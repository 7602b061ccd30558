//! Build script helper for migration registry generation
//!
//! Revision scripts are plain Rust modules, so a project compiles them into
//! its migration binary. Call `generate_registry` from `build.rs` and include
//! the output:
//!
//! ```rust,ignore
//! // build.rs
//! fn main() {
//!     let out = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap()).join("registry.rs");
//!     tidemark_migrate::build_script::generate_registry("migrations/versions".as_ref(), &out).unwrap();
//!     println!("cargo:rerun-if-changed=migrations/versions");
//! }
//!
//! // src/main.rs
//! include!(concat!(env!("OUT_DIR"), "/registry.rs"));
//!
//! fn main() -> std::process::ExitCode {
//!     match registry() {
//!         Ok(registry) => tidemark_migrate::run(registry),
//!         Err(e) => {
//!             eprintln!("{e}");
//!             std::process::ExitCode::FAILURE
//!         }
//!     }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tidemark::migration::{RevisionCatalog, ScriptMetadata};

/// A revision script to compile into the registry
#[derive(Debug, Clone)]
pub struct ScriptInfo {
    pub revision: String,
    pub module_name: String,
    pub file_path: PathBuf,
    pub has_upgrade: bool,
    pub has_downgrade: bool,
}

/// Discover the scripts in a versions directory, in chain order
///
/// # Errors
///
/// Returns an error if the directory cannot be read or two scripts declare the
/// same revision.
pub fn discover_scripts(versions_dir: &Path) -> Result<Vec<ScriptInfo>, Box<dyn std::error::Error>> {
    let revisions = RevisionCatalog::new(versions_dir).discover()?;

    let mut scripts = Vec::with_capacity(revisions.len());
    for (i, revision) in revisions.into_iter().enumerate() {
        let content = fs::read_to_string(&revision.path)?;
        let meta = ScriptMetadata::parse(&content);
        let stem = revision
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        scripts.push(ScriptInfo {
            revision: revision.id,
            module_name: format!("m{:04}_{}", i + 1, sanitize_module_name(&stem)),
            file_path: fs::canonicalize(&revision.path)?,
            has_upgrade: meta.has_upgrade,
            has_downgrade: meta.has_downgrade,
        });
    }
    Ok(scripts)
}

/// Generate a registry module for `scripts`
///
/// The module includes each script with an absolute `#[path = "..."]`, so it
/// can be `include!`d from anywhere, and defines `registry()`, which registers
/// only the procedures each script defines.
///
/// # Errors
///
/// Returns an error if the output file cannot be written.
pub fn generate_registry_module(
    scripts: &[ScriptInfo],
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output_path
        .parent()
        .ok_or("Output path must have a parent directory")?;
    fs::create_dir_all(output_dir)?;

    let mut content = String::from("// Auto-generated migration registry\n");
    content.push_str("// DO NOT EDIT - This file is generated by build script\n\n");

    for script in scripts {
        let path_str = script.file_path.to_string_lossy();

        content.push_str(&format!("#[path = r#\"{path_str}\"#]\n"));
        content.push_str(&format!("pub mod {};\n", script.module_name));
    }

    content.push_str("\n/// Every compiled revision script, keyed by revision\n");
    content.push_str("pub fn registry() -> Result<::tidemark::migration::Registry, ::tidemark::migration::MigrationError> {\n");
    if scripts.is_empty() {
        content.push_str("    Ok(::tidemark::migration::Registry::new())\n");
    } else {
        content.push_str("    let mut registry = ::tidemark::migration::Registry::new();\n");
        for script in scripts {
            let module = &script.module_name;
            let procedure = |present: bool, name: &str| {
                if present {
                    format!("Some({module}::{name} as ::tidemark::migration::ProcedureFn)")
                } else {
                    "None".to_string()
                }
            };
            content.push_str(&format!(
                "    registry.register_fns({module}::REVISION, {}, {})?;\n",
                procedure(script.has_upgrade, "upgrade"),
                procedure(script.has_downgrade, "downgrade"),
            ));
        }
        content.push_str("    Ok(registry)\n");
    }
    content.push_str("}\n");

    fs::write(output_path, content)?;
    Ok(())
}

/// Discover scripts in `versions_dir` and write the registry module
///
/// Returns the number of scripts included.
///
/// # Errors
///
/// Returns an error if discovery or generation fails.
pub fn generate_registry(
    versions_dir: &Path,
    output_path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let scripts = discover_scripts(versions_dir)?;
    generate_registry_module(&scripts, output_path)?;
    Ok(scripts.len())
}

/// Sanitize a file stem to be a valid Rust module name
fn sanitize_module_name(stem: &str) -> String {
    stem.to_lowercase()
        .replace(['-', '.'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
}
