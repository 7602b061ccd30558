//! Compile the sample revision scripts into a registry for the tests

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let versions = manifest_dir.join("versions");

    tidemark_migrate::build_script::generate_registry(&versions, &out_dir.join("registry.rs"))?;
    println!("cargo:rerun-if-changed={}", versions.display());
    Ok(())
}
