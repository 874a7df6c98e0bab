//! `extbuild toolchain` command

use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::cli::ToolchainArgs;
use extbuild::builder::{ensure_version, BuildToolchain};

pub fn execute(root: &Path, args: ToolchainArgs) -> Result<()> {
    let session = Session::open(root);
    let toolchain = session.toolchain(&args.manifest);

    // Without a manifest only the presence of the tool is checked.
    let manifest_path = args
        .manifest
        .manifest
        .clone()
        .unwrap_or_else(|| session.layout.manifest_path());
    let minimum = if manifest_path.exists() {
        let manifest = session.manifest(&args.manifest)?;
        manifest.min_tool_version().map(str::to_string)
    } else {
        tracing::debug!("No manifest at {}", manifest_path.display());
        None
    };

    let found = ensure_version(&toolchain, minimum.as_deref())?;

    println!("Toolchain:");
    println!();
    println!("  Program: {}", toolchain.program().display());
    println!("  Name:    {}", toolchain.name());
    println!("  Version: {}", found);
    match minimum {
        Some(minimum) => println!("  Minimum: {}", minimum),
        None => println!("  Minimum: (none)"),
    }

    Ok(())
}
