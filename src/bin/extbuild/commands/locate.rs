//! `extbuild locate` command

use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::cli::LocateArgs;
use extbuild::ops::locate_module;

pub fn execute(root: &Path, args: LocateArgs) -> Result<()> {
    let session = Session::open(root);
    let found = locate_module(
        &session.layout,
        &args.module,
        args.platform,
        args.configuration,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    println!("{} ({}, {})", found.module, args.platform, args.configuration);
    print_list("Include dirs", found.include_dirs.iter().map(|p| p.display().to_string()));
    print_list("Static libs", found.static_libs.iter().map(|p| p.display().to_string()));
    print_list("Runtime libs", found.runtime_libs.iter().map(|p| p.display().to_string()));
    print_list("Definitions", found.public_definitions.iter().cloned());

    Ok(())
}

fn print_list(title: &str, items: impl Iterator<Item = String>) {
    println!();
    println!("  {}:", title);
    let mut empty = true;
    for item in items {
        println!("    {}", item);
        empty = false;
    }
    if empty {
        println!("    (none)");
    }
}
