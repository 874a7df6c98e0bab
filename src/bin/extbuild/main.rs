//! extbuild CLI - builds vendored third-party libraries with CMake

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging; JSON output must stay machine-readable
    let quiet = match &cli.command {
        Commands::Plan(args) => args.json,
        Commands::Locate(args) => args.json,
        Commands::Completions(_) => true,
        _ => false,
    };

    let default_filter = if quiet {
        "extbuild=off"
    } else if cli.verbose {
        "extbuild=debug"
    } else {
        "extbuild=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Execute command
    let root = cli.root;
    match cli.command {
        Commands::Build(args) => commands::build::execute(&root, args),
        Commands::Plan(args) => commands::plan::execute(&root, args),
        Commands::Toolchain(args) => commands::toolchain::execute(&root, args),
        Commands::Locate(args) => commands::locate::execute(&root, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
