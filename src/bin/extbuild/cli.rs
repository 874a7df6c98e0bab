//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use extbuild::core::platform::{BuildConfiguration, Platform};

/// extbuild - Build vendored third-party libraries with CMake
#[derive(Parser)]
#[command(name = "extbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Build root containing BuildConfig.yaml and External/
    #[arg(long, global = true, env = "EXTBUILD_ROOT", default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every library version in the manifest
    Build(BuildArgs),

    /// Show the build order and install paths without building
    Plan(PlanArgs),

    /// Check the CMake installation against the manifest
    Toolchain(ToolchainArgs),

    /// Show include paths, libraries and definitions for a module
    Locate(LocateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by commands that read the manifest.
#[derive(Args)]
pub struct ManifestArgs {
    /// Path to the manifest (defaults to <root>/BuildConfig.yaml)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// CMake executable to use
    #[arg(long, env = "EXTBUILD_CMAKE")]
    pub cmake: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: Platform,

    /// Build configurations (default: Release)
    #[arg(short = 'c', long = "configs", value_enum, num_args = 1..)]
    pub configurations: Vec<BuildConfiguration>,

    /// Wipe install directories before building
    #[arg(short, long)]
    pub force: bool,

    /// Print what would run without running it
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: Platform,

    /// Build configurations (default: Release)
    #[arg(short = 'c', long = "configs", value_enum, num_args = 1..)]
    pub configurations: Vec<BuildConfiguration>,

    /// Emit the plan as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args)]
pub struct LocateArgs {
    /// Module name, e.g. zlib-1.2.11
    pub module: String,

    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: Platform,

    /// Build configuration
    #[arg(short, long, value_enum, default_value_t = BuildConfiguration::Release)]
    pub configuration: BuildConfiguration,

    /// Emit the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
