//! `extbuild plan` command

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use super::Session;
use crate::cli::PlanArgs;
use extbuild::builder::BuildPlan;
use extbuild::core::{BuildConfiguration, Platform, PlatformProfile};
use extbuild::ops::{BuildOptions, Orchestrator, ProcessedVersion};

#[derive(Serialize)]
struct PlanReport<'a> {
    platform: Platform,
    profile: &'a PlatformProfile,
    configurations: &'a [BuildConfiguration],
    entries: &'a [ProcessedVersion],
    skipped: Vec<String>,
}

pub fn execute(root: &Path, args: PlanArgs) -> Result<()> {
    let session = Session::open(root);
    let manifest = session.manifest(&args.manifest)?;
    let plan = BuildPlan::new(&manifest)?;

    let toolchain = session.toolchain(&args.manifest);
    let options = BuildOptions::new(args.platform, &session.configurations(&args.configurations))
        .with_profile(session.config.profile(args.platform))
        .dry_run(true);

    let summary = Orchestrator::new(&session.layout, &toolchain, &options).run(&plan)?;

    let report = PlanReport {
        platform: args.platform,
        profile: &options.profile,
        configurations: &options.configurations,
        entries: &summary.processed,
        skipped: summary.skipped.iter().map(ToString::to_string).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &PlanReport<'_>) {
    println!(
        "Build plan for {} ({}, {}):",
        report.platform, report.profile.generator, report.profile.arch
    );
    println!();

    if report.entries.is_empty() {
        println!("  (nothing to build)");
    }

    for (index, entry) in report.entries.iter().enumerate() {
        println!(
            "  {}. {}-{} ({})",
            index + 1,
            entry.library,
            entry.version,
            entry.kind
        );

        for (configuration, install_dir) in &entry.installs {
            println!("       {:<15} {}", configuration.as_str(), install_dir.display());
        }
        for prefix in &entry.prefix_paths {
            println!("       {:<15} {}", "prefix", prefix.display());
        }
        println!("       {:<15} {}", "headers", entry.headers_dir.display());
    }

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for reason in &report.skipped {
            println!("  - {}", reason);
        }
    }
}
