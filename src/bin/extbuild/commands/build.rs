//! `extbuild build` command

use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::cli::BuildArgs;
use extbuild::ops::{build_external, BuildOptions};

pub fn execute(root: &Path, args: BuildArgs) -> Result<()> {
    let session = Session::open(root);
    let manifest = session.manifest(&args.manifest)?;
    let toolchain = session.toolchain(&args.manifest);

    let options = BuildOptions::new(args.platform, &session.configurations(&args.configurations))
        .with_profile(session.config.profile(args.platform))
        .force_clean(args.force)
        .dry_run(args.dry_run);

    let summary = build_external(&session.layout, &manifest, &toolchain, &options)?;

    if !summary.skipped.is_empty() {
        tracing::warn!("{} library versions were skipped", summary.skipped.len());
    }

    Ok(())
}
