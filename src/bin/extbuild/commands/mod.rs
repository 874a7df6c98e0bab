//! Command implementations

pub mod build;
pub mod completions;
pub mod locate;
pub mod plan;
pub mod toolchain;

use std::path::Path;

use anyhow::Result;

use crate::cli::ManifestArgs;
use extbuild::builder::CMakeToolchain;
use extbuild::core::{BuildConfiguration, Layout, Manifest};
use extbuild::util::config::{global_config_path, load_config};
use extbuild::util::Config;

/// Everything a command needs from the build root.
pub struct Session {
    pub layout: Layout,
    pub config: Config,
}

impl Session {
    pub fn open(root: &Path) -> Self {
        let layout = Layout::new(root);
        let config = load_config(global_config_path().as_deref(), &layout.config_path());
        tracing::debug!("Build root: {}", layout.root().display());
        Session { layout, config }
    }

    pub fn manifest(&self, args: &ManifestArgs) -> Result<Manifest> {
        let path = args
            .manifest
            .clone()
            .unwrap_or_else(|| self.layout.manifest_path());
        tracing::debug!("Reading manifest {}", path.display());
        Ok(Manifest::load(&path)?)
    }

    /// CMake from the command line, then config, then PATH.
    pub fn toolchain(&self, args: &ManifestArgs) -> CMakeToolchain {
        let program = args
            .cmake
            .clone()
            .unwrap_or_else(|| self.config.cmake_program());
        CMakeToolchain::new(program)
            .parallel(self.config.parallel())
            .verbose(self.config.verbose())
    }

    /// Configurations from the command line, falling back to config.
    pub fn configurations(&self, requested: &[BuildConfiguration]) -> Vec<BuildConfiguration> {
        if requested.is_empty() {
            self.config.default_configurations()
        } else {
            requested.to_vec()
        }
    }
}
