//! Implementation of `extbuild locate`.
//!
//! The consumer side of a build root: given a module name such as
//! `zlib-1.2.11`, find what a downstream build needs to use it on one
//! platform and configuration.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::core::layout::Layout;
use crate::core::platform::{BuildConfiguration, Platform};
use crate::ops::metadata::read_metadata;
use crate::util::fs::glob_files;

/// Everything a consumer needs to compile and link against one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub module: String,
    pub include_dirs: Vec<PathBuf>,
    pub static_libs: Vec<PathBuf>,
    pub runtime_libs: Vec<PathBuf>,
    pub public_definitions: Vec<String>,
}

/// Split `<library>-<version>` at the first `-`.
pub fn split_module_name(module: &str) -> Result<(&str, &str)> {
    match module.split_once('-') {
        Some((library, version)) if !library.is_empty() && !version.is_empty() => {
            Ok((library, version))
        }
        _ => bail!(
            "module name `{}` must be of the form <library>-<version>",
            module
        ),
    }
}

/// Locate headers, libraries and definitions for `module`.
///
/// Missing directories simply contribute nothing. The metadata document
/// must exist; a module it doesn't mention has no definitions.
pub fn locate_module(
    layout: &Layout,
    module: &str,
    platform: Platform,
    configuration: BuildConfiguration,
) -> Result<ModuleDescriptor> {
    let (library, version) = split_module_name(module)?;

    let headers_dir = layout.headers_dir(library, version);
    let include_dirs = if headers_dir.is_dir() {
        vec![headers_dir]
    } else {
        Vec::new()
    };

    let install_dir = layout.install_dir(library, version, platform, configuration);
    let static_libs = glob_files(
        &install_dir.join("lib"),
        &[platform.static_lib_pattern()],
    )?;
    let runtime_libs = glob_files(
        &install_dir.join("bin"),
        &[platform.runtime_lib_pattern()],
    )?;

    let metadata = read_metadata(&layout.metadata_path())?;
    let public_definitions = match metadata.find_ignore_case(library, version) {
        Some(meta) => meta
            .public_definitions
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect(),
        None => {
            tracing::debug!("No metadata recorded for `{}`", module);
            Vec::new()
        }
    };

    Ok(ModuleDescriptor {
        module: module.to_string(),
        include_dirs,
        static_libs,
        runtime_libs,
        public_definitions,
    })
}
