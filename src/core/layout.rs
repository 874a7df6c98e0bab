//! On-disk layout of a build root.
//!
//! ```text
//! <root>/
//!   BuildConfig.yaml
//!   BuildMetadata.xml
//!   External/<library>/<version>/          sources
//!   Installs/<library>-<version>/<platform>/<configuration>/
//!   Headers/<library>-<version>/           configuration-independent headers
//! ```

use std::path::{Path, PathBuf};

use crate::core::manifest::MANIFEST_FILE_NAME;
use crate::core::platform::{BuildConfiguration, Platform};

/// Name of the metadata document written at the end of a run.
pub const METADATA_FILE_NAME: &str = "BuildMetadata.xml";

/// Resolves every path a run reads or writes from a single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default manifest location.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }

    /// Project-level config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(".extbuild").join("config.toml")
    }

    /// Source tree for one library version.
    pub fn source_dir(&self, library: &str, version: &str) -> PathBuf {
        self.root.join("External").join(library).join(version)
    }

    /// Root of every install tree for one library version.
    pub fn install_root(&self, library: &str, version: &str) -> PathBuf {
        self.root
            .join("Installs")
            .join(module_name(library, version))
    }

    /// Install tree for one library/version/platform/configuration.
    ///
    /// Also used as the CMake binary directory.
    pub fn install_dir(
        &self,
        library: &str,
        version: &str,
        platform: Platform,
        configuration: BuildConfiguration,
    ) -> PathBuf {
        self.install_root(library, version)
            .join(platform.as_str())
            .join(configuration.as_str())
    }

    /// Synced header tree for one library version.
    pub fn headers_dir(&self, library: &str, version: &str) -> PathBuf {
        self.root.join("Headers").join(module_name(library, version))
    }
}

/// `<library>-<version>`, the name downstream modules refer to.
pub fn module_name(library: &str, version: &str) -> String {
    format!("{}-{}", library, version)
}
