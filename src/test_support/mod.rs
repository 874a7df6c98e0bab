//! Test utilities and mocks for unit tests.
//!
//! [`RecordingToolchain`] stands in for CMake: it records every step it is
//! asked to run and fakes an install tree so header syncing has something
//! to mirror.
//!
//! # Example
//!
//! ```rust,ignore
//! use extbuild::test_support::{BuildRoot, RecordingToolchain};
//!
//! let root = BuildRoot::new();
//! root.add_source("zlib", "1.2.11");
//! let toolchain = RecordingToolchain::new().fail_on(BuildStep::Build, "zlib-1.2.11");
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::toolchain::{
    BuildStep, BuildToolchain, ConfigureRequest, StepStatus, ToolchainError,
};
use crate::core::platform::BuildConfiguration;

pub use fixtures::*;

/// One recorded toolchain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Configure {
        source_dir: PathBuf,
        install_dir: PathBuf,
        configuration: BuildConfiguration,
        shared_libs: bool,
        prefix_paths: Vec<PathBuf>,
        flags: Vec<(String, String)>,
    },
    Build {
        install_dir: PathBuf,
        configuration: BuildConfiguration,
    },
    Install {
        install_dir: PathBuf,
        configuration: BuildConfiguration,
    },
}

impl Invocation {
    pub fn step(&self) -> BuildStep {
        match self {
            Invocation::Configure { .. } => BuildStep::Configure,
            Invocation::Build { .. } => BuildStep::Build,
            Invocation::Install { .. } => BuildStep::Install,
        }
    }

    pub fn install_dir(&self) -> &Path {
        match self {
            Invocation::Configure { install_dir, .. }
            | Invocation::Build { install_dir, .. }
            | Invocation::Install { install_dir, .. } => install_dir,
        }
    }
}

/// Mock toolchain that records calls instead of running CMake.
///
/// On install it writes `include/<module>.h` into the install tree, with
/// the install directory as its contents, so tests can tell which
/// configuration's headers ended up synced.
#[derive(Debug)]
pub struct RecordingToolchain {
    version: Option<String>,
    failure: Option<(BuildStep, String)>,
    calls: RefCell<Vec<Invocation>>,
}

impl Default for RecordingToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingToolchain {
    pub fn new() -> Self {
        RecordingToolchain {
            version: Some("cmake version 3.28.1".to_string()),
            failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Set the `--version` output.
    pub fn with_version(mut self, output: impl Into<String>) -> Self {
        self.version = Some(output.into());
        self
    }

    /// Behave as if the tool isn't installed.
    pub fn without_tool(mut self) -> Self {
        self.version = None;
        self
    }

    /// Fail `step` for any install directory containing `module`.
    pub fn fail_on(mut self, step: BuildStep, module: impl Into<String>) -> Self {
        self.failure = Some((step, module.into()));
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Number of calls for one step.
    pub fn count(&self, step: BuildStep) -> usize {
        self.calls.borrow().iter().filter(|c| c.step() == step).count()
    }

    fn record(&self, call: Invocation) -> StepStatus {
        let failed = self.failure.as_ref().is_some_and(|(step, module)| {
            *step == call.step() && call.install_dir().to_string_lossy().contains(module.as_str())
        });
        self.calls.borrow_mut().push(call);

        if failed {
            StepStatus::Failed { code: Some(1) }
        } else {
            StepStatus::Success
        }
    }
}

impl BuildToolchain for RecordingToolchain {
    fn name(&self) -> &str {
        "cmake"
    }

    fn query_version(&self) -> Result<String, ToolchainError> {
        self.version.clone().ok_or_else(|| ToolchainError::NotFound {
            program: "cmake".to_string(),
        })
    }

    fn configure(&self, request: &ConfigureRequest<'_>) -> Result<StepStatus> {
        Ok(self.record(Invocation::Configure {
            source_dir: request.source_dir.to_path_buf(),
            install_dir: request.install_dir.to_path_buf(),
            configuration: request.configuration,
            shared_libs: request.shared_libs,
            prefix_paths: request.prefix_paths.to_vec(),
            flags: request
                .extra_flags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }))
    }

    fn build(&self, install_dir: &Path, configuration: BuildConfiguration) -> Result<StepStatus> {
        Ok(self.record(Invocation::Build {
            install_dir: install_dir.to_path_buf(),
            configuration,
        }))
    }

    fn install(&self, install_dir: &Path, configuration: BuildConfiguration) -> Result<StepStatus> {
        let status = self.record(Invocation::Install {
            install_dir: install_dir.to_path_buf(),
            configuration,
        });

        if status.success() {
            // Installs/<module>/<platform>/<configuration>
            let module = install_dir
                .ancestors()
                .nth(2)
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "installed".to_string());
            let include = install_dir.join("include");
            std::fs::create_dir_all(&include)?;
            std::fs::write(
                include.join(format!("{}.h", module)),
                install_dir.display().to_string(),
            )?;
        }

        Ok(status)
    }
}
