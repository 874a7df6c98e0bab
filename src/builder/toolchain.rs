//! The external build toolchain seam and the version gate in front of it.
//!
//! Everything the orchestrator needs from CMake goes through
//! [`BuildToolchain`]: the three build steps plus a version query. The real
//! implementation shells out (see [`crate::builder::cmake`]); tests plug in
//! a recording mock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use semver::Version;
use thiserror::Error;

use crate::core::platform::{BuildConfiguration, PlatformProfile};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// Problems with the build tool itself. Always fatal, and always raised
/// before any library is processed.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("`{program}` not found in PATH")]
    NotFound { program: String },

    #[error("failed to run `{program} --version`")]
    Query {
        program: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not parse a version from `{program} --version` output: {output:?}")]
    UnparseableVersion { program: String, output: String },

    #[error("invalid minimum version `{0}` (expected major[.minor[.patch]])")]
    InvalidMinimum(String),

    #[error("{program} version too old: found {found}, need at least {minimum}")]
    TooOld {
        program: String,
        found: Version,
        minimum: Version,
    },
}

/// Outcome of one toolchain step. Nothing beyond pass/fail is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed { code: Option<i32> },
}

impl StepStatus {
    pub fn success(&self) -> bool {
        matches!(self, StepStatus::Success)
    }
}

impl From<ExitStatus> for StepStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            StepStatus::Success
        } else {
            StepStatus::Failed {
                code: status.code(),
            }
        }
    }
}

/// The three steps run for every library/version/configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Build,
    Install,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Configure => write!(f, "configure"),
            BuildStep::Build => write!(f, "build"),
            BuildStep::Install => write!(f, "install"),
        }
    }
}

/// Fully resolved inputs for the configure step.
#[derive(Debug, Clone)]
pub struct ConfigureRequest<'a> {
    pub profile: &'a PlatformProfile,
    pub configuration: BuildConfiguration,
    /// `BUILD_SHARED_LIBS`; true for dynamic libraries.
    pub shared_libs: bool,
    /// Install trees of everything built earlier, in build order.
    pub prefix_paths: &'a [PathBuf],
    /// Install prefix, also used as the binary directory.
    pub install_dir: &'a Path,
    pub extra_flags: &'a IndexMap<String, String>,
    pub source_dir: &'a Path,
}

/// An external build toolchain.
///
/// Step methods return `Err` only when the tool couldn't be run at all; a
/// tool that ran and failed reports [`StepStatus::Failed`].
pub trait BuildToolchain {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Raw `--version` output.
    fn query_version(&self) -> Result<String, ToolchainError>;

    fn configure(&self, request: &ConfigureRequest<'_>) -> anyhow::Result<StepStatus>;

    fn build(
        &self,
        install_dir: &Path,
        configuration: BuildConfiguration,
    ) -> anyhow::Result<StepStatus>;

    fn install(
        &self,
        install_dir: &Path,
        configuration: BuildConfiguration,
    ) -> anyhow::Result<StepStatus>;

    /// Command line `step` would run for `request`, if the toolchain has
    /// one. Used to report planned steps without running them.
    fn describe(&self, _step: BuildStep, _request: &ConfigureRequest<'_>) -> Option<String> {
        None
    }
}

/// Extract the first dotted version from tool output, e.g.
/// `cmake version 3.28.1`. A missing patch component reads as 0.
pub fn parse_tool_version(output: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(output)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Parse a required minimum such as `3`, `3.20` or `3.20.0`.
pub fn parse_minimum_version(minimum: &str) -> Result<Version, ToolchainError> {
    let invalid = || ToolchainError::InvalidMinimum(minimum.to_string());

    let parts = minimum
        .trim()
        .split('.')
        .map(|p| p.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let at = |i: usize| parts.get(i).copied().unwrap_or(0);
    Ok(Version::new(at(0), at(1), at(2)))
}

/// Check that the toolchain exists and is at least `minimum`.
///
/// Versions compare component-wise as integers. Without a minimum only
/// the presence of the tool is checked.
pub fn ensure_version(
    toolchain: &dyn BuildToolchain,
    minimum: Option<&str>,
) -> Result<Version, ToolchainError> {
    let minimum = minimum.map(parse_minimum_version).transpose()?;

    let output = toolchain.query_version()?;
    let found = output
        .lines()
        .find_map(parse_tool_version)
        .ok_or_else(|| ToolchainError::UnparseableVersion {
            program: toolchain.name().to_string(),
            output: output.clone(),
        })?;

    if let Some(minimum) = minimum {
        if found < minimum {
            return Err(ToolchainError::TooOld {
                program: toolchain.name().to_string(),
                found,
                minimum,
            });
        }
    }

    tracing::info!("Found {} version {}", toolchain.name(), found);
    Ok(found)
}
