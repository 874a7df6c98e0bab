//! Target platforms and build configurations.
//!
//! Both sets are closed. A platform maps to a CMake generator and a target
//! architecture; the pairing can be overridden from config but the set of
//! platform names cannot grow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target platform, named after the downstream module system's platforms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    clap::ValueEnum,
)]
pub enum Platform {
    #[value(name = "Win64")]
    Win64,
    #[value(name = "Linux")]
    Linux,
    #[value(name = "Mac")]
    Mac,
    #[value(name = "IOS")]
    #[serde(rename = "IOS")]
    Ios,
}

impl Platform {
    /// All known platforms.
    pub const ALL: [Platform; 4] = [
        Platform::Win64,
        Platform::Linux,
        Platform::Mac,
        Platform::Ios,
    ];

    /// Directory/display name of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Win64 => "Win64",
            Platform::Linux => "Linux",
            Platform::Mac => "Mac",
            Platform::Ios => "IOS",
        }
    }

    /// Default generator/architecture pairing.
    pub fn default_profile(&self) -> PlatformProfile {
        match self {
            Platform::Win64 => PlatformProfile::new("Visual Studio 17 2022", "x64"),
            Platform::Linux => PlatformProfile::new("Unix Makefiles", "x86_64"),
            Platform::Mac => PlatformProfile::new("Xcode", "x86_64"),
            Platform::Ios => PlatformProfile::new("Xcode", "arm64"),
        }
    }

    /// Glob pattern matching static libraries installed for this platform.
    pub fn static_lib_pattern(&self) -> &'static str {
        match self {
            Platform::Win64 => "*.lib",
            _ => "*.a",
        }
    }

    /// Glob pattern matching runtime (shared) libraries for this platform.
    pub fn runtime_lib_pattern(&self) -> &'static str {
        match self {
            Platform::Win64 => "*.dll",
            Platform::Linux => "*.so",
            Platform::Mac | Platform::Ios => "*.dylib",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown platform `{}` (expected one of: Win64, Linux, Mac, IOS)",
                    s
                )
            })
    }
}

/// How CMake is told which architecture to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchSelection {
    /// `-A <arch>` (Visual Studio generators)
    PlatformFlag,
    /// `-DCMAKE_OSX_ARCHITECTURES=<arch>` (Xcode)
    OsxArchitectures,
    /// Single-config makefile-style generators target the host toolchain.
    Host,
}

/// Generator and architecture used to configure builds for a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub generator: String,
    pub arch: String,
}

impl PlatformProfile {
    pub fn new(generator: impl Into<String>, arch: impl Into<String>) -> Self {
        PlatformProfile {
            generator: generator.into(),
            arch: arch.into(),
        }
    }

    /// Determine how the architecture reaches CMake for this generator.
    pub fn arch_selection(&self) -> ArchSelection {
        if self.generator.starts_with("Visual Studio") {
            ArchSelection::PlatformFlag
        } else if self.generator == "Xcode" {
            ArchSelection::OsxArchitectures
        } else {
            ArchSelection::Host
        }
    }
}

/// A named build variant. Each one gets its own install tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum BuildConfiguration {
    #[default]
    #[value(name = "Release")]
    Release,
    #[value(name = "RelWithDebInfo")]
    RelWithDebInfo,
    #[value(name = "Debug")]
    Debug,
}

impl BuildConfiguration {
    pub const ALL: [BuildConfiguration; 3] = [
        BuildConfiguration::Release,
        BuildConfiguration::RelWithDebInfo,
        BuildConfiguration::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfiguration::Release => "Release",
            BuildConfiguration::RelWithDebInfo => "RelWithDebInfo",
            BuildConfiguration::Debug => "Debug",
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildConfiguration::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown build configuration `{}` \
                     (expected one of: Release, RelWithDebInfo, Debug)",
                    s
                )
            })
    }
}
