//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.extbuild/config.toml` - User-wide defaults
//! - Project: `<root>/.extbuild/config.toml` - Build-root overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.
//!
//! ```toml
//! [toolchain]
//! program = "/opt/cmake/bin/cmake"
//!
//! [build]
//! parallel = true
//! verbose = false
//! configurations = ["Release", "Debug"]
//!
//! [platforms.Linux]
//! generator = "Ninja"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::platform::{BuildConfiguration, Platform, PlatformProfile};

/// extbuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External build tool settings
    pub toolchain: ToolchainSettings,

    /// Build settings
    pub build: BuildSettings,

    /// Generator/architecture overrides, keyed by platform name
    pub platforms: BTreeMap<String, PlatformOverride>,
}

/// Settings for the external build tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path or name of the CMake executable
    pub program: Option<PathBuf>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Pass `--parallel` to the build step (default: true)
    pub parallel: Option<bool>,

    /// Pass `--verbose` to the build step (default: true)
    pub verbose: Option<bool>,

    /// Configurations built when none are given on the command line
    pub configurations: Option<Vec<BuildConfiguration>>,
}

/// Partial override of a platform's generator pairing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformOverride {
    pub generator: Option<String>,
    pub arch: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.toolchain.program.is_some() {
            self.toolchain.program = other.toolchain.program;
        }

        if other.build.parallel.is_some() {
            self.build.parallel = other.build.parallel;
        }
        if other.build.verbose.is_some() {
            self.build.verbose = other.build.verbose;
        }
        if other.build.configurations.is_some() {
            self.build.configurations = other.build.configurations;
        }

        for (name, over) in other.platforms {
            // Canonical platform names so `linux` and `Linux` merge
            let key = name
                .parse::<Platform>()
                .map(|p| p.as_str().to_string())
                .unwrap_or(name);
            let entry = self.platforms.entry(key).or_default();
            if over.generator.is_some() {
                entry.generator = over.generator;
            }
            if over.arch.is_some() {
                entry.arch = over.arch;
            }
        }
    }

    /// CMake executable to use when none is given on the command line.
    pub fn cmake_program(&self) -> PathBuf {
        self.toolchain
            .program
            .clone()
            .unwrap_or_else(|| PathBuf::from("cmake"))
    }

    pub fn parallel(&self) -> bool {
        self.build.parallel.unwrap_or(true)
    }

    pub fn verbose(&self) -> bool {
        self.build.verbose.unwrap_or(true)
    }

    /// Configurations to build when the command line names none.
    pub fn default_configurations(&self) -> Vec<BuildConfiguration> {
        match &self.build.configurations {
            Some(configs) if !configs.is_empty() => configs.clone(),
            _ => vec![BuildConfiguration::default()],
        }
    }

    /// Resolve the generator pairing for a platform, applying overrides.
    pub fn profile(&self, platform: Platform) -> PlatformProfile {
        let mut profile = platform.default_profile();

        if let Some(over) = self.platforms.get(platform.as_str()) {
            if let Some(ref generator) = over.generator {
                profile.generator = generator.clone();
            }
            if let Some(ref arch) = over.arch {
                profile.arch = arch.clone();
            }
        }

        profile
    }
}

/// Get the global config directory (~/.extbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extbuild"))
}

/// Get the global config path (~/.extbuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (<root>/.extbuild/config.toml)
/// 2. Global config (~/.extbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global) = global_path {
        if global.exists() {
            config.merge(Config::load_or_default(global));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
