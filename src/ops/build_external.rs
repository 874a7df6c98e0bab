//! Implementation of `extbuild build`.
//!
//! The [`Orchestrator`] walks a [`BuildPlan`] strictly in order. Each
//! library version is validated first; a version that fails validation is
//! logged and skipped. Header-only versions get their include folder
//! mirrored into `Headers/`. Buildable versions are configured, built and
//! installed once per configuration, then their installed include folder
//! is mirrored the same way. Any failing toolchain step ends the run.
//!
//! Every successfully built version is appended to the
//! [`InstallPathChain`], so later libraries can find earlier ones through
//! `CMAKE_PREFIX_PATH`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::builder::plan::{BuildPlan, PlanEntry, PlanError};
use crate::builder::toolchain::{
    ensure_version, BuildStep, BuildToolchain, ConfigureRequest, StepStatus, ToolchainError,
};
use crate::core::layout::{module_name, Layout};
use crate::core::manifest::{LibraryKind, Manifest, ManifestError, ValidationError};
use crate::core::platform::{BuildConfiguration, Platform, PlatformProfile};
use crate::ops::metadata::{write_metadata, LibraryMetadata};
use crate::util::fs::{ensure_dir, remove_dir_all_force, sync_dir};

/// Fatal errors that end a run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(
        "{step} failed for `{module}` ({configuration}){}",
        code.map(|c| format!(" with exit code {}", c)).unwrap_or_default()
    )]
    StepFailed {
        step: BuildStep,
        module: String,
        configuration: BuildConfiguration,
        code: Option<i32>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Options for a run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub platform: Platform,

    /// Generator and architecture for `platform`.
    pub profile: PlatformProfile,

    /// Configurations to build, in order. Never empty.
    pub configurations: Vec<BuildConfiguration>,

    /// Wipe each install directory before configuring it.
    pub force_clean: bool,

    /// Log planned steps without running the toolchain, touching the
    /// filesystem or writing metadata.
    pub dry_run: bool,
}

impl BuildOptions {
    /// Options with the platform's default profile.
    ///
    /// Duplicate configurations are dropped; an empty list means Release.
    pub fn new(platform: Platform, configurations: &[BuildConfiguration]) -> Self {
        let mut unique: Vec<BuildConfiguration> = Vec::with_capacity(configurations.len());
        for configuration in configurations {
            if !unique.contains(configuration) {
                unique.push(*configuration);
            }
        }
        if unique.is_empty() {
            unique.push(BuildConfiguration::default());
        }

        BuildOptions {
            platform,
            profile: platform.default_profile(),
            configurations: unique,
            force_clean: false,
            dry_run: false,
        }
    }

    pub fn with_profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn force_clean(mut self, force_clean: bool) -> Self {
        self.force_clean = force_clean;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// One successfully built library version and its install trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub library: String,
    pub version: String,
    pub installs: IndexMap<BuildConfiguration, PathBuf>,
}

/// Install trees of everything built so far in this run, in build order.
///
/// Only grows; an entry is added once all configurations of a version
/// have been installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallPathChain {
    entries: Vec<ChainEntry>,
}

impl InstallPathChain {
    /// Every install tree appended so far: all configurations of the first
    /// entry, then all of the second, and so on.
    pub fn prefix_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .flat_map(|entry| entry.installs.values().cloned())
            .collect()
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: ChainEntry) {
        self.entries.push(entry);
    }
}

/// A version that made it past validation.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedVersion {
    pub library: String,
    pub version: String,
    pub kind: LibraryKind,
    pub headers_dir: PathBuf,
    /// Install tree per configuration; empty for header-only versions.
    pub installs: IndexMap<BuildConfiguration, PathBuf>,
    /// `CMAKE_PREFIX_PATH` used for every configuration.
    pub prefix_paths: Vec<PathBuf>,
}

/// Result of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: Vec<ProcessedVersion>,
    pub skipped: Vec<ValidationError>,
    pub install_paths: InstallPathChain,
    pub metadata: LibraryMetadata,
}

impl RunSummary {
    pub fn built(&self) -> usize {
        self.processed.iter().filter(|p| p.kind.is_buildable()).count()
    }

    pub fn header_only(&self) -> usize {
        self.processed.len() - self.built()
    }
}

/// Drives one run over a build plan.
pub struct Orchestrator<'a> {
    layout: &'a Layout,
    toolchain: &'a dyn BuildToolchain,
    options: &'a BuildOptions,
    summary: RunSummary,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        layout: &'a Layout,
        toolchain: &'a dyn BuildToolchain,
        options: &'a BuildOptions,
    ) -> Self {
        Orchestrator {
            layout,
            toolchain,
            options,
            summary: RunSummary::default(),
        }
    }

    /// Process every plan entry in order.
    pub fn run(mut self, plan: &BuildPlan<'_>) -> Result<RunSummary, BuildError> {
        tracing::info!(
            "Processing {} library versions for {} ({})",
            plan.len(),
            self.options.platform,
            self.options
                .configurations
                .iter()
                .map(BuildConfiguration::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        for entry in plan.iter() {
            let kind = match self.validate(entry) {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::error!("{}", err);
                    self.summary.skipped.push(err);
                    continue;
                }
            };

            self.summary
                .metadata
                .record(entry.library, entry.version, &entry.config.public_definitions);

            let processed = if kind.is_buildable() {
                self.build_version(entry, kind)?
            } else {
                self.sync_headers(entry)?
            };
            self.summary.processed.push(processed);
        }

        tracing::info!(
            "Finished: {} built, {} header-only, {} skipped",
            self.summary.built(),
            self.summary.header_only(),
            self.summary.skipped.len()
        );

        Ok(self.summary)
    }

    fn validate(&self, entry: &PlanEntry<'_>) -> Result<LibraryKind, ValidationError> {
        if entry.version.is_empty() {
            return Err(ValidationError::EmptyVersion {
                library: entry.library.to_string(),
            });
        }

        let kind = entry.config.kind(entry.library, entry.version)?;

        let source_dir = self.layout.source_dir(entry.library, entry.version);
        if !source_dir.exists() {
            return Err(ValidationError::MissingSource {
                library: entry.library.to_string(),
                version: entry.version.to_string(),
                path: source_dir,
            });
        }

        Ok(kind)
    }

    fn sync_headers(&self, entry: &PlanEntry<'_>) -> Result<ProcessedVersion, BuildError> {
        let module = module_name(entry.library, entry.version);
        tracing::info!("Processing header-only library `{}`", module);

        let source = self
            .layout
            .source_dir(entry.library, entry.version)
            .join(&entry.config.include_source_folder);
        let headers_dir = self.layout.headers_dir(entry.library, entry.version);
        self.mirror(&source, &headers_dir)?;

        Ok(ProcessedVersion {
            library: entry.library.to_string(),
            version: entry.version.to_string(),
            kind: LibraryKind::Header,
            headers_dir,
            installs: IndexMap::new(),
            prefix_paths: Vec::new(),
        })
    }

    fn build_version(
        &mut self,
        entry: &PlanEntry<'_>,
        kind: LibraryKind,
    ) -> Result<ProcessedVersion, BuildError> {
        let module = module_name(entry.library, entry.version);
        let source_dir = self.layout.source_dir(entry.library, entry.version);
        let mut installs = IndexMap::new();
        let prefix_paths = self.summary.install_paths.prefix_paths();

        for &configuration in &self.options.configurations {
            tracing::info!("Building `{}` ({}, {})", module, kind, configuration);

            let install_dir = self.layout.install_dir(
                entry.library,
                entry.version,
                self.options.platform,
                configuration,
            );
            self.prepare_install_dir(&install_dir)?;

            let request = ConfigureRequest {
                profile: &self.options.profile,
                configuration,
                shared_libs: kind.shared_libs(),
                prefix_paths: &prefix_paths,
                install_dir: &install_dir,
                extra_flags: &entry.config.extra_flags,
                source_dir: &source_dir,
            };

            for step in [BuildStep::Configure, BuildStep::Build, BuildStep::Install] {
                let status = self.run_step(step, &request)?;
                check(step, &module, configuration, status)?;
            }

            installs.insert(configuration, install_dir);
        }

        self.summary.install_paths.push(ChainEntry {
            library: entry.library.to_string(),
            version: entry.version.to_string(),
            installs: installs.clone(),
        });

        // Headers come from the last configuration installed.
        let headers_dir = self.layout.headers_dir(entry.library, entry.version);
        if let Some(last) = installs.values().last() {
            self.mirror(&last.join(&entry.config.include_output_folder), &headers_dir)?;
        }

        Ok(ProcessedVersion {
            library: entry.library.to_string(),
            version: entry.version.to_string(),
            kind,
            headers_dir,
            installs,
            prefix_paths,
        })
    }

    fn run_step(
        &self,
        step: BuildStep,
        request: &ConfigureRequest<'_>,
    ) -> Result<StepStatus, BuildError> {
        if self.options.dry_run {
            match self.toolchain.describe(step, request) {
                Some(command) => tracing::info!("Would run: {}", command),
                None => tracing::info!(
                    "Would {} {} ({})",
                    step,
                    request.install_dir.display(),
                    request.configuration
                ),
            }
            return Ok(StepStatus::Success);
        }

        let status = match step {
            BuildStep::Configure => self.toolchain.configure(request)?,
            BuildStep::Build => self
                .toolchain
                .build(request.install_dir, request.configuration)?,
            BuildStep::Install => self
                .toolchain
                .install(request.install_dir, request.configuration)?,
        };
        Ok(status)
    }

    fn prepare_install_dir(&self, install_dir: &Path) -> Result<(), BuildError> {
        if self.options.dry_run {
            tracing::debug!("Would prepare {}", install_dir.display());
            return Ok(());
        }

        if self.options.force_clean {
            tracing::info!("Cleaning {}", install_dir.display());
            remove_dir_all_force(install_dir)?;
        }
        ensure_dir(install_dir)?;
        Ok(())
    }

    fn mirror(&self, source: &Path, headers_dir: &Path) -> Result<(), BuildError> {
        tracing::info!(
            "Syncing headers {} -> {}",
            source.display(),
            headers_dir.display()
        );
        if !self.options.dry_run {
            sync_dir(source, headers_dir)?;
        }
        Ok(())
    }
}

fn check(
    step: BuildStep,
    module: &str,
    configuration: BuildConfiguration,
    status: StepStatus,
) -> Result<(), BuildError> {
    match status {
        StepStatus::Success => Ok(()),
        StepStatus::Failed { code } => Err(BuildError::StepFailed {
            step,
            module: module.to_string(),
            configuration,
            code,
        }),
    }
}

/// Run a whole build: plan the manifest, gate on the toolchain version,
/// process every library version, then write the metadata document.
///
/// Metadata is only written when every version was processed without a
/// fatal error, and never on a dry run.
pub fn build_external(
    layout: &Layout,
    manifest: &Manifest,
    toolchain: &dyn BuildToolchain,
    options: &BuildOptions,
) -> Result<RunSummary, BuildError> {
    let plan = BuildPlan::new(manifest)?;

    if manifest.min_tool_version().is_none() {
        tracing::warn!("No minimum {} version declared", toolchain.name());
    }
    ensure_version(toolchain, manifest.min_tool_version())?;

    let summary = Orchestrator::new(layout, toolchain, options).run(&plan)?;

    if !options.dry_run {
        write_metadata(&summary.metadata, &layout.metadata_path())?;
    }

    Ok(summary)
}
