//! High-level operations.
//!
//! This module contains the implementation of extbuild commands.

pub mod build_external;
pub mod locate;
pub mod metadata;

pub use build_external::{
    build_external, BuildError, BuildOptions, ChainEntry, InstallPathChain, Orchestrator,
    ProcessedVersion, RunSummary,
};
pub use locate::{locate_module, ModuleDescriptor};
pub use metadata::{read_metadata, write_metadata, LibraryMetadata, VersionMetadata};
