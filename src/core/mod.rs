//! Core data types: the manifest, platforms and the build-root layout.

pub mod layout;
pub mod manifest;
pub mod platform;

pub use layout::{module_name, Layout};
pub use manifest::{
    GeneralSettings, LibraryKind, Manifest, ManifestError, ValidationError, VersionConfig,
};
pub use platform::{ArchSelection, BuildConfiguration, Platform, PlatformProfile};
