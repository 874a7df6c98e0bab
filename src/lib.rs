//! extbuild - builds vendored third-party C/C++ libraries with CMake
//!
//! This crate provides the library side of extbuild: the build manifest,
//! build planning, toolchain invocation, header syncing and the metadata
//! document consumed by downstream modules.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for extbuild unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording toolchain and build-root
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{Layout, Manifest, Platform};
pub use ops::{build_external, BuildOptions, RunSummary};
