//! Build planning and toolchain invocation.
//!
//! - [`plan`] orders manifest entries
//! - [`toolchain`] defines the toolchain seam and the version gate
//! - [`cmake`] implements the seam on top of the CMake command line

pub mod cmake;
pub mod plan;
pub mod toolchain;

pub use cmake::CMakeToolchain;
pub use plan::{BuildPlan, PlanEntry, PlanError};
pub use toolchain::{
    ensure_version, BuildStep, BuildToolchain, ConfigureRequest, StepStatus, ToolchainError,
};
