//! CMake-backed [`BuildToolchain`].

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::toolchain::{
    BuildStep, BuildToolchain, ConfigureRequest, StepStatus, ToolchainError,
};
use crate::core::platform::{ArchSelection, BuildConfiguration};
use crate::util::process::{find_executable, ProcessBuilder};

/// Runs configure/build/install through the CMake command line.
#[derive(Debug, Clone)]
pub struct CMakeToolchain {
    program: PathBuf,
    name: String,
    parallel: bool,
    verbose: bool,
}

impl CMakeToolchain {
    /// Create a toolchain for the given CMake executable (name or path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cmake".to_string());

        CMakeToolchain {
            program,
            name,
            parallel: true,
            verbose: true,
        }
    }

    /// Pass `--parallel` to the build step.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Pass `--verbose` to the build step.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
    }

    /// Configure command line for a request.
    pub fn configure_command(&self, req: &ConfigureRequest<'_>) -> ProcessBuilder {
        let mut cmd = self.command().arg("-G").arg(&req.profile.generator);

        match req.profile.arch_selection() {
            ArchSelection::PlatformFlag => {
                cmd = cmd.arg("-A").arg(&req.profile.arch);
            }
            ArchSelection::OsxArchitectures => {
                cmd = cmd.arg(format!("-DCMAKE_OSX_ARCHITECTURES={}", req.profile.arch));
            }
            ArchSelection::Host => {}
        }

        cmd = cmd
            .arg(format!("-DCMAKE_BUILD_TYPE={}", req.configuration))
            .arg(format!(
                "-DBUILD_SHARED_LIBS={}",
                if req.shared_libs { "ON" } else { "OFF" }
            ));

        // CMake list separator, not a shell separator
        if !req.prefix_paths.is_empty() {
            let joined = req
                .prefix_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(";");
            cmd = cmd.arg(format!("-DCMAKE_PREFIX_PATH={}", joined));
        }

        cmd = cmd.arg(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            req.install_dir.display()
        ));

        for (key, value) in req.extra_flags {
            cmd = cmd.arg(format!("-D{}={}", key, value));
        }

        cmd.arg("-B")
            .arg(req.install_dir)
            .arg(req.source_dir)
            .cwd(req.install_dir)
    }

    /// Build command line.
    pub fn build_command(
        &self,
        install_dir: &Path,
        configuration: BuildConfiguration,
    ) -> ProcessBuilder {
        let mut cmd = self
            .command()
            .arg("--build")
            .arg(install_dir)
            .arg("--config")
            .arg(configuration.as_str());

        if self.verbose {
            cmd = cmd.arg("--verbose");
        }
        if self.parallel {
            cmd = cmd.arg("--parallel");
        }

        cmd.cwd(install_dir)
    }

    /// Install command line.
    pub fn install_command(
        &self,
        install_dir: &Path,
        configuration: BuildConfiguration,
    ) -> ProcessBuilder {
        self.command()
            .arg("--install")
            .arg(install_dir)
            .arg("--config")
            .arg(configuration.as_str())
            .cwd(install_dir)
    }

    fn run(&self, cmd: ProcessBuilder) -> Result<StepStatus> {
        tracing::info!("Command: {}", cmd.display_command());
        Ok(cmd.status()?.into())
    }
}

impl BuildToolchain for CMakeToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_version(&self) -> Result<String, ToolchainError> {
        let program = find_executable(&self.program).ok_or_else(|| ToolchainError::NotFound {
            program: self.program.display().to_string(),
        })?;

        let output = ProcessBuilder::new(&program)
            .arg("--version")
            .exec()
            .map_err(|e| ToolchainError::Query {
                program: program.display().to_string(),
                source: e.into(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(ToolchainError::UnparseableVersion {
                program: program.display().to_string(),
                output: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(stdout)
    }

    fn configure(&self, request: &ConfigureRequest<'_>) -> Result<StepStatus> {
        self.run(self.configure_command(request))
    }

    fn build(&self, install_dir: &Path, configuration: BuildConfiguration) -> Result<StepStatus> {
        self.run(self.build_command(install_dir, configuration))
    }

    fn install(&self, install_dir: &Path, configuration: BuildConfiguration) -> Result<StepStatus> {
        self.run(self.install_command(install_dir, configuration))
    }

    fn describe(&self, step: BuildStep, request: &ConfigureRequest<'_>) -> Option<String> {
        let cmd = match step {
            BuildStep::Configure => self.configure_command(request),
            BuildStep::Build => self.build_command(request.install_dir, request.configuration),
            BuildStep::Install => self.install_command(request.install_dir, request.configuration),
        };
        Some(cmd.display_command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Platform, PlatformProfile};
    use indexmap::IndexMap;

    fn request<'a>(
        profile: &'a PlatformProfile,
        prefix_paths: &'a [PathBuf],
        flags: &'a IndexMap<String, String>,
    ) -> ConfigureRequest<'a> {
        ConfigureRequest {
            profile,
            configuration: BuildConfiguration::Release,
            shared_libs: false,
            prefix_paths,
            install_dir: Path::new("/root/Installs/zlib-1.2.11/Linux/Release"),
            extra_flags: flags,
            source_dir: Path::new("/root/External/zlib/1.2.11"),
        }
    }

    #[test]
    fn test_configure_command_linux() {
        let profile = Platform::Linux.default_profile();
        let mut flags = IndexMap::new();
        flags.insert("BUILD_TESTS".to_string(), "OFF".to_string());
        flags.insert("ZLIB_COMPAT".to_string(), "ON".to_string());

        let cmd = CMakeToolchain::new("cmake").configure_command(&request(&profile, &[], &flags));

        assert_eq!(cmd.get_program(), Path::new("cmake"));
        assert_eq!(
            cmd.get_args(),
            [
                "-G",
                "Unix Makefiles",
                "-DCMAKE_BUILD_TYPE=Release",
                "-DBUILD_SHARED_LIBS=OFF",
                "-DCMAKE_INSTALL_PREFIX=/root/Installs/zlib-1.2.11/Linux/Release",
                "-DBUILD_TESTS=OFF",
                "-DZLIB_COMPAT=ON",
                "-B",
                "/root/Installs/zlib-1.2.11/Linux/Release",
                "/root/External/zlib/1.2.11",
            ]
        );
    }

    #[test]
    fn test_configure_command_prefix_paths_and_arch() {
        let profile = Platform::Win64.default_profile();
        let prefixes = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        let flags = IndexMap::new();

        let cmd = CMakeToolchain::new("cmake")
            .configure_command(&request(&profile, &prefixes, &flags));
        let args = cmd.get_args();

        assert_eq!(&args[..4], ["-G", "Visual Studio 17 2022", "-A", "x64"]);
        assert!(args.contains(&"-DCMAKE_PREFIX_PATH=/a;/b".to_string()));
    }

    #[test]
    fn test_configure_command_xcode_architectures() {
        let profile = Platform::Ios.default_profile();
        let flags = IndexMap::new();

        let cmd = CMakeToolchain::new("cmake").configure_command(&request(&profile, &[], &flags));
        assert!(cmd
            .get_args()
            .contains(&"-DCMAKE_OSX_ARCHITECTURES=arm64".to_string()));
        assert!(!cmd.get_args().contains(&"-A".to_string()));
    }

    #[test]
    fn test_build_and_install_commands() {
        let tc = CMakeToolchain::new("cmake");
        let dir = Path::new("/i");

        assert_eq!(
            tc.build_command(dir, BuildConfiguration::Debug).get_args(),
            ["--build", "/i", "--config", "Debug", "--verbose", "--parallel"]
        );
        assert_eq!(
            tc.clone()
                .parallel(false)
                .verbose(false)
                .build_command(dir, BuildConfiguration::Debug)
                .get_args(),
            ["--build", "/i", "--config", "Debug"]
        );
        assert_eq!(
            tc.install_command(dir, BuildConfiguration::Release).get_args(),
            ["--install", "/i", "--config", "Release"]
        );
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let tc = CMakeToolchain::new("/nonexistent/bin/cmake-4821");
        assert!(matches!(
            tc.query_version(),
            Err(ToolchainError::NotFound { .. })
        ));
    }

    #[test]
    fn test_describe_matches_commands_without_running() {
        let tc = CMakeToolchain::new("/nonexistent/bin/cmake-4821");
        let profile = Platform::Linux.default_profile();
        let flags = IndexMap::new();
        let req = request(&profile, &[], &flags);

        let configure = tc.describe(BuildStep::Configure, &req).unwrap();
        assert!(configure.starts_with("/nonexistent/bin/cmake-4821 -G"));
        assert!(configure.contains("-DCMAKE_BUILD_TYPE=Release"));

        assert_eq!(
            tc.describe(BuildStep::Install, &req).unwrap(),
            tc.install_command(req.install_dir, req.configuration)
                .display_command()
        );
    }
}
