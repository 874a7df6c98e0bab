//! `BuildConfig.yaml` manifest parsing and schema.
//!
//! The manifest maps library names to versions, and each version to the
//! options used to build it. Declaration order is significant: it is the
//! default build order, so every mapping here is an `IndexMap`.
//!
//! ```yaml
//! general:
//!   cmake_version: "3.20.0"
//!
//! zlib:
//!   "1.2.11":
//!     type: static
//!     cmake_flags:
//!       BUILD_TESTS: "OFF"
//!
//! glm:
//!   "0.9.9":
//!     public_definitions: [GLM_FORCE_RADIANS]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use thiserror::Error;

/// Default manifest file name, looked up at the build root.
pub const MANIFEST_FILE_NAME: &str = "BuildConfig.yaml";

/// Reserved top-level key holding global settings.
pub const GENERAL_SECTION: &str = "general";

/// Folder name used when a version doesn't name its include folders.
pub const DEFAULT_INCLUDE_FOLDER: &str = "include";

/// Errors that make a manifest unusable as a whole.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("manifest root must be a mapping of library names")]
    NotAMapping,

    #[error("manifest keys must be strings, found `{0}`")]
    InvalidKey(String),

    #[error("library `{library}` must map version strings to build options")]
    InvalidLibrary { library: String },

    #[error("invalid `general` section: {source}")]
    InvalidGeneral {
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "`{library}` declares version `{version}` more than once \
         (quote version keys to keep them exact)"
    )]
    DuplicateVersion { library: String, version: String },

    #[error("invalid options for `{library}` version `{version}`: {source}")]
    InvalidVersionConfig {
        library: String,
        version: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Problems that only disqualify a single library version.
///
/// These never abort a run; the offending version is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("version needs to be specified for `{library}`")]
    EmptyVersion { library: String },

    #[error(
        "version type `{kind}` is not valid for `{library}-{version}` \
         (expected header, static or dynamic)"
    )]
    UnknownKind {
        library: String,
        version: String,
        kind: String,
    },

    #[error("could not find sources for `{library}/{version}` at {}", path.display())]
    MissingSource {
        library: String,
        version: String,
        path: PathBuf,
    },
}

/// How a library version is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// Headers only; nothing to build.
    #[default]
    Header,
    /// Built with `BUILD_SHARED_LIBS=OFF`.
    Static,
    /// Built with `BUILD_SHARED_LIBS=ON`.
    Dynamic,
}

impl LibraryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKind::Header => "header",
            LibraryKind::Static => "static",
            LibraryKind::Dynamic => "dynamic",
        }
    }

    pub fn is_buildable(&self) -> bool {
        !matches!(self, LibraryKind::Header)
    }

    pub fn shared_libs(&self) -> bool {
        matches!(self, LibraryKind::Dynamic)
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibraryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "header" => Ok(LibraryKind::Header),
            "static" => Ok(LibraryKind::Static),
            "dynamic" => Ok(LibraryKind::Dynamic),
            _ => Err(s.to_string()),
        }
    }
}

/// Global settings from the reserved `general` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralSettings {
    /// Minimum CMake version required on the build machine.
    #[serde(
        default,
        alias = "cmake_version",
        alias = "minToolVersion",
        deserialize_with = "deserialize_opt_scalar"
    )]
    pub min_tool_version: Option<String>,
}

/// Build options for one library version.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionConfig {
    /// Raw kind string; checked by [`VersionConfig::kind`] so that a bad
    /// value skips the version instead of rejecting the manifest.
    #[serde(
        default,
        rename = "kind",
        alias = "type",
        deserialize_with = "deserialize_opt_scalar"
    )]
    pub raw_kind: Option<String>,

    /// Include folder inside the source tree (header-only libraries).
    #[serde(default = "default_include_folder", alias = "includeSourceFolder")]
    pub include_source_folder: PathBuf,

    /// Include folder inside the install tree (built libraries).
    #[serde(default = "default_include_folder", alias = "includeOutputFolder")]
    pub include_output_folder: PathBuf,

    /// Definitions consumers must compile with.
    #[serde(default, alias = "publicDefinitions")]
    pub public_definitions: Vec<String>,

    /// Extra `-D` definitions forwarded to CMake, in declaration order.
    #[serde(
        default,
        alias = "extraFlags",
        alias = "cmake_flags",
        deserialize_with = "deserialize_flags"
    )]
    pub extra_flags: IndexMap<String, String>,

    /// Libraries that must be built before this version.
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        VersionConfig {
            raw_kind: None,
            include_source_folder: default_include_folder(),
            include_output_folder: default_include_folder(),
            public_definitions: Vec::new(),
            extra_flags: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }
}

impl VersionConfig {
    /// Resolve the library kind, defaulting to header-only.
    pub fn kind(&self, library: &str, version: &str) -> Result<LibraryKind, ValidationError> {
        match self.raw_kind.as_deref() {
            None => Ok(LibraryKind::default()),
            Some(raw) => raw.parse().map_err(|kind| ValidationError::UnknownKind {
                library: library.to_string(),
                version: version.to_string(),
                kind,
            }),
        }
    }
}

fn default_include_folder() -> PathBuf {
    PathBuf::from(DEFAULT_INCLUDE_FOLDER)
}

/// Render a YAML scalar the way it was written.
///
/// Booleans become CMake's `ON`/`OFF`; nulls and collections have no
/// scalar form.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("ON".to_string()),
        Value::Bool(false) => Some("OFF".to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn deserialize_opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => scalar_to_string(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a scalar value")),
    }
}

fn deserialize_flags<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut flags = IndexMap::new();

    for (key, value) in raw.unwrap_or_default() {
        let value = scalar_to_string(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("flag `{}` must have a scalar value", key))
        })?;
        flags.insert(key, value);
    }

    Ok(flags)
}

/// A parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    general: GeneralSettings,
    libraries: IndexMap<String, IndexMap<String, VersionConfig>>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest: Manifest = contents.parse()?;
        tracing::debug!(
            "Loaded manifest {} ({} libraries)",
            path.display(),
            manifest.libraries.len()
        );
        Ok(manifest)
    }

    /// Minimum toolchain version, if the manifest declares one.
    pub fn min_tool_version(&self) -> Option<&str> {
        self.general.min_tool_version.as_deref()
    }

    /// Libraries in declaration order.
    pub fn libraries(&self) -> impl Iterator<Item = (&str, &IndexMap<String, VersionConfig>)> {
        self.libraries.iter().map(|(name, versions)| (name.as_str(), versions))
    }

    /// Look up the versions declared for a library.
    pub fn library(&self, name: &str) -> Option<&IndexMap<String, VersionConfig>> {
        self.libraries.get(name)
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let root: Value = serde_yaml::from_str(s)?;

        let root = match root {
            Value::Mapping(map) => map,
            Value::Null => return Ok(Manifest::default()),
            _ => return Err(ManifestError::NotAMapping),
        };

        let mut manifest = Manifest::default();

        for (key, value) in root {
            let library = match key {
                Value::String(name) => name,
                other => {
                    return Err(ManifestError::InvalidKey(
                        scalar_to_string(&other).unwrap_or_else(|| format!("{:?}", other)),
                    ))
                }
            };

            if library == GENERAL_SECTION {
                if !value.is_null() {
                    manifest.general = serde_yaml::from_value(value)
                        .map_err(|source| ManifestError::InvalidGeneral { source })?;
                }
                continue;
            }

            let versions = match value {
                Value::Mapping(map) => map,
                Value::Null => Default::default(),
                _ => return Err(ManifestError::InvalidLibrary { library }),
            };

            let mut parsed = IndexMap::new();
            for (version_key, options) in versions {
                // Unquoted versions such as `1.2` arrive as numbers; a bare
                // `~` or empty key becomes an empty version and is skipped
                // later during validation.
                let version = scalar_to_string(&version_key).unwrap_or_default();
                if matches!(version_key, Value::Number(_) | Value::Bool(_)) {
                    tracing::warn!(
                        "version `{}` of `{}` is not quoted and was read as a number; \
                         quote it to keep it exact",
                        version,
                        library
                    );
                }
                if parsed.contains_key(&version) {
                    return Err(ManifestError::DuplicateVersion { library, version });
                }

                let config = if options.is_null() {
                    VersionConfig::default()
                } else {
                    serde_yaml::from_value(options).map_err(|source| {
                        ManifestError::InvalidVersionConfig {
                            library: library.clone(),
                            version: version.clone(),
                            source,
                        }
                    })?
                };

                parsed.insert(version, config);
            }

            manifest.libraries.insert(library, parsed);
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let manifest: Manifest = r#"
general:
  cmake_version: "3.20.0"
zlib:
  "1.2.11":
    type: static
libpng:
  "1.6.37":
    type: dynamic
  "1.6.40":
    type: dynamic
glm:
  "0.9.9": {}
"#
        .parse()
        .unwrap();

        let names: Vec<_> = manifest.libraries().map(|(name, _)| name).collect();
        assert_eq!(names, ["zlib", "libpng", "glm"]);

        let png: Vec<_> = manifest.library("libpng").unwrap().keys().cloned().collect();
        assert_eq!(png, ["1.6.37", "1.6.40"]);

        assert_eq!(manifest.min_tool_version(), Some("3.20.0"));
    }

    #[test]
    fn test_camel_case_aliases() {
        let manifest: Manifest = r#"
general:
  minToolVersion: "3.20.0"
zlib:
  "1.2.11":
    kind: Static
    includeOutputFolder: inc
    publicDefinitions: [ZLIB_CONST]
    extraFlags:
      BUILD_TESTS: "OFF"
"#
        .parse()
        .unwrap();

        let config = &manifest.library("zlib").unwrap()["1.2.11"];
        assert_eq!(config.kind("zlib", "1.2.11").unwrap(), LibraryKind::Static);
        assert_eq!(config.include_output_folder, PathBuf::from("inc"));
        assert_eq!(config.include_source_folder, PathBuf::from("include"));
        assert_eq!(config.public_definitions, ["ZLIB_CONST"]);
        assert_eq!(config.extra_flags["BUILD_TESTS"], "OFF");
    }

    #[test]
    fn test_defaults_to_header_only() {
        let manifest: Manifest = "glm:\n  \"0.9.9\":\n".parse().unwrap();
        let config = &manifest.library("glm").unwrap()["0.9.9"];

        assert_eq!(config.kind("glm", "0.9.9").unwrap(), LibraryKind::Header);
        assert!(config.public_definitions.is_empty());
        assert!(manifest.min_tool_version().is_none());
    }

    #[test]
    fn test_unknown_kind_is_a_validation_error() {
        let manifest: Manifest = "foo:\n  \"1.0\":\n    type: shared\n".parse().unwrap();
        let config = &manifest.library("foo").unwrap()["1.0"];

        assert_eq!(
            config.kind("foo", "1.0"),
            Err(ValidationError::UnknownKind {
                library: "foo".into(),
                version: "1.0".into(),
                kind: "shared".into(),
            })
        );
    }

    #[test]
    fn test_numeric_versions_and_flags_are_stringified() {
        let manifest: Manifest = r#"
fmt:
  10.1:
    type: static
    cmake_flags:
      CMAKE_CXX_STANDARD: 17
      FMT_TEST: false
"#
        .parse()
        .unwrap();

        let versions = manifest.library("fmt").unwrap();
        let config = &versions["10.1"];
        let flags: Vec<_> = config
            .extra_flags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        assert_eq!(flags, ["CMAKE_CXX_STANDARD=17", "FMT_TEST=OFF"]);
    }

    #[test]
    fn test_unquoted_version_colliding_with_quoted_one_is_rejected() {
        // `1.10` reads as the float 1.1
        let err = "fmt:\n  1.10: {type: static}\n  \"1.1\": {type: static}\n"
            .parse::<Manifest>()
            .unwrap_err();

        match err {
            ManifestError::DuplicateVersion { library, version } => {
                assert_eq!(library, "fmt");
                assert_eq!(version, "1.1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_version_key_is_kept_for_validation() {
        let manifest: Manifest = "foo:\n  ~:\n    type: static\n".parse().unwrap();
        assert!(manifest.library("foo").unwrap().contains_key(""));
    }

    #[test]
    fn test_non_mapping_root_is_rejected() {
        assert!(matches!(
            "- a\n- b\n".parse::<Manifest>(),
            Err(ManifestError::NotAMapping)
        ));
    }

    #[test]
    fn test_bad_option_type_is_rejected() {
        let err = "foo:\n  \"1.0\":\n    public_definitions: 3\n"
            .parse::<Manifest>()
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidVersionConfig { .. }));
    }
}
