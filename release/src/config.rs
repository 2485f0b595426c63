//! Static release configuration.
//!
//! The release is described by a `release.toml` file: product naming, the
//! version and revision being released, how to invoke the external build, the
//! build configurations to produce, and where to publish. When no file is
//! present the built-in defaults describe the LevelDB Windows release.

use crate::version::{ReleaseNote, ReleaseVersion};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Name of the configuration file looked up in the workspace directory.
pub const CONFIG_FILE_NAME: &str = "release.toml";

const DEFAULT_PRODUCT: &str = "LevelDB";
const DEFAULT_NAMESPACE: &str = "software/leveldb/rel";
const DEFAULT_VERSION: &str = "1.2";
const DEFAULT_REVISION: u32 = 1;
const DEFAULT_DEBUG_SYMBOL_EXTENSION: &str = "pdb";
const DEFAULT_PACKAGE_DIR: &str = "dist";
const DEFAULT_TOKEN_ENV: &str = "RELEASE_STORE_TOKEN";

const DEFAULT_DLL: &str = "libleveldb.dll";
const DEFAULT_BENCHMARK: &str = "db_bench.exe";
const DEFAULT_TESTS: &[&str] = &[
    "corruption_test.exe",
    "arena_test.exe",
    "coding_test.exe",
    "env_test.exe",
    "memenv_test.exe",
    "version_edit_test.exe",
    "c_test.exe",
    "skiplist_test.exe",
    "version_set_test.exe",
    "cache_test.exe",
    "crc32c_test.exe",
    "dbformat_test.exe",
    "log_test.exe",
    "write_batch_test.exe",
    "table_test.exe",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// The path that was requested.
        path: Utf8PathBuf,
    },

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The workspace directory cannot be resolved to an absolute path.
    #[error("cannot resolve workspace {path}: {source}")]
    Workspace {
        /// The workspace as given.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration in {origin}: {reason}")]
    Parse {
        /// Where the configuration came from.
        origin: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The version is not of the form `major.minor`.
    #[error("invalid version {value:?}: expected <major>.<minor>")]
    InvalidVersion {
        /// The rejected value.
        value: String,
    },

    /// A semantic rule was violated.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the violated rule.
        reason: String,
    },
}

/// Whether a configuration takes part in verification and testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rollout {
    /// Build, verify, and (when requested) test.
    #[default]
    Full,
    /// Declared but not yet wired in: build only.
    BuildOnly,
}

impl Rollout {
    /// Returns `true` when verification and testing apply.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// One target configuration of the external build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfiguration {
    /// Human-readable name, e.g. `32-bit`.
    pub name: String,
    /// Argument passed to the build entry point, e.g. `Just32rel`.
    pub build_argument: String,
    /// Directory the build writes its outputs to, relative to the workspace.
    pub output_dir: Utf8PathBuf,
    /// Rollout state for this configuration.
    #[serde(default)]
    pub rollout: Rollout,
    /// Test executables in the order they must run.
    pub test_executables: Vec<String>,
    /// Benchmark executable run after all tests pass.
    pub benchmark_executable: String,
    /// Files the build must produce, each with a debug-symbol sibling, in
    /// verification order. Test executables are only verified when listed.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl BuildConfiguration {
    /// Every file verification checks for, in declared order.
    #[must_use]
    pub fn expected_artifacts(&self) -> Vec<&str> {
        self.artifacts.iter().map(String::as_str).collect()
    }

    /// Every file the build writes: tests, artifacts and the benchmark,
    /// without duplicates.
    #[must_use]
    pub fn build_outputs(&self) -> Vec<&str> {
        let mut outputs: Vec<&str> = Vec::new();
        let all = self
            .test_executables
            .iter()
            .chain(self.artifacts.iter())
            .map(String::as_str)
            .chain(std::iter::once(self.benchmark_executable.as_str()));
        for name in all {
            if !outputs.contains(&name) {
                outputs.push(name);
            }
        }
        outputs
    }

    fn leveldb(name: &str, build_argument: &str, output_dir: &str, rollout: Rollout) -> Self {
        Self {
            name: name.to_owned(),
            build_argument: build_argument.to_owned(),
            output_dir: Utf8PathBuf::from(output_dir),
            rollout,
            test_executables: DEFAULT_TESTS.iter().map(|&t| t.to_owned()).collect(),
            benchmark_executable: DEFAULT_BENCHMARK.to_owned(),
            artifacts: DEFAULT_TESTS
                .iter()
                .chain([DEFAULT_DLL, DEFAULT_BENCHMARK].iter())
                .map(|&a| a.to_owned())
                .collect(),
        }
    }
}

/// The `[version]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionSection {
    /// Upstream major/minor version.
    pub major_minor: String,
    /// Local revision number.
    pub revision: u32,
    /// Release notes, newest last.
    #[serde(default)]
    pub notes: Vec<ReleaseNote>,
}

impl Default for VersionSection {
    fn default() -> Self {
        Self {
            major_minor: DEFAULT_VERSION.to_owned(),
            revision: DEFAULT_REVISION,
            notes: vec![ReleaseNote {
                title: "1.2 rev 1".to_owned(),
                summary: "first release".to_owned(),
                source_reference: concat!(
                    "based on http://code.google.com/p/leveldb/source/detail",
                    "?r=299ccedfeca1fb3497978c288e76008a5c08e899"
                )
                .to_owned(),
            }],
        }
    }
}

/// The `[build]` table: how to invoke the external build entry point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    /// Program to run; a relative path is taken from the workspace.
    pub program: String,
    /// Arguments placed before the configuration's build argument.
    pub args: Vec<String>,
    /// Extension of the debug-symbol file next to each artifact.
    pub debug_symbol_extension: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            program: "cmd.exe".to_owned(),
            args: vec!["/c".to_owned(), "build.bat".to_owned()],
            debug_symbol_extension: DEFAULT_DEBUG_SYMBOL_EXTENSION.to_owned(),
        }
    }
}

/// The `[package]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    /// Where the archive is written, relative to the workspace.
    pub output_dir: Utf8PathBuf,
    /// File extensions that qualify for inclusion in the archive.
    pub extensions: Vec<String>,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from(DEFAULT_PACKAGE_DIR),
            extensions: ["dll", "exe", "lib", "pdb"]
                .iter()
                .map(|&e| e.to_owned())
                .collect(),
        }
    }
}

/// The `[store]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Base URL of the bucket, e.g. `https://bucket.s3.amazonaws.com`.
    pub endpoint: Option<String>,
    /// Environment variable holding a bearer token for uploads.
    pub token_env: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: DEFAULT_TOKEN_ENV.to_owned(),
        }
    }
}

/// Complete release configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Product name used in archive names.
    pub product: String,
    /// Key prefix in the object store.
    pub namespace: String,
    /// Version being released.
    pub version: VersionSection,
    /// Build invocation settings.
    pub build: BuildSection,
    /// Packaging settings.
    pub package: PackageSection,
    /// Object store settings.
    pub store: StoreSection,
    /// Build configurations in the order they are processed.
    #[serde(rename = "configuration")]
    pub configurations: Vec<BuildConfiguration>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_owned(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            version: VersionSection::default(),
            build: BuildSection::default(),
            package: PackageSection::default(),
            store: StoreSection::default(),
            configurations: vec![
                BuildConfiguration::leveldb("32-bit", "Just32rel", "rel", Rollout::Full),
                BuildConfiguration::leveldb("64-bit", "Just64rel", "rel64bit", Rollout::BuildOnly),
            ],
        }
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from the given file.
    File(Utf8PathBuf),
    /// No file found; built-in defaults in use.
    BuiltIn,
}

impl ReleaseConfig {
    /// Parse and validate configuration from TOML text.
    ///
    /// `origin` names the source in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input and the validation
    /// errors of [`ReleaseConfig::validate`].
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            origin: origin.to_owned(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist, or any
    /// read, parse, or validation error.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_owned(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents, path.as_str())
    }

    /// Resolve the active configuration.
    ///
    /// An explicit path must exist. Otherwise `release.toml` in the workspace
    /// is used when present, falling back to the built-in defaults.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ReleaseConfig::load`].
    pub fn resolve(
        explicit: Option<&Utf8Path>,
        workspace: &Utf8Path,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigSource::File(path.to_owned())));
        }

        let candidate = workspace.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            let config = Self::load(&candidate)?;
            return Ok((config, ConfigSource::File(candidate)));
        }

        log::debug!("no {CONFIG_FILE_NAME} in {workspace}; using built-in defaults");
        Ok((Self::default(), ConfigSource::BuiltIn))
    }

    /// Check semantic rules that the schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::InvalidVersion`]
    /// describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("product", &self.product)?;
        require_non_empty("namespace", self.namespace.trim_matches('/'))?;
        require_non_empty("build.program", &self.build.program)?;
        require_non_empty(
            "build.debug_symbol_extension",
            &self.build.debug_symbol_extension,
        )?;
        self.release_version()?;

        if self.configurations.is_empty() {
            return Err(invalid("at least one [[configuration]] is required"));
        }

        let mut seen = HashSet::new();
        for configuration in &self.configurations {
            if !seen.insert(configuration.name.as_str()) {
                return Err(invalid(format!(
                    "duplicate configuration name {:?}",
                    configuration.name
                )));
            }
            validate_configuration(configuration)?;
        }
        Ok(())
    }

    /// Build the immutable release identity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVersion`] for a malformed version.
    pub fn release_version(&self) -> Result<ReleaseVersion, ConfigError> {
        ReleaseVersion::new(
            self.version.major_minor.as_str(),
            self.version.revision,
            self.version.notes.clone(),
        )
    }

    /// The configuration whose outputs are packaged: the first enabled one.
    #[must_use]
    pub fn primary_configuration(&self) -> Option<&BuildConfiguration> {
        self.configurations.iter().find(|c| c.rollout.is_enabled())
    }
}

fn validate_configuration(configuration: &BuildConfiguration) -> Result<(), ConfigError> {
    let name = &configuration.name;
    require_non_empty("configuration.name", name)?;
    require_non_empty(
        &format!("build_argument of {name}"),
        &configuration.build_argument,
    )?;
    require_non_empty(
        &format!("benchmark_executable of {name}"),
        &configuration.benchmark_executable,
    )?;
    if configuration
        .build_outputs()
        .iter()
        .any(|artifact| artifact.trim().is_empty())
    {
        return Err(invalid(format!("configuration {name} lists an empty filename")));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}
