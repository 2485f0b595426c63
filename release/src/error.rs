//! Error types for the release orchestrator.
//!
//! Every variant is terminal for the run: nothing is retried automatically.
//! [`ReleaseError::kind`] groups variants into the failure taxonomy that the
//! operator sees, and [`ReleaseError::exit_code`] maps that onto the process
//! exit status.

use crate::artefact::packaging_error::PackagingError;
use crate::config::ConfigError;
use crate::store::StoreError;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Errors that abort a release run.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Static release configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Publishing was requested but no object store is configured.
    #[error("publishing requested but no object store is configured; set [store] endpoint or pass --store-dir")]
    MissingStore,

    /// The external build returned a failing exit status.
    #[error("build failed for {configuration}: {reason}")]
    BuildFailed {
        /// Name of the build configuration.
        configuration: String,
        /// Diagnostic output produced by the build tool.
        reason: String,
    },

    /// The external build tool could not be started.
    #[error("failed to launch build for {configuration}: {source}")]
    BuildLaunch {
        /// Name of the build configuration.
        configuration: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An expected artifact or its debug-symbol sibling is missing.
    #[error("expected build output is missing: {path}")]
    ArtifactMissing {
        /// The exact path that was not found.
        path: Utf8PathBuf,
    },

    /// A test executable exited unsuccessfully.
    #[error("test {position}/{total} failed ({status}): {path}")]
    TestFailed {
        /// One-based position of the failing test.
        position: usize,
        /// Number of tests declared for the configuration.
        total: usize,
        /// Path of the failing executable.
        path: Utf8PathBuf,
        /// Exit status description.
        status: ExitDescription,
        /// Captured stdout and stderr.
        output: String,
    },

    /// A test executable could not be started.
    #[error("failed to launch test {path}: {source}")]
    TestLaunch {
        /// Path of the executable.
        path: Utf8PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The release archive could not be produced.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// An object already exists at the publish key.
    #[error("{key} is already published; bump the revision to publish again")]
    PublishConflict {
        /// The remote key that already exists.
        key: String,
    },

    /// Talking to the object store failed.
    #[error("transfer failed for {key}: {source}")]
    Transfer {
        /// The remote key being checked or written.
        key: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },
}

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDescription {
    /// The process exited with the given code.
    Code(i32),
    /// The process was terminated without an exit code (e.g. by a signal).
    Terminated,
}

impl From<Option<i32>> for ExitDescription {
    fn from(code: Option<i32>) -> Self {
        code.map_or(Self::Terminated, Self::Code)
    }
}

impl fmt::Display for ExitDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Terminated => write!(f, "terminated without exit code"),
        }
    }
}

/// Failure categories reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad command-line usage or static configuration.
    Configuration,
    /// The external build failed.
    Build,
    /// A required build output is missing.
    Verification,
    /// A test executable failed or could not run.
    Test,
    /// The archive could not be produced.
    Packaging,
    /// The release key already exists remotely.
    PublishConflict,
    /// The object store could not be reached or rejected a write.
    Transfer,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration error",
            Self::Build => "build failure",
            Self::Verification => "verification failure",
            Self::Test => "test failure",
            Self::Packaging => "packaging failure",
            Self::PublishConflict => "publish conflict",
            Self::Transfer => "transfer error",
        };
        f.write_str(label)
    }
}

impl ReleaseError {
    /// Classify the error into its operator-facing failure category.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::MissingStore => FailureKind::Configuration,
            Self::BuildFailed { .. } | Self::BuildLaunch { .. } => FailureKind::Build,
            Self::ArtifactMissing { .. } => FailureKind::Verification,
            Self::TestFailed { .. } | Self::TestLaunch { .. } => FailureKind::Test,
            Self::Packaging(_) => FailureKind::Packaging,
            Self::PublishConflict { .. } => FailureKind::PublishConflict,
            Self::Transfer { .. } => FailureKind::Transfer,
        }
    }

    /// Process exit status for this error.
    ///
    /// Configuration problems exit with 2, matching clap's usage errors; every
    /// other failure exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            FailureKind::Configuration => 2,
            _ => 1,
        }
    }
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn publish_conflict_names_key_and_suggests_bump() {
        let err = ReleaseError::PublishConflict {
            key: "software/leveldb/rel/LevelDB-1.2-rev-1.zip".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("LevelDB-1.2-rev-1.zip"));
        assert!(msg.contains("bump the revision"));
    }

    #[test]
    fn artifact_missing_names_exact_path() {
        let err = ReleaseError::ArtifactMissing {
            path: Utf8PathBuf::from("rel/libleveldb.pdb"),
        };
        assert_eq!(
            err.to_string(),
            "expected build output is missing: rel/libleveldb.pdb"
        );
    }

    #[test]
    fn test_failure_reports_position() {
        let err = ReleaseError::TestFailed {
            position: 3,
            total: 5,
            path: Utf8PathBuf::from("rel/coding_test.exe"),
            status: ExitDescription::Code(1),
            output: String::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3/5"));
        assert!(msg.contains("exit code 1"));
    }

    #[rstest]
    #[case::config(
        ReleaseError::Config(ConfigError::Invalid { reason: "no configurations".to_owned() }),
        FailureKind::Configuration,
        2
    )]
    #[case::missing_store(ReleaseError::MissingStore, FailureKind::Configuration, 2)]
    #[case::build(
        ReleaseError::BuildFailed { configuration: "32-bit".to_owned(), reason: "link".to_owned() },
        FailureKind::Build,
        1
    )]
    #[case::verification(
        ReleaseError::ArtifactMissing { path: Utf8PathBuf::from("rel/a.exe") },
        FailureKind::Verification,
        1
    )]
    #[case::test_launch(
        ReleaseError::TestLaunch {
            path: Utf8PathBuf::from("rel/a.exe"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        },
        FailureKind::Test,
        1
    )]
    #[case::conflict(ReleaseError::PublishConflict { key: "k".to_owned() }, FailureKind::PublishConflict, 1)]
    fn kind_and_exit_code(
        #[case] err: ReleaseError,
        #[case] kind: FailureKind,
        #[case] exit_code: i32,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.exit_code(), exit_code);
    }

    #[test]
    fn transfer_preserves_source() {
        let err = ReleaseError::Transfer {
            key: "k".to_owned(),
            source: StoreError::Status {
                url: "https://store.test/k".to_owned(),
                status: 503,
            },
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.kind(), FailureKind::Transfer);
    }

    #[test]
    fn exit_description_from_missing_code() {
        assert_eq!(ExitDescription::from(None), ExitDescription::Terminated);
        assert_eq!(ExitDescription::from(Some(3)), ExitDescription::Code(3));
    }
}
