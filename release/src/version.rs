//! Release identity: version, revision, and release notes.
//!
//! A [`ReleaseVersion`] is constructed once from static configuration and
//! passed into the pipeline. It never changes during a run.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One human-readable entry in the release notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseNote {
    /// Short heading, e.g. `1.2 rev 1`.
    pub title: String,
    /// One-line description of the release.
    pub summary: String,
    /// Reference to the upstream source the release is based on.
    #[serde(rename = "source")]
    pub source_reference: String,
}

/// The version reported by the product together with the local revision.
///
/// The revision increments whenever the produced artifact changes, even when
/// the upstream major/minor version does not.
///
/// # Examples
///
/// ```
/// use leveldb_release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::new("1.2", 1, Vec::new()).expect("valid version");
/// assert_eq!(version.to_string(), "1.2 rev 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    major_minor: String,
    revision: u32,
    notes: Vec<ReleaseNote>,
}

impl ReleaseVersion {
    /// Create a release version after validating the major/minor string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVersion`] unless `major_minor` is two
    /// dot-separated decimal numbers.
    pub fn new(
        major_minor: impl Into<String>,
        revision: u32,
        notes: Vec<ReleaseNote>,
    ) -> Result<Self, ConfigError> {
        let major_minor = major_minor.into();
        if !is_major_minor(&major_minor) {
            return Err(ConfigError::InvalidVersion { value: major_minor });
        }
        Ok(Self {
            major_minor,
            revision,
            notes,
        })
    }

    /// The upstream major/minor version, e.g. `1.2`.
    #[must_use]
    pub fn major_minor(&self) -> &str {
        &self.major_minor
    }

    /// The local revision number.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Release notes in declared order.
    #[must_use]
    pub fn notes(&self) -> &[ReleaseNote] {
        &self.notes
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rev {}", self.major_minor, self.revision)
    }
}

fn is_major_minor(value: &str) -> bool {
    let mut parts = value.split('.');
    let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    [major, minor]
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
