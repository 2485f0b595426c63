//! Archive naming and publish key policy.
//!
//! Archives are named `<product>-<major.minor>-rev-<revision>.zip` and are
//! published under `<namespace>/<archive name>`. Both are pure functions of
//! their inputs so two runs for the same release always compute the same key.

use crate::version::ReleaseVersion;
use std::fmt;

/// The fixed file extension for release archives.
const ARCHIVE_EXTENSION: &str = ".zip";

/// Suffix of the release-notes payload published next to the archive.
const NOTES_SUFFIX: &str = "-notes.json";

/// A deterministic release archive filename.
///
/// # Examples
///
/// ```
/// use leveldb_release::artefact::naming::ArchiveName;
/// use leveldb_release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::new("1.2", 1, Vec::new()).expect("valid version");
/// let name = ArchiveName::new("LevelDB", &version);
/// assert_eq!(name.to_string(), "LevelDB-1.2-rev-1.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    product: String,
    major_minor: String,
    revision: u32,
}

impl ArchiveName {
    /// Create the archive name for `product` at `version`.
    #[must_use]
    pub fn new(product: &str, version: &ReleaseVersion) -> Self {
        Self {
            product: product.to_owned(),
            major_minor: version.major_minor().to_owned(),
            revision: version.revision(),
        }
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }

    /// The filename without its extension, e.g. `LevelDB-1.2-rev-1`.
    #[must_use]
    pub fn stem(&self) -> String {
        format!("{}-{}-rev-{}", self.product, self.major_minor, self.revision)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ARCHIVE_EXTENSION}", self.stem())
    }
}

/// The remote location of one immutable release.
///
/// # Examples
///
/// ```
/// use leveldb_release::artefact::naming::PublishTarget;
/// use leveldb_release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::new("1.2", 1, Vec::new()).expect("valid version");
/// let target = PublishTarget::new("software/leveldb/rel", "LevelDB", &version);
/// assert_eq!(target.key(), "software/leveldb/rel/LevelDB-1.2-rev-1.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    namespace: String,
    archive: ArchiveName,
}

impl PublishTarget {
    /// Compute the publish target for `product` at `version` under `namespace`.
    ///
    /// Leading and trailing slashes on the namespace are ignored.
    #[must_use]
    pub fn new(namespace: &str, product: &str, version: &ReleaseVersion) -> Self {
        Self {
            namespace: namespace.trim_matches('/').to_owned(),
            archive: ArchiveName::new(product, version),
        }
    }

    /// The archive filename component.
    #[must_use]
    pub fn archive(&self) -> &ArchiveName {
        &self.archive
    }

    /// The object key of the release archive.
    #[must_use]
    pub fn key(&self) -> String {
        self.join(&self.archive.filename())
    }

    /// The object key of the release-notes payload.
    #[must_use]
    pub fn notes_key(&self) -> String {
        self.join(&format!("{}{NOTES_SUFFIX}", self.archive.stem()))
    }

    fn join(&self, leaf: &str) -> String {
        if self.namespace.is_empty() {
            leaf.to_owned()
        } else {
            format!("{}/{leaf}", self.namespace)
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
