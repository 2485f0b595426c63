//! Error types for release packaging.
//!
//! Covers a missing or empty source directory, I/O and zip failures while
//! writing the archive, and preparing the archive and notes for upload.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from release packaging.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// The directory to package does not exist.
    #[error("package source directory does not exist: {path}")]
    SourceMissing {
        /// The missing directory.
        path: Utf8PathBuf,
    },

    /// The source directory holds no files with a packaged extension.
    #[error("no files to package in {path} (looked for: {extensions})")]
    NoQualifyingFiles {
        /// The directory that was scanned.
        path: Utf8PathBuf,
        /// Comma-separated list of qualifying extensions.
        extensions: String,
    },

    /// An I/O operation failed (reading sources, writing the archive).
    #[error("I/O error during packaging: {0}")]
    Io(#[from] std::io::Error),

    /// The written archive could not be read back for upload.
    #[error("cannot read archive {path}: {source}")]
    ArchiveUnreadable {
        /// The archive path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The release notes document could not be serialised.
    #[error("cannot serialise release notes: {0}")]
    Notes(#[from] serde_json::Error),

    /// The zip writer rejected an entry.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
