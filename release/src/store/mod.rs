//! Remote object storage.
//!
//! The pipeline needs only two operations from the store: an existence check
//! and a public-read upload. [`ObjectStore`] captures exactly that, with an
//! HTTP implementation for real releases and a directory-backed one for
//! local mirrors.
//!
//! # Sub-modules
//!
//! - [`http`] - Bucket access over HTTP using `ureq`.
//! - [`local`] - A directory standing in for a bucket.

pub mod http;
pub mod local;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

/// Operations consumed from the object store.
///
/// Whether a partially transferred object is visible before the upload
/// completes is up to the store; the publish guard relies on it not being.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStore {
    /// Returns `true` when an object exists at `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when existence cannot be determined.
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Uploads `bytes` to `key` with public-read visibility.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the upload is rejected or interrupted.
    fn put_public(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Errors arising from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request could not be completed.
    #[error("request to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The store answered with an unexpected status code.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The status code received.
        status: u16,
    },

    /// The key cannot be mapped onto the store.
    #[error("invalid object key: {key}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
