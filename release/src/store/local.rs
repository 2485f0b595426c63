//! A directory standing in for a bucket.
//!
//! Keys map onto relative paths below the root. Useful for staging a release
//! on a file share, and for exercising the publish path without a network.

use super::{ObjectStore, StoreError};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fs;

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: Utf8PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// upload.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
        }
    }

    /// The file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for empty keys and keys that would
    /// escape the root.
    pub fn object_path(&self, key: &str) -> Result<Utf8PathBuf, StoreError> {
        let relative = Utf8Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
        if key.trim().is_empty() || escapes {
            return Err(StoreError::InvalidKey {
                key: key.to_owned(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.object_path(key)?.try_exists()?)
    }

    fn put_public(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        log::info!("wrote {} byte(s) to {path}", bytes.len());
        Ok(())
    }
}
