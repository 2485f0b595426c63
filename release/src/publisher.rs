//! Publishing the release archive to the object store.
//!
//! A release key is write-once: re-publishing the same version and revision
//! must be refused rather than silently overwriting the previous upload. The
//! existence check runs before anything is built and again immediately
//! before the upload. The gap between check and upload is not atomic, so two
//! concurrent runs for the same revision can still race.

use crate::artefact::naming::PublishTarget;
use crate::artefact::packaging_error::PackagingError;
use crate::error::{ReleaseError, Result};
use crate::store::ObjectStore;
use crate::version::{ReleaseNote, ReleaseVersion};
use camino::Utf8Path;
use serde::Serialize;
use std::fs;

/// What an upload wrote to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Key of the uploaded archive.
    pub archive_key: String,
    /// Size of the uploaded archive in bytes.
    pub archive_bytes: usize,
    /// Key of the release notes document, when notes were uploaded.
    pub notes_key: Option<String>,
}

/// JSON document describing a release, uploaded next to the archive.
#[derive(Debug, Serialize)]
struct NotesDocument<'a> {
    version: &'a str,
    revision: u32,
    notes: &'a [ReleaseNote],
}

/// Refuses publication when the release key already exists.
///
/// # Errors
///
/// Returns [`ReleaseError::PublishConflict`] when the archive key exists, and
/// [`ReleaseError::Transfer`] when the store cannot answer.
pub fn ensure_unpublished(store: &dyn ObjectStore, target: &PublishTarget) -> Result<()> {
    let key = target.key();
    let exists = store
        .exists(&key)
        .map_err(|source| ReleaseError::Transfer {
            key: key.clone(),
            source,
        })?;
    if exists {
        return Err(ReleaseError::PublishConflict { key });
    }
    log::debug!("{key} is not yet published");
    Ok(())
}

/// Uploads a packaged release.
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> Publisher<'a> {
    /// Create a publisher writing to `store`.
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Upload `archive_path` to the target key with public-read visibility,
    /// followed by the release notes document when `version` carries notes.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::PublishConflict`] if the key appeared since
    /// the run started, [`ReleaseError::Transfer`] if an upload fails, and
    /// [`ReleaseError::Packaging`] if the archive cannot be read or the notes
    /// cannot be serialised.
    pub fn publish(
        &self,
        target: &PublishTarget,
        archive_path: &Utf8Path,
        version: &ReleaseVersion,
    ) -> Result<PublishOutcome> {
        ensure_unpublished(self.store, target)?;

        let archive_key = target.key();
        let bytes =
            fs::read(archive_path).map_err(|source| PackagingError::ArchiveUnreadable {
                path: archive_path.to_owned(),
                source,
            })?;
        self.put(&archive_key, &bytes)?;
        log::info!("published {archive_path} as {archive_key}");

        let notes_key = if version.notes().is_empty() {
            None
        } else {
            let key = target.notes_key();
            self.put(&key, &notes_document(version)?)?;
            Some(key)
        };

        Ok(PublishOutcome {
            archive_key,
            archive_bytes: bytes.len(),
            notes_key,
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.store
            .put_public(key, bytes)
            .map_err(|source| ReleaseError::Transfer {
                key: key.to_owned(),
                source,
            })
    }
}

/// Serialize the release notes of `version` as pretty-printed JSON.
fn notes_document(version: &ReleaseVersion) -> Result<Vec<u8>> {
    let document = NotesDocument {
        version: version.major_minor(),
        revision: version.revision(),
        notes: version.notes(),
    };
    let json = serde_json::to_vec_pretty(&document).map_err(PackagingError::from)?;
    Ok(json)
}
