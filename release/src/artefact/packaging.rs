//! Release archive creation.
//!
//! Collects the qualifying build outputs of one directory into a single zip
//! archive named after the release. Entries are sorted and stamped with a
//! fixed modification time so the same inputs give the same bytes.

use super::naming::ArchiveName;
use super::packaging_error::PackagingError;
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;

/// Output produced by [`Packager::package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Path to the created archive.
    pub archive_path: Utf8PathBuf,
    /// Names of the archived files, in archive order.
    pub entries: Vec<String>,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
}

/// Packages a build output directory.
#[derive(Debug, Clone)]
pub struct Packager {
    extensions: Vec<String>,
}

impl Packager {
    /// Create a packager including files with any of `extensions`.
    ///
    /// Extensions are compared case-insensitively, with or without a
    /// leading dot.
    #[must_use]
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// List the files of `source_dir` that belong in the archive, sorted by
    /// name. Subdirectories are not descended into.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::SourceMissing`] when the directory does not
    /// exist, or [`PackagingError::Io`] when it cannot be read.
    pub fn qualifying_files(&self, source_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PackagingError> {
        if !source_dir.is_dir() {
            return Err(PackagingError::SourceMissing {
                path: source_dir.to_owned(),
            });
        }

        let mut files = Vec::new();
        for entry in source_dir.read_dir_utf8()? {
            let entry = entry?;
            if entry.file_type()?.is_file() && self.qualifies(entry.path()) {
                files.push(entry.path().to_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write `<output_dir>/<name>` containing the qualifying files of
    /// `source_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::NoQualifyingFiles`] when nothing would be
    /// archived, plus the errors of [`Packager::qualifying_files`] and any
    /// I/O or zip failure while writing.
    pub fn package(
        &self,
        source_dir: &Utf8Path,
        output_dir: &Utf8Path,
        name: &ArchiveName,
    ) -> Result<PackageOutput, PackagingError> {
        let files = self.qualifying_files(source_dir)?;
        if files.is_empty() {
            return Err(PackagingError::NoQualifyingFiles {
                path: source_dir.to_owned(),
                extensions: self.extensions.join(", "),
            });
        }

        let entries: Vec<(Utf8PathBuf, String)> = files
            .into_iter()
            .filter_map(|path| {
                let entry_name = path.file_name()?.to_owned();
                Some((path, entry_name))
            })
            .collect();

        fs::create_dir_all(output_dir)?;
        let archive_path = output_dir.join(name.filename());
        create_archive(&archive_path, &entries)?;
        let sha256 = compute_sha256(&archive_path)?;

        log::info!(
            "packaged {} file(s) from {source_dir} into {archive_path} (sha256 {sha256})",
            entries.len()
        );
        Ok(PackageOutput {
            archive_path,
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
            sha256,
        })
    }

    fn qualifies(&self, path: &Utf8Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            self.extensions.iter().any(|allowed| *allowed == ext)
        })
    }
}

/// Create a zip archive at `output_path`.
///
/// Each entry in `files` is a `(source_path, archive_name)` pair.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if any source cannot be read or the output
/// cannot be written, and [`PackagingError::Zip`] for zip encoding failures.
pub fn create_archive(
    output_path: &Utf8Path,
    files: &[(Utf8PathBuf, String)],
) -> Result<(), PackagingError> {
    let output_file = fs::File::create(output_path)?;
    let mut archive = zip::ZipWriter::new(output_file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for (source_path, archive_name) in files {
        archive.start_file(archive_name.as_str(), options)?;
        let mut source = fs::File::open(source_path)?;
        std::io::copy(&mut source, &mut archive)?;
    }

    archive.finish()?;
    Ok(())
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String, PackagingError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
