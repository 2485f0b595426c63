//! Post-build artifact verification.
//!
//! A build tool that exits successfully without producing its outputs is
//! treated as failed: every expected file and its debug-symbol sibling must be
//! present before the run may continue. Only file metadata is inspected.

use crate::config::BuildConfiguration;
use crate::error::{ReleaseError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// A build output and the debug-symbol file that must accompany it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    /// The binary, e.g. `rel/libleveldb.dll`.
    pub binary: Utf8PathBuf,
    /// The co-located debug symbols, e.g. `rel/libleveldb.pdb`.
    pub debug_symbols: Utf8PathBuf,
}

/// Checks that a build configuration produced all of its outputs.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use leveldb_release::artefact::verification::ArtifactVerifier;
/// use leveldb_release::config::ReleaseConfig;
///
/// let config = ReleaseConfig::default();
/// let verifier = ArtifactVerifier::new(Utf8Path::new("win"), "pdb");
/// let primary = config.primary_configuration().expect("primary");
/// let set = verifier.artifact_set(primary);
/// assert_eq!(set.last().expect("benchmark").debug_symbols, "win/rel/db_bench.pdb");
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactVerifier {
    workspace: Utf8PathBuf,
    debug_symbol_extension: String,
}

impl ArtifactVerifier {
    /// Create a verifier resolving output directories against `workspace`.
    #[must_use]
    pub fn new(workspace: &Utf8Path, debug_symbol_extension: &str) -> Self {
        Self {
            workspace: workspace.to_owned(),
            debug_symbol_extension: debug_symbol_extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Derive the artifact set of `configuration` in declared order.
    #[must_use]
    pub fn artifact_set(&self, configuration: &BuildConfiguration) -> Vec<ArtifactPair> {
        let output_dir = self.workspace.join(&configuration.output_dir);
        configuration
            .expected_artifacts()
            .into_iter()
            .map(|name| {
                let binary = output_dir.join(name);
                let debug_symbols = binary.with_extension(&self.debug_symbol_extension);
                ArtifactPair {
                    binary,
                    debug_symbols,
                }
            })
            .collect()
    }

    /// Verify every artifact of `configuration` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::ArtifactMissing`] naming the first missing
    /// file. The binary is checked before its debug symbols.
    pub fn verify(&self, configuration: &BuildConfiguration) -> Result<()> {
        let set = self.artifact_set(configuration);
        for pair in &set {
            ensure_exists(&pair.binary)?;
            ensure_exists(&pair.debug_symbols)?;
        }
        log::info!(
            "verified {} artifact(s) for {}",
            set.len(),
            configuration.name
        );
        Ok(())
    }
}

fn ensure_exists(path: &Utf8Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReleaseError::ArtifactMissing {
            path: path.to_owned(),
        })
    }
}
