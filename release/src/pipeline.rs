//! The release pipeline state machine.
//!
//! One run walks `Init`, then `Building`, `Verifying` and `Testing` for each
//! configuration in declared order, reaches `Done`, and only then moves on to
//! `Packaging`, `Publishing` and `Published` when an upload was requested.
//! Any step may end the run in `Failed`; nothing is retried.
//!
//! The pipeline calls into every other component and nothing calls back into
//! it. Every transition is recorded in [`ReleasePipeline::history`] so that
//! callers can inspect how far a failed run got.

use crate::artefact::naming::PublishTarget;
use crate::artefact::packaging::{PackageOutput, Packager};
use crate::artefact::verification::ArtifactVerifier;
use crate::builder::Builder;
use crate::config::{BuildConfiguration, ConfigError, ReleaseConfig};
use crate::error::{FailureKind, ReleaseError, Result};
use crate::output::write_stderr_line;
use crate::process::CommandExecutor;
use crate::publisher::{PublishOutcome, Publisher, ensure_unpublished};
use crate::store::ObjectStore;
use crate::test_runner::{TestReport, TestRunner};
use crate::version::ReleaseVersion;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::io::Write;

/// A step of the release pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has run yet; the publish pre-check happens here.
    Init,
    /// The external build of a configuration is running.
    Building {
        /// Zero-based position of the configuration.
        index: usize,
        /// Configuration name.
        configuration: String,
    },
    /// The outputs of a configuration are being checked.
    Verifying {
        /// Zero-based position of the configuration.
        index: usize,
        /// Configuration name.
        configuration: String,
    },
    /// The test executables of a configuration are running.
    Testing {
        /// Zero-based position of the configuration.
        index: usize,
        /// Configuration name.
        configuration: String,
    },
    /// Every enabled configuration built and verified (and tested when
    /// requested).
    Done,
    /// The release archive is being written.
    Packaging,
    /// The archive is being uploaded.
    Publishing,
    /// The archive is available in the object store.
    Published,
    /// The run stopped.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// Diagnostic message.
        reason: String,
    },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Building { configuration, .. } => write!(f, "building {configuration}"),
            Self::Verifying { configuration, .. } => write!(f, "verifying {configuration}"),
            Self::Testing { configuration, .. } => write!(f, "testing {configuration}"),
            Self::Done => f.write_str("done"),
            Self::Packaging => f.write_str("packaging"),
            Self::Publishing => f.write_str("publishing"),
            Self::Published => f.write_str("published"),
            Self::Failed { kind, .. } => write!(f, "failed ({kind})"),
        }
    }
}

/// What the operator asked the run to do beyond building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run the test executables of every enabled configuration.
    pub test: bool,
    /// Package and publish after a successful build.
    pub upload: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// How far a configuration went through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationOutcome {
    /// Built only, as its rollout requires.
    BuiltOnly,
    /// Built and verified; tests were not requested.
    Verified,
    /// Built, verified and tested.
    Tested(TestReport),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-configuration outcome in declared order.
    pub configurations: Vec<(String, ConfigurationOutcome)>,
    /// The archive written, when an upload was requested.
    pub package: Option<PackageOutput>,
    /// The objects written, when an upload was requested.
    pub published: Option<PublishOutcome>,
}

/// Drives one release run.
pub struct ReleasePipeline<'a> {
    config: &'a ReleaseConfig,
    version: ReleaseVersion,
    workspace: Utf8PathBuf,
    builder: &'a dyn Builder,
    executor: &'a dyn CommandExecutor,
    store: Option<&'a dyn ObjectStore>,
    history: Vec<PipelineState>,
}

impl<'a> ReleasePipeline<'a> {
    /// Create a pipeline for `version` operating in `workspace`.
    #[must_use]
    pub fn new(
        config: &'a ReleaseConfig,
        version: ReleaseVersion,
        workspace: &Utf8Path,
        builder: &'a dyn Builder,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            version,
            workspace: workspace.to_owned(),
            builder,
            executor,
            store: None,
            history: Vec::new(),
        }
    }

    /// Attach the object store used when publishing.
    #[must_use]
    pub fn with_store(mut self, store: &'a dyn ObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The remote location this run publishes to.
    #[must_use]
    pub fn target(&self) -> PublishTarget {
        PublishTarget::new(&self.config.namespace, &self.config.product, &self.version)
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// The current state, if the run has started.
    #[must_use]
    pub fn state(&self) -> Option<&PipelineState> {
        self.history.last()
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the pipeline to
    /// [`PipelineState::Failed`]; see [`ReleaseError::kind`] for the
    /// categories.
    pub fn run(&mut self, options: RunOptions, stderr: &mut dyn Write) -> Result<RunReport> {
        self.enter(PipelineState::Init);
        let result = self.execute(options, stderr);
        if let Err(err) = &result {
            log::error!("release failed: {err}");
            self.enter(PipelineState::Failed {
                kind: err.kind(),
                reason: err.to_string(),
            });
        }
        result
    }

    fn execute(&mut self, options: RunOptions, stderr: &mut dyn Write) -> Result<RunReport> {
        let config = self.config;
        let target = self.target();

        let publish = if options.upload {
            let store = self.store.ok_or(ReleaseError::MissingStore)?;
            let primary = primary_configuration(config)?;
            progress(options, stderr, format!("Checking {} is unpublished", target.key()));
            ensure_unpublished(store, &target)?;
            Some((store, primary))
        } else {
            None
        };

        let mut configurations = Vec::with_capacity(config.configurations.len());
        for (index, configuration) in config.configurations.iter().enumerate() {
            let outcome = self.process_configuration(index, configuration, options, stderr)?;
            configurations.push((configuration.name.clone(), outcome));
        }
        self.enter(PipelineState::Done);

        let mut report = RunReport {
            configurations,
            package: None,
            published: None,
        };
        let Some((store, primary)) = publish else {
            return Ok(report);
        };

        self.enter(PipelineState::Packaging);
        progress(options, stderr, format!("Packaging {}", target.archive()));
        let package = Packager::new(&config.package.extensions).package(
            &self.workspace.join(&primary.output_dir),
            &self.workspace.join(&config.package.output_dir),
            target.archive(),
        )?;

        self.enter(PipelineState::Publishing);
        progress(options, stderr, format!("Uploading {}", target.key()));
        let published = Publisher::new(store).publish(&target, &package.archive_path, &self.version)?;
        self.enter(PipelineState::Published);
        progress(options, stderr, format!("Published {}", published.archive_key));

        report.package = Some(package);
        report.published = Some(published);
        Ok(report)
    }

    fn process_configuration(
        &mut self,
        index: usize,
        configuration: &BuildConfiguration,
        options: RunOptions,
        stderr: &mut dyn Write,
    ) -> Result<ConfigurationOutcome> {
        let name = configuration.name.clone();

        self.enter(PipelineState::Building {
            index,
            configuration: name.clone(),
        });
        progress(
            options,
            stderr,
            format!("Building {name} ({})", configuration.build_argument),
        );
        self.builder.build(configuration)?;

        if !configuration.rollout.is_enabled() {
            log::info!("{name} is build-only; skipping verification and tests");
            progress(options, stderr, format!("Skipping verification of {name} (build only)"));
            return Ok(ConfigurationOutcome::BuiltOnly);
        }

        self.enter(PipelineState::Verifying {
            index,
            configuration: name.clone(),
        });
        ArtifactVerifier::new(&self.workspace, &self.config.build.debug_symbol_extension)
            .verify(configuration)?;

        if !options.test {
            return Ok(ConfigurationOutcome::Verified);
        }

        self.enter(PipelineState::Testing {
            index,
            configuration: name,
        });
        let report = TestRunner::new(self.executor, &self.workspace, options.quiet)
            .run(configuration, stderr)?;
        Ok(ConfigurationOutcome::Tested(report))
    }

    fn enter(&mut self, next: PipelineState) {
        match self.history.last() {
            Some(previous) => log::debug!("pipeline: {previous} -> {next}"),
            None => log::debug!("pipeline: {next}"),
        }
        self.history.push(next);
    }
}

/// The configuration whose outputs become the archive.
fn primary_configuration(config: &ReleaseConfig) -> Result<&BuildConfiguration> {
    config.primary_configuration().ok_or_else(|| {
        ReleaseError::Config(ConfigError::Invalid {
            reason: "publishing needs at least one configuration with rollout \"full\"".to_owned(),
        })
    })
}

fn progress(options: RunOptions, stderr: &mut dyn Write, message: String) {
    log::info!("{message}");
    if !options.quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
