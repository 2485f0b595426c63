//! External build invocation.
//!
//! The orchestrator does not compile anything itself. It asks a [`Builder`] to
//! produce one build configuration at a time; [`ScriptBuilder`] does that by
//! running the platform build entry point (`cmd.exe /c build.bat Just32rel`
//! by default) in the workspace directory.

use crate::config::{BuildConfiguration, BuildSection};
use crate::error::{ReleaseError, Result};
use crate::process::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};

/// Produces the outputs of one build configuration.
#[cfg_attr(test, mockall::automock)]
pub trait Builder {
    /// Build `configuration`, blocking until the build finishes.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::BuildFailed`] when the build reports failure
    /// and [`ReleaseError::BuildLaunch`] when it cannot be started.
    fn build(&self, configuration: &BuildConfiguration) -> Result<()>;
}

/// Runs a build script with a configuration-selecting argument.
#[derive(Debug)]
pub struct ScriptBuilder<E> {
    executor: E,
    program: String,
    args: Vec<String>,
    workspace: Utf8PathBuf,
}

impl<E: CommandExecutor> ScriptBuilder<E> {
    /// Create a builder that runs `settings.program` with `settings.args`
    /// inside `workspace`. A program given as a relative path is taken from
    /// the workspace.
    #[must_use]
    pub fn new(executor: E, settings: &BuildSection, workspace: &Utf8Path) -> Self {
        let program = Utf8Path::new(&settings.program);
        let program = if program.is_relative() && program.components().count() > 1 {
            workspace.join(program).into_string()
        } else {
            settings.program.clone()
        };
        Self {
            executor,
            program,
            args: settings.args.clone(),
            workspace: workspace.to_owned(),
        }
    }

    /// The full argument list for `configuration`.
    fn arguments<'a>(&'a self, configuration: &'a BuildConfiguration) -> Vec<&'a str> {
        self.args
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(configuration.build_argument.as_str()))
            .collect()
    }
}

impl<E: CommandExecutor> Builder for ScriptBuilder<E> {
    fn build(&self, configuration: &BuildConfiguration) -> Result<()> {
        let args = self.arguments(configuration);
        log::info!(
            "building {} with {} {}",
            configuration.name,
            self.program,
            args.join(" ")
        );

        let output = self
            .executor
            .run(&self.program, &args, &self.workspace)
            .map_err(|source| ReleaseError::BuildLaunch {
                configuration: configuration.name.clone(),
                source,
            })?;

        if !output.success() {
            return Err(ReleaseError::BuildFailed {
                configuration: configuration.name.clone(),
                reason: output.combined(),
            });
        }

        log::debug!("build of {} succeeded", configuration.name);
        Ok(())
    }
}
