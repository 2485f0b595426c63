//! Child-process execution.
//!
//! Every external program the orchestrator runs (the build entry point, test
//! executables, the benchmark) goes through [`CommandExecutor`]. The call
//! blocks until the child exits and returns its captured output. No timeout is
//! applied: a hung child stalls the run.
//!
//! A program given as a relative path is resolved against the caller's
//! working directory, not the child's.

use camino::Utf8Path;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the process exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, trimmed, for operator diagnostics.
    #[must_use]
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_owned(),
            (false, true) => stdout.to_owned(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `program` with `args` in `cwd`, waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised when the process cannot be spawned or its
    /// output cannot be collected. A non-zero exit is not an error here.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use camino::Utf8Path;
    /// use leveldb_release::process::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let output = SystemCommandExecutor.run("cargo", &["--version"], Utf8Path::new("."))?;
    /// assert!(output.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<CommandOutput>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<CommandOutput> {
        (**self).run(program, args, cwd)
    }
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<CommandOutput> {
        log::debug!("running {program} {} in {cwd}", args.join(" "));
        let output = Command::new(resolve_program(program)?)
            .args(args)
            .current_dir(cwd)
            .output()?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Anchor a relative program path to the current directory. Bare names are
/// left for the `PATH` lookup.
fn resolve_program(program: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        std::path::absolute(path)
    } else {
        Ok(path.to_path_buf())
    }
}
