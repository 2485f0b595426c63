//! CLI argument definitions for the release orchestrator.
//!
//! The historical single-dash spellings (`-test`, `-upload`) and the bare
//! `upload` word are still accepted; [`normalize_legacy_args`] rewrites them
//! before clap sees the command line.

use crate::config::ConfigError;
use camino::Utf8PathBuf;
use clap::Parser;
use std::ffi::OsString;

/// Build, verify, test and publish a LevelDB release.
#[derive(Parser, Debug)]
#[command(name = "leveldb-release")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build, verify, test and publish a LevelDB release.\n\n",
    "Every configuration in release.toml is built with the external build tool ",
    "and its outputs are checked. With --test the test executables and the ",
    "benchmark run after each build. With --upload the primary configuration ",
    "is zipped and published to the object store; an existing release key is ",
    "never overwritten.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and verify only:\n",
    "    $ leveldb-release\n\n",
    "  Build, run the tests and publish:\n",
    "    $ leveldb-release --test --upload\n\n",
    "  Publish into a local mirror instead of the bucket:\n",
    "    $ leveldb-release --upload --store-dir ./mirror\n\n",
    "  Show what would happen:\n",
    "    $ leveldb-release --dry-run --upload",
))]
pub struct Cli {
    /// Run the test executables and the benchmark after each build.
    #[arg(long)]
    pub test: bool,

    /// Package and publish the release after a successful build.
    #[arg(long)]
    pub upload: bool,

    /// Release configuration file [default: <workspace>/release.toml].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory containing the build script and build outputs.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Publish into a local directory instead of the configured endpoint.
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<Utf8PathBuf>,

    /// Show the release plan and exit without building.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Options whose next argument is a value rather than a flag or command.
const VALUE_OPTIONS: [&str; 5] = ["-c", "--config", "-w", "--workspace", "--store-dir"];

/// Rewrite legacy spellings into their clap equivalents.
///
/// `-test` becomes `--test`, and both `-upload` and a bare `upload` become
/// `--upload`. The program name and option values are left untouched.
///
/// # Examples
///
/// ```
/// use leveldb_release::cli::normalize_legacy_args;
///
/// let args = normalize_legacy_args(["leveldb-release", "-test", "upload"]);
/// assert_eq!(args, ["leveldb-release", "--test", "--upload"]);
/// ```
#[must_use]
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut normalized: Vec<OsString> = Vec::new();
    for arg in args {
        let arg = arg.into();
        let is_value = normalized.len() > 1
            && normalized
                .last()
                .and_then(|prev| prev.to_str())
                .is_some_and(|prev| VALUE_OPTIONS.contains(&prev));
        let replacement = match arg.to_str() {
            _ if normalized.is_empty() || is_value => None,
            Some("-test") => Some("--test"),
            Some("-upload" | "upload") => Some("--upload"),
            _ => None,
        };
        normalized.push(replacement.map_or(arg, OsString::from));
    }
    normalized
}

impl Cli {
    /// Parse the process arguments, accepting legacy spellings.
    #[must_use]
    pub fn parse_with_legacy() -> Self {
        Self::parse_from(normalize_legacy_args(std::env::args_os()))
    }

    /// The workspace as an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Workspace`] when the current directory cannot
    /// be determined or is not UTF-8.
    pub fn workspace_root(&self) -> Result<Utf8PathBuf, ConfigError> {
        std::path::absolute(&self.workspace)
            .and_then(|path| {
                Utf8PathBuf::try_from(path).map_err(camino::FromPathBufError::into_io_error)
            })
            .map_err(|source| ConfigError::Workspace {
                path: self.workspace.clone(),
                source,
            })
    }

    /// The log level requested by `-v` and `-q`.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
