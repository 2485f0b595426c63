//! Operator-facing output.
//!
//! Progress, captured child output, and the dry-run plan are written to
//! stderr through an injected writer so that tests can capture them.

use crate::artefact::naming::PublishTarget;
use crate::config::{ConfigSource, ReleaseConfig};
use crate::version::ReleaseVersion;
use std::io::Write;

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Print the plan a run would execute without performing any of it.
pub fn print_dry_run_info(
    config: &ReleaseConfig,
    source: &ConfigSource,
    version: &ReleaseVersion,
    target: &PublishTarget,
    stderr: &mut dyn Write,
) {
    write_stderr_line(stderr, "Dry run - nothing will be built or uploaded");
    write_stderr_line(stderr, "");
    match source {
        ConfigSource::File(path) => write_stderr_line(stderr, format!("Configuration: {path}")),
        ConfigSource::BuiltIn => write_stderr_line(stderr, "Configuration: built-in defaults"),
    }
    write_stderr_line(stderr, format!("Release: {} {version}", config.product));
    write_stderr_line(stderr, format!("Publish key: {}", target.key()));
    write_stderr_line(
        stderr,
        format!(
            "Build command: {} {}",
            config.build.program,
            config.build.args.join(" ")
        ),
    );
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, "Configurations:");
    for configuration in &config.configurations {
        let mode = if configuration.rollout.is_enabled() {
            "build, verify, test"
        } else {
            "build only"
        };
        write_stderr_line(
            stderr,
            format!(
                "  - {} ({}) -> {} [{mode}], {} test(s)",
                configuration.name,
                configuration.build_argument,
                configuration.output_dir,
                configuration.test_executables.len()
            ),
        );
    }
}
