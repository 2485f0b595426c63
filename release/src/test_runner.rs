//! Sequential test and benchmark execution.
//!
//! Tests run one at a time in declared order. The first failing test stops the
//! run; its captured output is always shown. The benchmark runs only after
//! every test passes and its exit status never fails the release, though a
//! failing benchmark is always reported.

use crate::config::BuildConfiguration;
use crate::error::{ExitDescription, ReleaseError, Result};
use crate::output::write_stderr_line;
use crate::process::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// How the benchmark run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchmarkOutcome {
    /// The benchmark exited with code zero.
    Passed,
    /// The benchmark exited unsuccessfully.
    Failed {
        /// How the process terminated.
        status: ExitDescription,
    },
    /// The benchmark could not be started.
    LaunchFailed {
        /// The spawn error message.
        reason: String,
    },
}

/// Summary of a completed test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Number of test executables that ran (all of them passed).
    pub tests_run: usize,
    /// Result of the trailing benchmark.
    pub benchmark: BenchmarkOutcome,
}

/// Runs the test executables of a build configuration.
#[derive(Debug)]
pub struct TestRunner<E> {
    executor: E,
    workspace: Utf8PathBuf,
    quiet: bool,
}

impl<E: CommandExecutor> TestRunner<E> {
    /// Create a runner resolving output directories against `workspace`.
    #[must_use]
    pub fn new(executor: E, workspace: &Utf8Path, quiet: bool) -> Self {
        Self {
            executor,
            workspace: workspace.to_owned(),
            quiet,
        }
    }

    /// Run every test of `configuration`, then its benchmark.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::TestFailed`] for the first test that exits
    /// unsuccessfully and [`ReleaseError::TestLaunch`] for one that cannot be
    /// started. No later test runs in either case.
    pub fn run(
        &self,
        configuration: &BuildConfiguration,
        stderr: &mut dyn Write,
    ) -> Result<TestReport> {
        let build_dir = self.workspace.join(&configuration.output_dir);
        let total = configuration.test_executables.len();

        for (index, name) in configuration.test_executables.iter().enumerate() {
            let position = index + 1;
            let path = build_dir.join(name);
            self.progress(stderr, format!("Running test {position}/{total} {path}"));

            let output = self
                .executor
                .run(path.as_str(), &[], &self.workspace)
                .map_err(|source| ReleaseError::TestLaunch {
                    path: path.clone(),
                    source,
                })?;
            let captured = output.combined();

            if !output.success() {
                write_stderr_line(stderr, &captured);
                return Err(ReleaseError::TestFailed {
                    position,
                    total,
                    path,
                    status: output.exit_code.into(),
                    output: captured,
                });
            }
            self.show_output(stderr, &captured);
        }

        let benchmark = self.run_benchmark(&build_dir.join(&configuration.benchmark_executable), stderr);
        Ok(TestReport {
            tests_run: total,
            benchmark,
        })
    }

    fn run_benchmark(&self, path: &Utf8Path, stderr: &mut dyn Write) -> BenchmarkOutcome {
        self.progress(stderr, format!("Running {path}"));

        let outcome = match self.executor.run(path.as_str(), &[], &self.workspace) {
            Ok(output) => {
                self.show_output(stderr, &output.combined());
                if output.success() {
                    BenchmarkOutcome::Passed
                } else {
                    BenchmarkOutcome::Failed {
                        status: output.exit_code.into(),
                    }
                }
            }
            Err(err) => BenchmarkOutcome::LaunchFailed {
                reason: err.to_string(),
            },
        };

        match &outcome {
            BenchmarkOutcome::Passed => {}
            BenchmarkOutcome::Failed { status } => {
                log::warn!("benchmark {path} failed ({status})");
                write_stderr_line(stderr, format!("warning: benchmark {path} failed ({status})"));
            }
            BenchmarkOutcome::LaunchFailed { reason } => {
                log::warn!("benchmark {path} could not be started: {reason}");
                write_stderr_line(
                    stderr,
                    format!("warning: benchmark {path} could not be started: {reason}"),
                );
            }
        }
        outcome
    }

    fn progress(&self, stderr: &mut dyn Write, message: String) {
        log::debug!("{message}");
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }

    fn show_output(&self, stderr: &mut dyn Write, captured: &str) {
        if !self.quiet && !captured.is_empty() {
            write_stderr_line(stderr, captured);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rollout;
    use crate::test_utils::{StubExecutor, StubOutcome};
    use rstest::rstest;

    const TESTS: [&str; 5] = [
        "arena_test.exe",
        "coding_test.exe",
        "cache_test.exe",
        "log_test.exe",
        "table_test.exe",
    ];

    fn configuration() -> BuildConfiguration {
        BuildConfiguration {
            name: "32-bit".to_owned(),
            build_argument: "Just32rel".to_owned(),
            output_dir: Utf8PathBuf::from("rel"),
            rollout: Rollout::Full,
            test_executables: TESTS.iter().map(|&t| t.to_owned()).collect(),
            benchmark_executable: "db_bench.exe".to_owned(),
            artifacts: Vec::new(),
        }
    }

    fn run_with(executor: &StubExecutor, quiet: bool) -> (Result<TestReport>, String) {
        let runner = TestRunner::new(executor, Utf8Path::new("/w"), quiet);
        let mut stderr = Vec::new();
        let result = runner.run(&configuration(), &mut stderr);
        (result, String::from_utf8(stderr).expect("utf8 stderr"))
    }

    #[test]
    fn runs_tests_in_order_then_benchmark() {
        let executor = StubExecutor::new();
        let (result, _) = run_with(&executor, true);

        let report = result.expect("all pass");
        assert_eq!(report.tests_run, 5);
        assert_eq!(report.benchmark, BenchmarkOutcome::Passed);

        let expected: Vec<String> = TESTS
            .iter()
            .chain(std::iter::once(&"db_bench.exe"))
            .map(|name| format!("/w/rel/{name}"))
            .collect();
        assert_eq!(executor.programs(), expected);
    }

    #[test]
    fn third_failure_stops_after_three_tests() {
        let executor =
            StubExecutor::new().with("cache_test.exe", StubOutcome::exit(1, "cache mismatch"));
        let (result, stderr) = run_with(&executor, true);

        let err = result.expect_err("third test fails");
        match err {
            ReleaseError::TestFailed {
                position,
                total,
                path,
                status,
                output,
            } => {
                assert_eq!((position, total), (3, 5));
                assert_eq!(path, "/w/rel/cache_test.exe");
                assert_eq!(status, ExitDescription::Code(1));
                assert!(output.contains("cache mismatch"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.calls().len(), 3, "tests 4 and 5 must not run");
        assert!(stderr.contains("cache mismatch"), "failure output is shown even when quiet");
    }

    #[test]
    fn missing_test_executable_is_a_launch_failure() {
        let executor = StubExecutor::new().with("coding_test.exe", StubOutcome::NotFound);
        let (result, _) = run_with(&executor, true);

        assert!(matches!(
            result,
            Err(ReleaseError::TestLaunch { ref path, .. }) if path.ends_with("coding_test.exe")
        ));
        assert_eq!(executor.calls().len(), 2);
    }

    #[rstest]
    #[case::exit(StubOutcome::exit(3, "slow"), BenchmarkOutcome::Failed { status: ExitDescription::Code(3) })]
    #[case::signal(StubOutcome::terminated(), BenchmarkOutcome::Failed { status: ExitDescription::Terminated })]
    fn failing_benchmark_is_reported_not_fatal(
        #[case] outcome: StubOutcome,
        #[case] expected: BenchmarkOutcome,
    ) {
        let executor = StubExecutor::new().with("db_bench.exe", outcome);
        let (result, stderr) = run_with(&executor, true);

        let report = result.expect("benchmark failure is informational");
        assert_eq!(report.benchmark, expected);
        assert!(stderr.contains("warning: benchmark"));
    }

    #[test]
    fn unlaunchable_benchmark_is_reported() {
        let executor = StubExecutor::new().with("db_bench.exe", StubOutcome::NotFound);
        let (result, stderr) = run_with(&executor, false);

        let report = result.expect("benchmark launch failure is informational");
        assert!(matches!(report.benchmark, BenchmarkOutcome::LaunchFailed { .. }));
        assert!(stderr.contains("could not be started"));
    }

    #[test]
    fn progress_reports_accurate_positions() {
        let executor = StubExecutor::new().with("arena_test.exe", StubOutcome::success("ok 12 tests"));
        let (result, stderr) = run_with(&executor, false);

        result.expect("all pass");
        assert!(stderr.contains("Running test 1/5 /w/rel/arena_test.exe"));
        assert!(stderr.contains("Running test 5/5 /w/rel/table_test.exe"));
        assert!(stderr.contains("Running /w/rel/db_bench.exe"));
        assert!(stderr.contains("ok 12 tests"));
    }

    #[test]
    fn quiet_mode_hides_progress() {
        let executor = StubExecutor::new();
        let (result, stderr) = run_with(&executor, true);
        result.expect("all pass");
        assert!(stderr.is_empty());
    }
}
