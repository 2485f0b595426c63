//! Shared test utilities for the release crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::builder::Builder;
use crate::config::BuildConfiguration;
use crate::error::{ReleaseError, Result};
use crate::process::{CommandExecutor, CommandOutput};
use crate::store::{ObjectStore, StoreError};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;

/// How a stubbed program behaves when run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOutcome {
    /// The process runs and exits with the given output.
    Exit(CommandOutput),
    /// The program cannot be spawned.
    NotFound,
}

impl StubOutcome {
    /// Exit with code zero, printing `stdout`.
    #[must_use]
    pub fn success(stdout: &str) -> Self {
        Self::Exit(CommandOutput {
            exit_code: Some(0),
            stdout: stdout.to_owned(),
            stderr: String::new(),
        })
    }

    /// Exit with `code`, printing `stderr`.
    #[must_use]
    pub fn exit(code: i32, stderr: &str) -> Self {
        Self::Exit(CommandOutput {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_owned(),
        })
    }

    /// Terminate without an exit code.
    #[must_use]
    pub fn terminated() -> Self {
        Self::Exit(CommandOutput {
            exit_code: None,
            ..CommandOutput::default()
        })
    }
}

/// A command invocation seen by [`StubExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The program as passed to the executor.
    pub program: String,
    /// The arguments.
    pub args: Vec<String>,
    /// The working directory.
    pub cwd: Utf8PathBuf,
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Programs without a configured outcome succeed with empty output. Outcomes
/// are matched on the full program string or its file name, so
/// `with("cache_test.exe", ..)` also applies to `/w/rel/cache_test.exe`.
///
/// With [`StubExecutor::requiring_files`], a program given as a path that does
/// not exist on disk fails to spawn, as it would on a real system.
#[derive(Debug, Default)]
pub struct StubExecutor {
    outcomes: HashMap<String, StubOutcome>,
    calls: RefCell<Vec<RecordedCall>>,
    require_files: bool,
}

impl StubExecutor {
    /// Creates an executor on which every program succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the outcome of `program`.
    #[must_use]
    pub fn with(mut self, program: &str, outcome: StubOutcome) -> Self {
        self.outcomes.insert(program.to_owned(), outcome);
        self
    }

    /// Refuse to launch path programs that are missing from disk.
    #[must_use]
    pub fn requiring_files(mut self) -> Self {
        self.require_files = true;
        self
    }

    /// Every invocation so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// The program of every invocation so far, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.program.clone())
            .collect()
    }

    fn outcome_for(&self, program: &str) -> Option<&StubOutcome> {
        self.outcomes.get(program).or_else(|| {
            Utf8Path::new(program)
                .file_name()
                .and_then(|name| self.outcomes.get(name))
        })
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[&str], cwd: &Utf8Path) -> std::io::Result<CommandOutput> {
        self.calls.borrow_mut().push(RecordedCall {
            program: program.to_owned(),
            args: args.iter().map(|&a| a.to_owned()).collect(),
            cwd: cwd.to_owned(),
        });

        let missing = self.require_files
            && program.contains(['/', '\\'])
            && !Utf8Path::new(program).is_file();
        if missing {
            return Err(not_found(program));
        }

        match self.outcome_for(program) {
            Some(StubOutcome::Exit(output)) => Ok(output.clone()),
            Some(StubOutcome::NotFound) => Err(not_found(program)),
            None => Ok(CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            }),
        }
    }
}

fn not_found(program: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{program}: not found"),
    )
}

/// A [`Builder`] that writes placeholder outputs instead of compiling.
///
/// Each build writes every output of the configuration, plus its
/// debug-symbol sibling, into `<workspace>/<output_dir>`.
#[derive(Debug)]
pub struct ScriptedBuilder {
    workspace: Utf8PathBuf,
    debug_symbol_extension: String,
    failing: BTreeSet<String>,
    omitted: BTreeSet<String>,
    built: RefCell<Vec<String>>,
}

impl ScriptedBuilder {
    /// Create a builder writing outputs below `workspace`.
    #[must_use]
    pub fn new(workspace: &Utf8Path) -> Self {
        Self {
            workspace: workspace.to_owned(),
            debug_symbol_extension: "pdb".to_owned(),
            failing: BTreeSet::new(),
            omitted: BTreeSet::new(),
            built: RefCell::new(Vec::new()),
        }
    }

    /// Make the build of `configuration` fail.
    #[must_use]
    pub fn failing(mut self, configuration: &str) -> Self {
        self.failing.insert(configuration.to_owned());
        self
    }

    /// Leave `file_name` out of every build.
    #[must_use]
    pub fn omitting(mut self, file_name: &str) -> Self {
        self.omitted.insert(file_name.to_owned());
        self
    }

    /// Names of the configurations built so far, in order.
    #[must_use]
    pub fn built(&self) -> Vec<String> {
        self.built.borrow().clone()
    }

    fn write_output(&self, configuration: &BuildConfiguration, path: &Utf8Path) -> Result<()> {
        let omitted = path
            .file_name()
            .is_some_and(|name| self.omitted.contains(name));
        if omitted {
            return Ok(());
        }
        fs::write(path, path.as_str().as_bytes()).map_err(|err| ReleaseError::BuildFailed {
            configuration: configuration.name.clone(),
            reason: format!("cannot write {path}: {err}"),
        })
    }
}

impl Builder for ScriptedBuilder {
    fn build(&self, configuration: &BuildConfiguration) -> Result<()> {
        self.built.borrow_mut().push(configuration.name.clone());
        if self.failing.contains(&configuration.name) {
            return Err(ReleaseError::BuildFailed {
                configuration: configuration.name.clone(),
                reason: "scripted build failure".to_owned(),
            });
        }

        let output_dir = self.workspace.join(&configuration.output_dir);
        fs::create_dir_all(&output_dir).map_err(|err| ReleaseError::BuildFailed {
            configuration: configuration.name.clone(),
            reason: format!("cannot create {output_dir}: {err}"),
        })?;
        for name in configuration.build_outputs() {
            let binary = output_dir.join(name);
            self.write_output(configuration, &binary)?;
            self.write_output(
                configuration,
                &binary.with_extension(&self.debug_symbol_extension),
            )?;
        }
        Ok(())
    }
}

/// An [`ObjectStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    exists_calls: Cell<usize>,
    puts: RefCell<Vec<String>>,
    fail_puts: bool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object at `key`.
    #[must_use]
    pub fn with_object(self, key: &str, bytes: &[u8]) -> Self {
        self.objects.borrow_mut().insert(key.to_owned(), bytes.to_vec());
        self
    }

    /// Reject every upload with a server error.
    #[must_use]
    pub fn failing_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// The stored bytes at `key`, if any.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(key).cloned()
    }

    /// Keys of every stored object.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }

    /// Keys passed to [`ObjectStore::put_public`], in order, including
    /// rejected ones.
    #[must_use]
    pub fn puts(&self) -> Vec<String> {
        self.puts.borrow().clone()
    }

    /// Number of existence checks performed.
    #[must_use]
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.get()
    }
}

impl ObjectStore for InMemoryStore {
    fn exists(&self, key: &str) -> std::result::Result<bool, StoreError> {
        self.exists_calls.set(self.exists_calls.get() + 1);
        Ok(self.objects.borrow().contains_key(key))
    }

    fn put_public(&self, key: &str, bytes: &[u8]) -> std::result::Result<(), StoreError> {
        self.puts.borrow_mut().push(key.to_owned());
        if self.fail_puts {
            return Err(StoreError::Status {
                url: format!("memory://{key}"),
                status: 503,
            });
        }
        self.objects.borrow_mut().insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }
}
