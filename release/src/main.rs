//! LevelDB release orchestrator CLI entrypoint.
//!
//! Builds every configured target, verifies its outputs, optionally runs the
//! test suite, and optionally packages and publishes the release.

use camino::Utf8Path;
use leveldb_release::artefact::naming::PublishTarget;
use leveldb_release::builder::ScriptBuilder;
use leveldb_release::cli::Cli;
use leveldb_release::config::{ConfigSource, ReleaseConfig};
use leveldb_release::error::Result;
use leveldb_release::output::{print_dry_run_info, write_stderr_line};
use leveldb_release::pipeline::{ReleasePipeline, RunOptions, RunReport};
use leveldb_release::process::SystemCommandExecutor;
use leveldb_release::store::{HttpObjectStore, LocalObjectStore, ObjectStore};
use std::io::Write;

fn main() {
    let cli = Cli::parse_with_legacy();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs `env_logger` at the level selected by `-v`/`-q`. `RUST_LOG`
/// takes precedence when set.
fn init_logging(cli: &Cli) {
    let env = env_logger::Env::default().default_filter_or(cli.log_level().as_str());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let workspace_root = cli.workspace_root()?;
    let workspace = workspace_root.as_path();
    let (config, source) = ReleaseConfig::resolve(cli.config.as_deref(), workspace)?;
    let version = config.release_version()?;

    if cli.dry_run {
        let target = PublishTarget::new(&config.namespace, &config.product, &version);
        print_dry_run_info(&config, &source, &version, &target, stderr);
        return Ok(());
    }

    match &source {
        ConfigSource::File(path) => log::info!("using configuration {path}"),
        ConfigSource::BuiltIn => log::info!("using built-in configuration"),
    }

    let executor = SystemCommandExecutor;
    let builder = ScriptBuilder::new(executor, &config.build, workspace);
    let store = select_store(cli, &config, workspace);

    let mut pipeline = ReleasePipeline::new(&config, version, workspace, &builder, &executor);
    if let Some(store) = store.as_deref() {
        pipeline = pipeline.with_store(store);
    }

    let options = RunOptions {
        test: cli.test,
        upload: cli.upload,
        quiet: cli.quiet,
    };
    let report = pipeline.run(options, stderr)?;
    if !cli.quiet {
        print_summary(&report, stderr);
    }
    Ok(())
}

/// Chooses the object store: a local mirror when `--store-dir` is given,
/// otherwise the configured HTTP endpoint.
fn select_store(
    cli: &Cli,
    config: &ReleaseConfig,
    workspace: &Utf8Path,
) -> Option<Box<dyn ObjectStore>> {
    if !cli.upload {
        return None;
    }
    if let Some(dir) = &cli.store_dir {
        let root = if dir.is_absolute() {
            dir.clone()
        } else {
            workspace.join(dir)
        };
        log::info!("publishing into local directory {root}");
        return Some(Box::new(LocalObjectStore::new(&root)));
    }
    HttpObjectStore::from_settings(&config.store)
        .map(|store| Box::new(store) as Box<dyn ObjectStore>)
}

fn print_summary(report: &RunReport, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "");
    write_stderr_line(
        stderr,
        format!(
            "Release complete: {} configuration(s) processed.",
            report.configurations.len()
        ),
    );
    if let Some(package) = &report.package {
        write_stderr_line(
            stderr,
            format!("Archive: {} (sha256 {})", package.archive_path, package.sha256),
        );
    }
    if let Some(published) = &report.published {
        write_stderr_line(stderr, format!("Published: {}", published.archive_key));
        if let Some(notes_key) = &published.notes_key {
            write_stderr_line(stderr, format!("Release notes: {notes_key}"));
        }
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}: {err}", err.kind()));
            err.exit_code()
        }
    }
}
