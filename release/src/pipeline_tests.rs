//! Unit tests for the release pipeline state machine.

use super::*;
use crate::builder::MockBuilder;
use crate::config::Rollout;
use crate::test_utils::{InMemoryStore, ScriptedBuilder, StubExecutor, StubOutcome};
use rstest::{fixture, rstest};
use tempfile::TempDir;

const KEY: &str = "software/leveldb/rel/LevelDB-1.2-rev-1.zip";

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    config: ReleaseConfig,
}

impl Workspace {
    fn version(&self) -> ReleaseVersion {
        self.config.release_version().expect("valid version")
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 path");
    let mut config = ReleaseConfig::default();
    if let Some(sixty_four) = config.configurations.get_mut(1) {
        sixty_four.artifacts = vec!["libleveldb64.dll".to_owned()];
    }
    Workspace {
        _dir: dir,
        root,
        config,
    }
}

fn quiet(test: bool, upload: bool) -> RunOptions {
    RunOptions {
        test,
        upload,
        quiet: true,
    }
}

fn is_testing(state: &PipelineState) -> bool {
    matches!(state, PipelineState::Testing { .. })
}

#[rstest]
fn build_without_tests_reaches_done(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor = StubExecutor::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let report = pipeline
        .run(quiet(false, false), &mut Vec::new())
        .expect("run succeeds");

    assert_eq!(pipeline.state(), Some(&PipelineState::Done));
    assert!(executor.calls().is_empty(), "no test executable runs");
    assert!(!pipeline.history().iter().any(is_testing));
    assert_eq!(
        report.configurations,
        [
            ("32-bit".to_owned(), ConfigurationOutcome::Verified),
            ("64-bit".to_owned(), ConfigurationOutcome::BuiltOnly),
        ]
    );
    assert!(report.package.is_none());
}

#[rstest]
fn build_only_configuration_skips_verification(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root).omitting("libleveldb64.dll");
    let executor = StubExecutor::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    pipeline
        .run(quiet(true, false), &mut Vec::new())
        .expect("missing 64-bit output is not checked");

    assert_eq!(builder.built(), ["32-bit", "64-bit"]);
    let states: Vec<String> = pipeline.history().iter().map(ToString::to_string).collect();
    assert_eq!(
        states,
        [
            "init",
            "building 32-bit",
            "verifying 32-bit",
            "testing 32-bit",
            "building 64-bit",
            "done",
        ]
    );
    assert!(
        executor.programs().iter().all(|p| p.contains("/rel/")),
        "only the 32-bit tests run"
    );
}

#[rstest]
fn failing_test_stops_the_run(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor =
        StubExecutor::new().with("coding_test.exe", StubOutcome::exit(1, "assertion failed"));
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let err = pipeline
        .run(quiet(true, false), &mut Vec::new())
        .expect_err("test failure");

    assert_eq!(err.kind(), FailureKind::Test);
    assert_eq!(executor.calls().len(), 3, "coding_test.exe is the third test");
    assert_eq!(builder.built(), ["32-bit"], "64-bit is never built");
    assert!(matches!(
        pipeline.state(),
        Some(PipelineState::Failed { kind: FailureKind::Test, .. })
    ));
}

#[rstest]
fn missing_artifact_is_a_verification_failure(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root).omitting("libleveldb.pdb");
    let executor = StubExecutor::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let err = pipeline
        .run(quiet(true, false), &mut Vec::new())
        .expect_err("verification failure");

    assert_eq!(err.kind(), FailureKind::Verification);
    assert!(err.to_string().ends_with("rel/libleveldb.pdb"));
    assert!(executor.calls().is_empty(), "tests never start");
}

#[rstest]
fn test_missing_from_disk_is_a_test_failure(mut workspace: Workspace) {
    if let Some(primary) = workspace.config.configurations.first_mut() {
        primary.artifacts = vec!["libleveldb.dll".to_owned()];
    }
    let builder = ScriptedBuilder::new(&workspace.root).omitting("env_test.exe");
    let executor = StubExecutor::new().requiring_files();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let err = pipeline
        .run(quiet(true, false), &mut Vec::new())
        .expect_err("test failure");

    assert_eq!(err.kind(), FailureKind::Test);
    assert!(matches!(
        err,
        ReleaseError::TestLaunch { ref path, .. } if path.ends_with("rel/env_test.exe")
    ));
    assert_eq!(executor.calls().len(), 4, "env_test.exe is the fourth test");
    assert!(pipeline.history().iter().any(is_testing), "verification passed");
}

#[rstest]
fn existing_key_fails_at_init_without_building(workspace: Workspace) {
    let mut builder = MockBuilder::new();
    builder.expect_build().never();
    let executor = StubExecutor::new();
    let store = InMemoryStore::new().with_object(KEY, b"previous release");
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    )
    .with_store(&store);

    let err = pipeline
        .run(quiet(false, true), &mut Vec::new())
        .expect_err("publish conflict");

    assert_eq!(err.kind(), FailureKind::PublishConflict);
    assert_eq!(pipeline.history().len(), 2, "init then failed");
    assert!(store.puts().is_empty());
    assert_eq!(store.object(KEY).as_deref(), Some(&b"previous release"[..]));
}

#[rstest]
fn upload_without_store_is_a_configuration_error(workspace: Workspace) {
    let mut builder = MockBuilder::new();
    builder.expect_build().never();
    let executor = StubExecutor::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let err = pipeline
        .run(quiet(false, true), &mut Vec::new())
        .expect_err("no store");
    assert!(matches!(err, ReleaseError::MissingStore));
    assert_eq!(err.exit_code(), 2);
}

#[rstest]
fn upload_packages_primary_configuration_and_publishes(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor = StubExecutor::new();
    let store = InMemoryStore::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    )
    .with_store(&store);

    let report = pipeline
        .run(quiet(true, true), &mut Vec::new())
        .expect("release published");

    let package = report.package.expect("archive written");
    assert_eq!(
        package.archive_path,
        workspace.root.join("dist/LevelDB-1.2-rev-1.zip")
    );
    assert!(package.entries.contains(&"libleveldb.dll".to_owned()));
    assert!(package.entries.contains(&"db_bench.pdb".to_owned()));
    assert!(!package.entries.iter().any(|e| e.contains("64")));

    assert_eq!(
        store.puts(),
        [KEY, "software/leveldb/rel/LevelDB-1.2-rev-1-notes.json"]
    );
    assert_eq!(store.exists_calls(), 2, "pre-check and re-check");
    let tail: Vec<&PipelineState> = pipeline.history().iter().rev().take(4).collect();
    assert_eq!(
        tail,
        [
            &PipelineState::Published,
            &PipelineState::Publishing,
            &PipelineState::Packaging,
            &PipelineState::Done,
        ]
    );
}

#[rstest]
fn second_upload_of_same_revision_conflicts(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor = StubExecutor::new();
    let store = InMemoryStore::new();
    let run = || {
        ReleasePipeline::new(
            &workspace.config,
            workspace.version(),
            &workspace.root,
            &builder,
            &executor,
        )
        .with_store(&store)
        .run(quiet(false, true), &mut Vec::new())
    };

    run().expect("first upload succeeds");
    let err = run().expect_err("second upload conflicts");

    assert_eq!(err.kind(), FailureKind::PublishConflict);
    assert_eq!(builder.built().len(), 2, "second run builds nothing");
    assert_eq!(store.puts().len(), 2, "second run uploads nothing");
}

#[rstest]
fn failed_upload_is_a_transfer_error(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor = StubExecutor::new();
    let store = InMemoryStore::new().failing_puts();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    )
    .with_store(&store);

    let err = pipeline
        .run(quiet(true, true), &mut Vec::new())
        .expect_err("transfer error");
    assert_eq!(err.kind(), FailureKind::Transfer);
    assert_eq!(store.puts(), [KEY], "notes are not attempted after a failed archive");
}

#[rstest]
fn no_enabled_configuration_cannot_publish(mut workspace: Workspace) {
    for configuration in &mut workspace.config.configurations {
        configuration.rollout = Rollout::BuildOnly;
    }
    let mut builder = MockBuilder::new();
    builder.expect_build().never();
    let executor = StubExecutor::new();
    let store = InMemoryStore::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    )
    .with_store(&store);

    let err = pipeline
        .run(quiet(true, true), &mut Vec::new())
        .expect_err("nothing to package");
    assert_eq!(err.kind(), FailureKind::Configuration);
    assert_eq!(store.exists_calls(), 0);
}

#[rstest]
fn progress_is_written_unless_quiet(workspace: Workspace) {
    let builder = ScriptedBuilder::new(&workspace.root);
    let executor = StubExecutor::new();
    let mut pipeline = ReleasePipeline::new(
        &workspace.config,
        workspace.version(),
        &workspace.root,
        &builder,
        &executor,
    );

    let mut stderr = Vec::new();
    pipeline
        .run(
            RunOptions {
                test: true,
                upload: false,
                quiet: false,
            },
            &mut stderr,
        )
        .expect("run succeeds");

    let text = String::from_utf8(stderr).expect("utf8");
    assert!(text.contains("Building 32-bit (Just32rel)"));
    assert!(text.contains("Running test 1/15"));
    assert!(text.contains("Skipping verification of 64-bit (build only)"));
}
