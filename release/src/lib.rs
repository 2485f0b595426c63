//! LevelDB release orchestrator library.
//!
//! Drives an external build tool over a set of build configurations, checks
//! that every expected output exists, optionally runs the test executables,
//! and optionally packages the result into a zip archive published under a
//! write-once key. It is used by the `leveldb-release` binary and can be
//! driven programmatically for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Archive naming, packaging and output verification
//! - [`builder`] - External build invocation
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `release.toml` loading and validation
//! - [`error`] - Error taxonomy and exit codes
//! - [`output`] - Operator-facing stderr output
//! - [`pipeline`] - The release pipeline state machine
//! - [`process`] - Child-process execution
//! - [`publisher`] - Publish guard and upload
//! - [`store`] - Object store access
//! - [`test_runner`] - Sequential test and benchmark execution
//! - [`version`] - Immutable release identity

pub mod artefact;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod publisher;
pub mod store;
pub mod test_runner;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod version;
