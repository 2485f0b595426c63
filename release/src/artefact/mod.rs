//! Build artifacts: naming, verification, and packaging.
//!
//! # Sub-modules
//!
//! - [`naming`] - Archive filename and publish key policy.
//! - [`packaging`] - Zip archive creation.
//! - [`packaging_error`] - Error types for packaging operations.
//! - [`verification`] - Post-build artifact and debug-symbol checks.

pub mod naming;
pub mod packaging;
pub mod packaging_error;
pub mod verification;
