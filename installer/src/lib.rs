//! Formulary installer library.
//!
//! This crate installs shell tools described by declarative package
//! descriptors: it downloads a release archive (or clones a development
//! head), verifies the archive's SHA-256 checksum, copies the declared files
//! under an install prefix, and runs the package's smoke test. It is used by
//! the `formulary` CLI binary and can be consumed programmatically for
//! testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`archive`] - Archive download, checksum digests, and extraction
//! - [`cancel`] - Cooperative cancellation between install stages
//! - [`catalog`] - Built-in and on-disk descriptor collections
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered installer configuration
//! - [`deps`] - Dependency presence checks on `PATH`
//! - [`descriptor`] - Package descriptor model and TOML parsing
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types and exit codes
//! - [`git`] - Shallow clones for development-head installs
//! - [`installer`] - Fetch, verify, extract, copy, and smoke-test stages
//! - [`layout`] - Install prefix layout and file classification
//! - [`list`] - `list` and `info` command implementations
//! - [`list_output`] - Output formatting for package listing
//! - [`output`] - Install summaries and `PATH` hints
//! - [`package_name`] - Semantic wrapper for package names
//! - [`pipeline`] - End-to-end install orchestration and reporting
//! - [`receipt`] - Install receipts under the prefix
//! - [`smoke`] - Command execution for smoke tests

pub mod archive;
pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod deps;
pub mod descriptor;
pub mod dirs;
pub mod error;
pub mod git;
pub mod installer;
pub mod layout;
pub mod list;
pub mod list_output;
pub mod output;
pub mod package_name;
pub mod pipeline;
pub mod receipt;
pub mod smoke;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
