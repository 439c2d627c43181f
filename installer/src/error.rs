//! Error types for the formulary installer.
//!
//! Module-level errors fold into [`InstallerError`], which owns the mapping
//! to process exit codes.

use crate::archive::download::DownloadError;
use crate::archive::extraction::ExtractionError;
use crate::archive::sha256_digest::Sha256Digest;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::package_name::PackageName;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Exit code for a smoke-test mismatch.
pub const EXIT_VERIFICATION_FAILED: i32 = 1;
/// Exit code for fetch, integrity, and extraction failures.
pub const EXIT_FETCH_FAILED: i32 = 2;
/// Exit code for filesystem write failures, including missing sources.
pub const EXIT_WRITE_FAILED: i32 = 3;
/// Exit code for every other failure.
pub const EXIT_OTHER: i32 = 4;
/// Exit code after cancellation.
pub const EXIT_CANCELLED: i32 = 130;

/// Errors that abort an installer command.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The archive could not be downloaded.
    #[error(transparent)]
    Network(#[from] DownloadError),

    /// The downloaded bytes do not hash to the declared checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        /// The archive URL.
        url: String,
        /// Checksum declared by the descriptor.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: Sha256Digest,
    },

    /// The archive could not be unpacked.
    #[error("failed to extract archive: {0}")]
    Extraction(#[from] ExtractionError),

    /// A declared install source is absent from the extracted tree.
    #[error("{package}: source file {path} not found in archive")]
    MissingSourceFile {
        /// Package being installed.
        package: PackageName,
        /// The archive-relative source path.
        path: Utf8PathBuf,
    },

    /// A destination could not be created or written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The destination path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was requested.
    #[error("installation cancelled before {stage}")]
    Cancelled {
        /// The stage that did not start.
        stage: &'static str,
    },

    /// The catalog could not be built or the package is unknown.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A git operation for a head install failed.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// `--head` was requested for a package without a head source.
    #[error("{package} has no head source")]
    HeadUnavailable {
        /// The requested package.
        package: PackageName,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write command output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Process exit code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::error::InstallerError;
    ///
    /// let err = InstallerError::Cancelled { stage: "extract" };
    /// assert_eq!(err.exit_code(), 130);
    /// ```
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network(_) | Self::Integrity { .. } | Self::Extraction(_) => EXIT_FETCH_FAILED,
            Self::MissingSourceFile { .. } | Self::Write { .. } | Self::Io(_) => EXIT_WRITE_FAILED,
            Self::Cancelled { .. } => EXIT_CANCELLED,
            Self::Catalog(_)
            | Self::Config(_)
            | Self::Git { .. }
            | Self::HeadUnavailable { .. }
            | Self::WriteFailed { .. } => EXIT_OTHER,
        }
    }
}

/// Result alias for installer operations.
pub type Result<T> = std::result::Result<T, InstallerError>;
