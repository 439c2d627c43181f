//! Install pipeline orchestration.
//!
//! Runs the stages of one install in order (fetch and verify or clone,
//! extract, copy, receipt, smoke test, dependency check) and folds the
//! non-fatal outcomes into an [`InstallReport`]. Progress lines go to an
//! injected writer and are suppressed in quiet mode.

use crate::deps::MissingDependency;
use crate::descriptor::PackageDescriptor;
use crate::error::{EXIT_VERIFICATION_FAILED, InstallerError, Result};
use crate::git::HeadFetcher;
use crate::installer::{InstallResult, Installer};
use crate::output::write_stderr_line;
use crate::receipt::{InstallReceipt, ReceiptSource, write_receipt};
use camino::Utf8PathBuf;
use std::ffi::OsStr;
use std::fmt;
use std::io::Write;

/// What to install and how.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    /// The package to install.
    pub package: &'a PackageDescriptor,
    /// Install the development head instead of the release archive.
    pub head: bool,
    /// Skip the post-install smoke test.
    pub skip_test: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Overall outcome of a completed install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// Installed and verified with nothing to report.
    Installed,
    /// Installed, but with at least one warning.
    InstalledWithWarnings,
}

/// A non-fatal condition observed during install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallWarning {
    /// A declared dependency is not on the search path.
    MissingDependency(MissingDependency),
    /// The smoke test did not mention the package name.
    SmokeTestFailed {
        /// The expanded test command.
        command: String,
    },
}

impl fmt::Display for InstallWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency(missing) => write!(f, "{missing}"),
            Self::SmokeTestFailed { command } => {
                write!(f, "smoke test `{command}` did not confirm the install")
            }
        }
    }
}

/// Result of [`run_install`].
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Files written.
    pub result: InstallResult,
    /// Receipt location.
    pub receipt: Utf8PathBuf,
    /// Install source.
    pub source: ReceiptSource,
    /// Non-fatal conditions, in the order observed.
    pub warnings: Vec<InstallWarning>,
}

impl InstallReport {
    /// `Installed` when there are no warnings.
    #[must_use]
    pub fn status(&self) -> InstallStatus {
        if self.warnings.is_empty() {
            InstallStatus::Installed
        } else {
            InstallStatus::InstalledWithWarnings
        }
    }

    /// Return true when the smoke test ran and failed.
    #[must_use]
    pub fn verification_failed(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, InstallWarning::SmokeTestFailed { .. }))
    }

    /// Process exit code: 1 after a failed smoke test, otherwise 0.
    /// Missing dependencies alone do not fail the command.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.verification_failed() {
            EXIT_VERIFICATION_FAILED
        } else {
            0
        }
    }
}

/// Install one package end to end.
///
/// `search_path` is the `PATH`-style list used for dependency checks.
///
/// # Errors
///
/// Returns the first fatal [`InstallerError`]; temporary trees are removed
/// and no destination is left half-written.
pub fn run_install(
    installer: &Installer<'_>,
    head_fetcher: &dyn HeadFetcher,
    request: &InstallRequest<'_>,
    search_path: Option<&OsStr>,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let descriptor = request.package;
    let mut progress = |message: String| {
        if !request.quiet {
            write_stderr_line(stderr, format!("==> {message}"));
        }
    };

    let (tree, source) = if request.head {
        let head = descriptor
            .head()
            .ok_or_else(|| InstallerError::HeadUnavailable {
                package: descriptor.name().clone(),
            })?;
        installer.cancellation().check("clone")?;
        progress(format!("Cloning {} ({})", head.url, head.branch));
        (head_fetcher.checkout(head)?, ReceiptSource::Head)
    } else {
        progress(format!("Downloading {}", descriptor.source_url()));
        let archive = installer.fetch(descriptor)?;
        progress(format!("Verified sha256 {}", archive.digest()));
        (installer.extract(&archive)?, ReceiptSource::Archive)
    };

    progress(format!(
        "Installing {} {} to {}",
        descriptor.name(),
        descriptor.version(),
        installer.layout().prefix()
    ));
    let result = installer.install(&tree, descriptor)?;
    drop(tree);

    let receipt = InstallReceipt::new(descriptor.version(), source, &result);
    let receipt_path = write_receipt(installer.layout(), &receipt)?;

    let mut warnings = Vec::new();
    if request.skip_test {
        log::debug!("smoke test skipped for {}", descriptor.name());
    } else {
        progress(format!("Testing {}", descriptor.name()));
        if !installer.verify_install(descriptor) {
            warnings.push(InstallWarning::SmokeTestFailed {
                command: installer
                    .layout()
                    .expand_placeholders(descriptor.test_command()),
            });
        }
    }
    warnings.extend(
        installer
            .check_dependencies_in(descriptor, search_path)
            .into_iter()
            .map(InstallWarning::MissingDependency),
    );

    Ok(InstallReport {
        result,
        receipt: receipt_path,
        source,
        warnings,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
