//! Installation stages for a single package.
//!
//! [`Installer`] exposes each stage separately: fetch and verify the
//! archive, extract it into a scoped temporary tree, copy the declared files
//! into the prefix, smoke-test the result, and check declared dependencies.
//! Collaborators that touch the network or spawn processes are injected as
//! trait objects.

use crate::archive::download::ArchiveFetcher;
use crate::archive::extraction::ArchiveExtractor;
use crate::archive::sha256_digest::Sha256Digest;
use crate::archive::tree::ExtractedTree;
use crate::cancel::CancellationToken;
use crate::deps::{MissingDependency, missing_dependencies};
use crate::descriptor::PackageDescriptor;
use crate::error::{InstallerError, Result};
use crate::layout::{FileKind, PrefixLayout};
use crate::package_name::PackageName;
use crate::smoke::{CommandExecutor, run_smoke_test};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::time::Duration;

/// Default timeout for the post-install smoke test.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(30);

const TEMP_FILE_PREFIX: &str = ".formulary-";

/// Archive bytes whose digest matched the descriptor checksum.
///
/// Only [`Installer::fetch`] and [`verify_checksum`] construct this type,
/// so holding one proves verification happened.
#[derive(Debug, Clone)]
pub struct VerifiedArchive {
    bytes: Vec<u8>,
    digest: Sha256Digest,
}

impl VerifiedArchive {
    /// The verified bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Digest of the bytes.
    #[must_use]
    pub fn digest(&self) -> &Sha256Digest {
        &self.digest
    }
}

/// One file written by [`Installer::install`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFile {
    /// Absolute destination path.
    pub path: Utf8PathBuf,
    /// Classification used for reporting.
    pub kind: FileKind,
}

/// Files installed for one package, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    /// The installed package.
    pub package: PackageName,
    /// Every destination written.
    pub files: Vec<InstalledFile>,
}

impl InstallResult {
    /// Installed files of the given kind.
    pub fn files_of_kind(&self, kind: FileKind) -> impl Iterator<Item = &InstalledFile> {
        self.files.iter().filter(move |file| file.kind == kind)
    }

    /// Installed shell-completion files.
    pub fn completions(&self) -> impl Iterator<Item = &InstalledFile> {
        self.files.iter().filter(|file| file.kind.is_completion())
    }
}

/// Check `bytes` against the descriptor checksum.
///
/// # Errors
///
/// Returns [`InstallerError::Integrity`] when the digest differs from the
/// declared checksum. Malformed declared checksums never match.
pub fn verify_checksum(descriptor: &PackageDescriptor, bytes: Vec<u8>) -> Result<VerifiedArchive> {
    let digest = Sha256Digest::of_bytes(&bytes);
    if !descriptor.checksum_matches(&digest) {
        return Err(InstallerError::Integrity {
            url: descriptor.source_url().to_owned(),
            expected: descriptor.checksum().to_owned(),
            actual: digest,
        });
    }
    log::debug!("checksum verified for {}: {digest}", descriptor.name());
    Ok(VerifiedArchive { bytes, digest })
}

/// Executes install stages against one prefix.
pub struct Installer<'a> {
    layout: PrefixLayout,
    fetcher: &'a dyn ArchiveFetcher,
    extractor: &'a dyn ArchiveExtractor,
    executor: &'a dyn CommandExecutor,
    cancel: CancellationToken,
    test_timeout: Duration,
}

impl<'a> Installer<'a> {
    /// Create an installer writing under `layout`.
    #[must_use]
    pub fn new(
        layout: PrefixLayout,
        fetcher: &'a dyn ArchiveFetcher,
        extractor: &'a dyn ArchiveExtractor,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            layout,
            fetcher,
            extractor,
            executor,
            cancel: CancellationToken::new(),
            test_timeout: DEFAULT_TEST_TIMEOUT,
        }
    }

    /// Observe `token` between stages.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bound the smoke test by `timeout`.
    #[must_use]
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// The target prefix layout.
    #[must_use]
    pub fn layout(&self) -> &PrefixLayout {
        &self.layout
    }

    /// The cancellation token observed by this installer.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Download the archive and verify its checksum.
    ///
    /// Verification is unconditional; corrupted bytes never leave this
    /// function.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Cancelled`], [`InstallerError::Network`],
    /// or [`InstallerError::Integrity`].
    pub fn fetch(&self, descriptor: &PackageDescriptor) -> Result<VerifiedArchive> {
        self.cancel.check("fetch")?;
        log::debug!("fetching {}", descriptor.source_url());
        let bytes = self.fetcher.fetch(descriptor.source_url())?;
        verify_checksum(descriptor, bytes)
    }

    /// Unpack a verified archive into a scoped temporary tree.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Cancelled`] or
    /// [`InstallerError::Extraction`].
    pub fn extract(&self, archive: &VerifiedArchive) -> Result<ExtractedTree> {
        self.cancel.check("extract")?;
        Ok(ExtractedTree::unpack(archive.bytes(), self.extractor)?)
    }

    /// Copy every install action from `tree` into the prefix.
    ///
    /// All sources are checked before anything is written; a source that is
    /// a symbolic link leaving the tree counts as missing. Each copy goes
    /// to a temporary file beside its destination and is renamed into
    /// place, so destinations are either old or complete. Running the same
    /// install twice yields the same files.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingSourceFile`] when a declared source
    /// is absent, [`InstallerError::Write`] when a destination cannot be
    /// written, and [`InstallerError::Cancelled`] when cancellation is
    /// observed between copies.
    pub fn install(
        &self,
        tree: &ExtractedTree,
        descriptor: &PackageDescriptor,
    ) -> Result<InstallResult> {
        let mut sources = Vec::with_capacity(descriptor.install_actions().len());
        for action in descriptor.install_actions() {
            let Some(source) = tree.source_file(&action.source) else {
                return Err(InstallerError::MissingSourceFile {
                    package: descriptor.name().clone(),
                    path: action.source.clone(),
                });
            };
            sources.push(source);
        }

        let mut files = Vec::with_capacity(sources.len());
        for (action, source) in descriptor.install_actions().iter().zip(&sources) {
            self.cancel.check("copy")?;
            let destination = self.layout.resolve(&action.destination);
            let executable = self.layout.is_executable_location(&destination);
            copy_atomic(source, &destination, executable)?;
            let kind = self.layout.classify(&destination);
            log::trace!("installed {action} as {kind}");
            files.push(InstalledFile {
                path: destination,
                kind,
            });
        }

        Ok(InstallResult {
            package: descriptor.name().clone(),
            files,
        })
    }

    /// Run the descriptor's test command and check its output mentions the
    /// package name. Returns false on mismatch, spawn failure, or timeout.
    #[must_use]
    pub fn verify_install(&self, descriptor: &PackageDescriptor) -> bool {
        let command = self.layout.expand_placeholders(descriptor.test_command());
        run_smoke_test(self.executor, &command, descriptor.name(), self.test_timeout)
    }

    /// Declared dependencies missing from the process `PATH`.
    #[must_use]
    pub fn check_dependencies(&self, descriptor: &PackageDescriptor) -> Vec<MissingDependency> {
        let path = std::env::var_os("PATH");
        self.check_dependencies_in(descriptor, path.as_deref())
    }

    /// Declared dependencies missing from `search_path`.
    #[must_use]
    pub fn check_dependencies_in(
        &self,
        descriptor: &PackageDescriptor,
        search_path: Option<&OsStr>,
    ) -> Vec<MissingDependency> {
        missing_dependencies(descriptor.dependencies(), search_path)
    }
}

/// Copy `source` to `destination` via a temporary sibling file.
///
/// Files in executable locations become `0o755`. Elsewhere the source's
/// execute bits are kept, so helper scripts under `lib` stay runnable.
fn copy_atomic(source: &Utf8Path, destination: &Utf8Path, executable: bool) -> Result<()> {
    let write_error = |source| InstallerError::Write {
        path: destination.to_owned(),
        source,
    };
    let parent = destination.parent().ok_or_else(|| {
        write_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "destination has no parent directory",
        ))
    })?;
    std::fs::create_dir_all(parent).map_err(write_error)?;

    let mut reader = std::fs::File::open(source)?;
    let executable = executable || is_executable_file(&reader)?;
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(parent)
        .map_err(write_error)?;
    std::io::copy(&mut reader, temp.as_file_mut()).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    set_mode(temp.path(), executable).map_err(write_error)?;
    temp.persist(destination)
        .map_err(|err| write_error(err.error))?;
    Ok(())
}

#[cfg(unix)]
fn is_executable_file(file: &std::fs::File) -> std::io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    Ok(file.metadata()?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable_file(_file: &std::fs::File) -> std::io::Result<bool> {
    Ok(false)
}

#[cfg(unix)]
fn set_mode(path: &std::path::Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if executable { 0o755 } else { 0o644 };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &std::path::Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "installer_tests.rs"]
mod tests;
