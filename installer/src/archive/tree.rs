//! Scoped temporary directory holding an extracted archive or checkout.
//!
//! The directory is owned by a [`tempfile::TempDir`], so it is removed when
//! the [`ExtractedTree`] is dropped: on success, on error propagation, and
//! on cancellation alike.

use super::extraction::{ArchiveExtractor, ExtractionError};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

const TEMP_PREFIX: &str = "formulary-";

/// An ephemeral directory tree against which install sources resolve.
#[derive(Debug)]
pub struct ExtractedTree {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ExtractedTree {
    /// Unpack `archive` into a fresh temporary directory.
    ///
    /// When the archive holds a single top-level directory (as release
    /// tarballs generated by forges do), that directory becomes the root.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the temporary directory cannot be
    /// created or the extractor fails.
    pub fn unpack(
        archive: &[u8],
        extractor: &dyn ArchiveExtractor,
    ) -> Result<Self, ExtractionError> {
        let temp = new_temp_dir()?;
        extractor.extract(archive, temp.path())?;
        let base = utf8_path(&temp)?;
        let root = single_child_dir(&base)?.unwrap_or(base);
        log::debug!("archive root is {root}");
        Ok(Self { _temp: temp, root })
    }

    /// Take ownership of an already-populated temporary directory, using
    /// `root` as the source root (for example a git checkout inside it).
    #[must_use]
    pub fn from_parts(temp: TempDir, root: Utf8PathBuf) -> Self {
        Self { _temp: temp, root }
    }

    /// Root directory against which install sources resolve.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolve an archive-relative source path.
    #[must_use]
    pub fn resolve(&self, source: &Utf8Path) -> Utf8PathBuf {
        self.root.join(source)
    }

    /// Resolve `source` to a regular file inside the tree.
    ///
    /// Symbolic links are followed only while they stay under the root, so
    /// a link pointing at a host file yields `None` and nothing outside the
    /// verified archive can be installed.
    #[must_use]
    pub fn source_file(&self, source: &Utf8Path) -> Option<Utf8PathBuf> {
        let root = self.root.canonicalize_utf8().ok()?;
        let path = self.resolve(source).canonicalize_utf8().ok()?;
        if !path.starts_with(&root) {
            log::warn!("{source} resolves outside the archive to {path}");
            return None;
        }
        path.is_file().then_some(path)
    }

    /// Return true when `source` names a regular file in the tree.
    #[must_use]
    pub fn contains_file(&self, source: &Utf8Path) -> bool {
        self.source_file(source).is_some()
    }
}

/// Create an isolated temporary directory for one install.
pub(crate) fn new_temp_dir() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()
}

fn utf8_path(temp: &TempDir) -> Result<Utf8PathBuf, ExtractionError> {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).map_err(|path| {
        ExtractionError::Io(std::io::Error::other(format!(
            "temporary directory is not valid UTF-8: {}",
            path.display()
        )))
    })
}

/// Return the only entry of `dir` when it is a directory.
fn single_child_dir(dir: &Utf8Path) -> Result<Option<Utf8PathBuf>, ExtractionError> {
    let mut entries = dir.read_dir_utf8()?;
    let Some(first) = entries.next().transpose()? else {
        return Ok(None);
    };
    if entries.next().is_some() || !first.file_type()?.is_dir() {
        return Ok(None);
    }
    Ok(Some(first.into_path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extraction::AutoExtractor;
    use crate::test_utils::{ArchiveEntry, tar_gz_archive};

    #[test]
    fn strips_single_top_level_directory() {
        let archive = tar_gz_archive(&[
            ArchiveEntry::file("gcx-1.2.0/bin/gcx.sh", b"#!/bin/sh\n"),
            ArchiveEntry::file("gcx-1.2.0/lib/gcx-vm.sh", b"#!/bin/sh\n"),
        ]);

        let tree = ExtractedTree::unpack(&archive, &AutoExtractor).expect("unpack");

        assert!(tree.root().ends_with("gcx-1.2.0"));
        assert!(tree.contains_file(Utf8Path::new("bin/gcx.sh")));
    }

    #[test]
    fn keeps_flat_layout_as_root() {
        let archive = tar_gz_archive(&[
            ArchiveEntry::file("bin/tool.sh", b"#!/bin/sh\n"),
            ArchiveEntry::file("README.md", b"readme"),
        ]);

        let tree = ExtractedTree::unpack(&archive, &AutoExtractor).expect("unpack");

        assert!(tree.contains_file(Utf8Path::new("bin/tool.sh")));
        assert!(!tree.contains_file(Utf8Path::new("bin")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_leaving_the_tree_are_not_sources() {
        let archive = tar_gz_archive(&[
            ArchiveEntry::symlink("bin/tool.sh", "/etc/hostname"),
            ArchiveEntry::symlink("bin/up.sh", "../../outside.sh"),
            ArchiveEntry::file("README", b"readme"),
        ]);

        let tree = ExtractedTree::unpack(&archive, &AutoExtractor).expect("unpack");

        assert!(!tree.contains_file(Utf8Path::new("bin/tool.sh")));
        assert!(!tree.contains_file(Utf8Path::new("bin/up.sh")));
        assert!(tree.contains_file(Utf8Path::new("README")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_inside_the_tree_resolve_to_their_target() {
        let archive = tar_gz_archive(&[
            ArchiveEntry::file("libexec/tool.sh", b"#!/bin/sh\n"),
            ArchiveEntry::symlink("bin/tool.sh", "../libexec/tool.sh"),
        ]);

        let tree = ExtractedTree::unpack(&archive, &AutoExtractor).expect("unpack");

        let source = tree
            .source_file(Utf8Path::new("bin/tool.sh"))
            .expect("link inside the tree");
        assert!(source.ends_with("libexec/tool.sh"));
    }

    #[test]
    fn temporary_directory_is_removed_on_drop() {
        let archive = tar_gz_archive(&[ArchiveEntry::file("tool.sh", b"#!/bin/sh\n")]);
        let tree = ExtractedTree::unpack(&archive, &AutoExtractor).expect("unpack");
        let root = tree.root().to_owned();
        assert!(root.exists());

        drop(tree);

        assert!(!root.exists());
    }

    #[test]
    fn temporary_directory_is_removed_when_extraction_fails() {
        use crate::archive::extraction::MockArchiveExtractor;
        use std::path::PathBuf;
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Option<PathBuf>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().returning(move |_, dest| {
            std::fs::write(dest.join("partial"), b"half").expect("write partial file");
            *captured.lock().expect("lock") = Some(dest.to_path_buf());
            Err(ExtractionError::EmptyArchive)
        });

        let result = ExtractedTree::unpack(b"ignored", &extractor);

        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
        let dest = seen.lock().expect("lock").clone().expect("extractor called");
        assert!(!dest.exists(), "temporary tree should be removed");
    }
}
