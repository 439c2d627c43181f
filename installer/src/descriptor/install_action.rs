//! Install actions: one declared copy from archive path to destination.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single `(source in archive, destination)` copy.
///
/// The source is always relative to the extracted archive root. The
/// destination is relative to the install prefix unless it is absolute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallAction {
    /// Path of the file inside the extracted archive.
    #[serde(rename = "from")]
    pub source: Utf8PathBuf,
    /// Where the file is installed.
    #[serde(rename = "to")]
    pub destination: Utf8PathBuf,
}

impl InstallAction {
    /// Create an install action.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::descriptor::InstallAction;
    ///
    /// let action = InstallAction::new("bin/gcx.sh", "bin/gcx");
    /// assert_eq!(action.to_string(), "bin/gcx.sh => bin/gcx");
    /// ```
    #[must_use]
    pub fn new(source: impl Into<Utf8PathBuf>, destination: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source, self.destination)
    }
}

/// Check that an archive-relative source path stays inside the archive.
pub(crate) fn check_source_path(path: &Utf8Path) -> Result<(), &'static str> {
    if path.as_str().is_empty() {
        return Err("path is empty");
    }
    if path.is_absolute() {
        return Err("source paths must be relative to the archive root");
    }
    if has_parent_component(path) {
        return Err("parent directory components are not permitted");
    }
    Ok(())
}

/// Check a destination path. Absolute destinations are allowed.
pub(crate) fn check_destination_path(path: &Utf8Path) -> Result<(), &'static str> {
    if path.as_str().is_empty() || path.file_name().is_none() {
        return Err("destination must name a file");
    }
    if has_parent_component(path) {
        return Err("parent directory components are not permitted");
    }
    Ok(())
}

fn has_parent_component(path: &Utf8Path) -> bool {
    path.components()
        .any(|component| matches!(component, Utf8Component::ParentDir))
}
