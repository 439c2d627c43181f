//! Install prefix layout.
//!
//! Relative install destinations resolve against the prefix. The layout
//! also decides which destinations receive the executable bit and how each
//! installed file is classified for reporting.

use crate::package_name::PackageName;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

const RECEIPTS_DIR: &str = "var/formulary/receipts";

/// Classification of an installed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// An executable on the search path.
    Binary,
    /// A support file under the package library directory.
    Library,
    /// A bash completion script.
    BashCompletion,
    /// A zsh completion function.
    ZshCompletion,
    /// A fish completion script.
    FishCompletion,
    /// Anything else.
    Other,
}

impl FileKind {
    /// Return true for shell-completion kinds.
    #[must_use]
    pub fn is_completion(self) -> bool {
        matches!(
            self,
            Self::BashCompletion | Self::ZshCompletion | Self::FishCompletion
        )
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Binary => "binary",
            Self::Library => "library",
            Self::BashCompletion => "bash completion",
            Self::ZshCompletion => "zsh completion",
            Self::FishCompletion => "fish completion",
            Self::Other => "file",
        };
        f.write_str(label)
    }
}

/// Directory layout under an install prefix.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use formulary_installer::layout::PrefixLayout;
///
/// let layout = PrefixLayout::new("/opt/formulary");
/// assert_eq!(layout.resolve(Utf8Path::new("bin/gcx")), "/opt/formulary/bin/gcx");
/// assert_eq!(layout.resolve(Utf8Path::new("/usr/local/bin/tool")), "/usr/local/bin/tool");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLayout {
    prefix: Utf8PathBuf,
}

impl PrefixLayout {
    /// Create a layout rooted at `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<Utf8PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The prefix root.
    #[must_use]
    pub fn prefix(&self) -> &Utf8Path {
        &self.prefix
    }

    /// Executable search-path directory.
    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.prefix.join("bin")
    }

    /// Root of per-package support-library directories.
    #[must_use]
    pub fn lib_dir(&self) -> Utf8PathBuf {
        self.prefix.join("lib")
    }

    /// Support-library directory for one package.
    #[must_use]
    pub fn package_lib_dir(&self, name: &PackageName) -> Utf8PathBuf {
        self.lib_dir().join(name.as_str())
    }

    /// Bash completion directory.
    #[must_use]
    pub fn bash_completion_dir(&self) -> Utf8PathBuf {
        self.prefix.join("etc").join("bash_completion.d")
    }

    /// Zsh completion directory.
    #[must_use]
    pub fn zsh_completion_dir(&self) -> Utf8PathBuf {
        self.prefix.join("share").join("zsh").join("site-functions")
    }

    /// Fish completion directory.
    #[must_use]
    pub fn fish_completion_dir(&self) -> Utf8PathBuf {
        self.prefix
            .join("share")
            .join("fish")
            .join("vendor_completions.d")
    }

    /// Directory holding install receipts.
    #[must_use]
    pub fn receipts_dir(&self) -> Utf8PathBuf {
        self.prefix.join(RECEIPTS_DIR)
    }

    /// Resolve a declared destination. Absolute paths are kept as-is.
    #[must_use]
    pub fn resolve(&self, destination: &Utf8Path) -> Utf8PathBuf {
        if destination.is_absolute() {
            destination.to_owned()
        } else {
            self.prefix.join(destination)
        }
    }

    /// Return true when `path` lives in an executable-binary location:
    /// the prefix `bin` directory, or any directory named `bin` or `sbin`.
    #[must_use]
    pub fn is_executable_location(&self, path: &Utf8Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        parent == self.bin_dir() || matches!(parent.file_name(), Some("bin" | "sbin"))
    }

    /// Classify a resolved destination path.
    #[must_use]
    pub fn classify(&self, path: &Utf8Path) -> FileKind {
        if self.is_executable_location(path) {
            return FileKind::Binary;
        }
        let Some(parent) = path.parent() else {
            return FileKind::Other;
        };
        if parent == self.bash_completion_dir() {
            FileKind::BashCompletion
        } else if parent == self.zsh_completion_dir() {
            FileKind::ZshCompletion
        } else if parent == self.fish_completion_dir() {
            FileKind::FishCompletion
        } else if path.starts_with(self.lib_dir()) {
            FileKind::Library
        } else {
            FileKind::Other
        }
    }

    /// Expand `{bin}`, `{lib}`, and `{prefix}` placeholders in a command.
    ///
    /// Each substituted path is shell-quoted when it needs to be, so the
    /// result stays a valid `sh -c` script for prefixes containing spaces.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::layout::PrefixLayout;
    ///
    /// let layout = PrefixLayout::new("/opt/formulary");
    /// assert_eq!(
    ///     layout.expand_placeholders("{bin}/gcx --help"),
    ///     "/opt/formulary/bin/gcx --help"
    /// );
    ///
    /// let spaced = PrefixLayout::new("/Users/me/Application Support/formulary");
    /// assert_ne!(
    ///     spaced.expand_placeholders("{bin}/gcx --help"),
    ///     "/Users/me/Application Support/formulary/bin/gcx --help"
    /// );
    /// ```
    #[must_use]
    pub fn expand_placeholders(&self, command: &str) -> String {
        command
            .replace("{bin}", &shell_quote(self.bin_dir().as_str()))
            .replace("{lib}", &shell_quote(self.lib_dir().as_str()))
            .replace("{prefix}", &shell_quote(self.prefix.as_str()))
    }
}

/// Quote `path` for `sh`. Paths holding a NUL byte cannot be quoted and are
/// left as they are; no filesystem accepts them anyway.
fn shell_quote(path: &str) -> Cow<'_, str> {
    shlex::try_quote(path).unwrap_or(Cow::Borrowed(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn layout() -> PrefixLayout {
        PrefixLayout::new("/opt/formulary")
    }

    #[rstest]
    #[case::prefix_bin("/opt/formulary/bin/gcx", FileKind::Binary)]
    #[case::foreign_bin("/usr/local/bin/tool", FileKind::Binary)]
    #[case::sbin("/opt/formulary/sbin/daemon", FileKind::Binary)]
    #[case::library("/opt/formulary/lib/gcx/gcx-adc.sh", FileKind::Library)]
    #[case::bash("/opt/formulary/etc/bash_completion.d/gcx", FileKind::BashCompletion)]
    #[case::zsh("/opt/formulary/share/zsh/site-functions/_gcx", FileKind::ZshCompletion)]
    #[case::fish(
        "/opt/formulary/share/fish/vendor_completions.d/gcx.fish",
        FileKind::FishCompletion
    )]
    #[case::other("/opt/formulary/share/doc/gcx/README.md", FileKind::Other)]
    fn classifies_destinations(layout: PrefixLayout, #[case] path: &str, #[case] kind: FileKind) {
        assert_eq!(layout.classify(Utf8Path::new(path)), kind);
    }

    #[rstest]
    fn library_files_are_not_executable_locations(layout: PrefixLayout) {
        assert!(!layout.is_executable_location(Utf8Path::new("/opt/formulary/lib/gcx/gcx-vm.sh")));
    }

    #[rstest]
    fn relative_destinations_resolve_under_prefix(layout: PrefixLayout) {
        assert_eq!(
            layout.resolve(Utf8Path::new("lib/gcx/gcx-run.sh")),
            Utf8PathBuf::from("/opt/formulary/lib/gcx/gcx-run.sh")
        );
    }

    #[rstest]
    fn expands_every_placeholder(layout: PrefixLayout) {
        let expanded = layout.expand_placeholders("{prefix}:{bin}:{lib}");
        assert_eq!(
            expanded,
            "/opt/formulary:/opt/formulary/bin:/opt/formulary/lib"
        );
    }

    #[rstest]
    #[case::space("/Users/me/Application Support/formulary")]
    #[case::single_quote("/opt/it's/formulary")]
    #[case::dollar("/opt/$HOME/formulary")]
    fn quotes_paths_that_need_it(#[case] prefix: &str) {
        let layout = PrefixLayout::new(prefix);

        let expanded = layout.expand_placeholders("{bin}/gcx");

        assert_ne!(expanded, format!("{prefix}/bin/gcx"));
        assert_eq!(
            shlex::split(&expanded),
            Some(vec![format!("{prefix}/bin/gcx")])
        );
    }

    #[test]
    fn completion_kinds_are_flagged() {
        assert!(FileKind::ZshCompletion.is_completion());
        assert!(!FileKind::Binary.is_completion());
    }
}
