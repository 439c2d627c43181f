//! Declared-dependency checks.
//!
//! Dependencies are never installed. Each one is expected to provide a
//! binary of the same name on the search path; any that do not are
//! reported as warnings.

use crate::package_name::PackageName;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// A declared dependency whose binary is not on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    /// The dependency name.
    pub name: PackageName,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency {} not found on PATH", self.name)
    }
}

/// Return the dependencies from `dependencies` with no executable in
/// `search_path` (a `PATH`-style list).
///
/// # Examples
///
/// ```
/// use formulary_installer::deps::missing_dependencies;
/// use formulary_installer::package_name::PackageName;
/// use std::ffi::OsStr;
///
/// let deps = [PackageName::from("surely-not-installed-anywhere")];
/// let missing = missing_dependencies(&deps, Some(OsStr::new("/nonexistent")));
/// assert_eq!(missing.len(), 1);
/// ```
pub fn missing_dependencies<'a>(
    dependencies: impl IntoIterator<Item = &'a PackageName>,
    search_path: Option<&OsStr>,
) -> Vec<MissingDependency> {
    dependencies
        .into_iter()
        .filter(|name| {
            let found = find_executable(name.as_str(), search_path);
            match &found {
                Some(path) => log::trace!("dependency {name} found at {}", path.display()),
                None => log::debug!("dependency {name} not found"),
            }
            found.is_none()
        })
        .map(|name| MissingDependency { name: name.clone() })
        .collect()
}

/// Locate an executable called `name` in `search_path`.
#[must_use]
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn search_path(dirs: &[&Path]) -> OsString {
        std::env::join_paths(dirs).expect("join paths")
    }

    #[cfg(unix)]
    fn write_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::write(path, "#!/bin/sh\n").expect("write executable");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
    }

    #[cfg(unix)]
    #[test]
    fn reports_only_absent_dependencies() {
        let temp = tempfile::tempdir().expect("temp dir");
        write_executable(&temp.path().join("yq"));
        let deps = [PackageName::from("gum"), PackageName::from("yq")];
        let path = search_path(&[temp.path()]);

        let missing = missing_dependencies(&deps, Some(&path));

        assert_eq!(
            missing,
            vec![MissingDependency {
                name: PackageName::from("gum")
            }]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_files_do_not_count() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp.path().join("gum"), "data").expect("write file");
        let path = search_path(&[temp.path()]);

        assert!(find_executable("gum", Some(&path)).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn searches_every_directory() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        write_executable(&second.path().join("gum"));
        let path = search_path(&[first.path(), second.path()]);

        assert_eq!(
            find_executable("gum", Some(&path)),
            Some(second.path().join("gum"))
        );
    }

    #[test]
    fn unset_search_path_finds_nothing() {
        let deps = [PackageName::from("yq")];
        assert_eq!(missing_dependencies(&deps, None).len(), 1);
    }

    #[test]
    fn message_names_dependency() {
        let missing = MissingDependency {
            name: PackageName::from("yq"),
        };
        assert_eq!(missing.to_string(), "dependency yq not found on PATH");
    }
}
