//! Platform directory resolution.
//!
//! Wraps `directories-next` behind a trait so configuration lookup can be
//! exercised with fixed paths in tests.

use std::path::PathBuf;

/// Application directory name under the platform base directories.
pub const APP_DIR_NAME: &str = "formulary";

/// Source of platform base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Per-user local data directory (for example `~/.local/share`).
    fn data_local_dir(&self) -> Option<PathBuf>;

    /// Per-user configuration directory (for example `~/.config`).
    fn config_dir(&self) -> Option<PathBuf>;
}

/// Default install prefix, `<data_local_dir>/formulary`.
#[must_use]
pub fn default_prefix(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.data_local_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Location of the user configuration file,
/// `<config_dir>/formulary/config.toml`.
#[must_use]
pub fn config_file(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
}

/// Base directories of the current user, resolved by `directories-next`.
///
/// # Examples
///
/// ```no_run
/// use formulary_installer::dirs::{SystemBaseDirs, default_prefix};
///
/// let dirs = SystemBaseDirs::new();
/// println!("{:?}", default_prefix(&dirs));
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: Option<directories_next::BaseDirs>,
}

impl SystemBaseDirs {
    /// Resolve the current user's directories. Every lookup yields `None`
    /// when no home directory can be determined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: directories_next::BaseDirs::new(),
        }
    }
}

impl Default for SystemBaseDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseDirs for SystemBaseDirs {
    fn data_local_dir(&self) -> Option<PathBuf> {
        self.inner
            .as_ref()
            .map(|dirs| dirs.data_local_dir().to_path_buf())
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.inner.as_ref().map(|dirs| dirs.config_dir().to_path_buf())
    }
}
