//! Installer configuration.
//!
//! Settings are layered: built-in defaults, then
//! `<config_dir>/formulary/config.toml`, then the `FORMULARY_PREFIX`
//! environment variable, then command-line overrides.

use crate::dirs::{BaseDirs, config_file, default_prefix};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "FORMULARY_PREFIX";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`InstallerConfig`].
    #[error("invalid config file {}: {reason}", path.display())]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// No prefix was configured and no default could be derived.
    #[error("could not determine install prefix; pass --prefix or set FORMULARY_PREFIX")]
    NoPrefix,

    /// A configured path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}

/// Settings supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Install prefix from `--prefix`.
    pub prefix: Option<Utf8PathBuf>,
    /// Extra catalog directories from `--catalog`.
    pub catalog_dirs: Vec<Utf8PathBuf>,
}

/// Effective installer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Root directory for relative install destinations.
    pub prefix: Option<Utf8PathBuf>,
    /// Directories of additional `*.toml` package descriptors.
    pub catalog_dirs: Vec<Utf8PathBuf>,
    /// Timeout for network operations, in seconds: whole-request archive
    /// downloads and `--head` clones.
    pub download_timeout_secs: u64,
    /// Timeout for the post-install smoke test, in seconds.
    pub test_timeout_secs: u64,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            catalog_dirs: Vec::new(),
            download_timeout_secs: DEFAULT_TIMEOUT_SECS,
            test_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl InstallerConfig {
    /// Load every configuration layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration file cannot be read or
    /// parsed.
    pub fn resolve(dirs: &dyn BaseDirs, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::load(dirs)?;
        config.merge_env();
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Load the user configuration file, falling back to defaults when it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        match config_file(dirs) {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<Self>(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.message().to_owned(),
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `FORMULARY_PREFIX` when it is set and non-empty.
    pub fn merge_env(&mut self) {
        if let Some(prefix) = std::env::var(PREFIX_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            log::debug!("{PREFIX_ENV} sets prefix to {prefix}");
            self.prefix = Some(Utf8PathBuf::from(prefix));
        }
    }

    /// Apply command-line overrides. Catalog directories are appended.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(prefix) = &overrides.prefix {
            self.prefix = Some(prefix.clone());
        }
        self.catalog_dirs
            .extend(overrides.catalog_dirs.iter().cloned());
    }

    /// The configured prefix, or `<data_local_dir>/formulary`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPrefix`] when neither is available and
    /// [`ConfigError::NonUtf8Path`] for a non-UTF-8 data directory.
    pub fn resolve_prefix(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf, ConfigError> {
        if let Some(prefix) = &self.prefix {
            return Ok(prefix.clone());
        }
        let path = default_prefix(dirs).ok_or(ConfigError::NoPrefix)?;
        Utf8PathBuf::from_path_buf(path).map_err(|path| ConfigError::NonUtf8Path { path })
    }

    /// Catalog directories in load order.
    #[must_use]
    pub fn catalog_dirs(&self) -> impl Iterator<Item = &Utf8Path> {
        self.catalog_dirs.iter().map(Utf8PathBuf::as_path)
    }

    /// Download timeout as a [`Duration`].
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Smoke-test timeout as a [`Duration`].
    #[must_use]
    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
