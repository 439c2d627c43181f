//! Semantic wrapper for package names.
//!
//! This module provides the [`PackageName`] newtype so that package names
//! are passed explicitly through the catalog and installer rather than as
//! raw strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package identifier, unique within a catalog.
///
/// Construction does not validate; descriptor parsing checks the character
/// set via [`PackageName::is_valid`] before a name enters a catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Return true when the name is non-empty and uses only ASCII
    /// alphanumerics, `-`, `_`, or `.`, and does not start with `.`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::package_name::PackageName;
    ///
    /// assert!(PackageName::from("ctx-switch").is_valid());
    /// assert!(!PackageName::from("../gcx").is_valid());
    /// ```
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && !self.0.starts_with('.')
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
