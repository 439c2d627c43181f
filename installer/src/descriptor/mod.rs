//! Package descriptors: the immutable record describing one installable
//! package.
//!
//! A descriptor is built once from a TOML document (see [`parser`]) and is
//! never mutated afterwards. It carries display metadata, the archive
//! location and its expected SHA-256 checksum, the flat set of declared
//! dependencies, the ordered install actions, and the smoke-test command.
//!
//! # Sub-modules
//!
//! - [`error`] - Validation failures for descriptor documents.
//! - [`install_action`] - The `(source, destination)` copy pair.
//! - [`parser`] - TOML deserialisation and validation.

pub mod error;
pub mod install_action;
pub mod parser;

pub use error::DescriptorError;
pub use install_action::InstallAction;
pub use parser::parse_descriptor;

use crate::archive::sha256_digest::Sha256Digest;
use crate::package_name::PackageName;
use std::collections::BTreeSet;

/// Git source for installing the development head of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSource {
    /// Clone URL of the repository.
    pub url: String,
    /// Branch to check out.
    pub branch: String,
}

/// A static, immutable record fully describing one installable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub(crate) name: PackageName,
    pub(crate) version: String,
    pub(crate) description: String,
    pub(crate) homepage: String,
    pub(crate) source_url: String,
    pub(crate) checksum: String,
    pub(crate) license: String,
    pub(crate) head: Option<HeadSource>,
    pub(crate) dependencies: BTreeSet<PackageName>,
    pub(crate) install_actions: Vec<InstallAction>,
    pub(crate) test_command: String,
    pub(crate) caveats: Option<String>,
}

impl PackageDescriptor {
    /// Package identifier.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Display version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// One-line description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Project homepage.
    #[must_use]
    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    /// Location of the versioned archive.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Expected SHA-256 hex digest of the archive, exactly as declared.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Return true when the declared checksum is a well-formed SHA-256
    /// digest. Malformed values (such as placeholders) can never match a
    /// downloaded archive.
    #[must_use]
    pub fn has_well_formed_checksum(&self) -> bool {
        self.checksum.parse::<Sha256Digest>().is_ok()
    }

    /// Return true when `actual` matches the declared checksum.
    ///
    /// Hex case is ignored; any other difference is a mismatch.
    #[must_use]
    pub fn checksum_matches(&self, actual: &Sha256Digest) -> bool {
        actual.matches(&self.checksum)
    }

    /// Licence tag, informational only.
    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    /// Optional git source for head installs.
    #[must_use]
    pub fn head(&self) -> Option<&HeadSource> {
        self.head.as_ref()
    }

    /// Declared external dependencies, in name order.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<PackageName> {
        &self.dependencies
    }

    /// Install actions in declaration order.
    #[must_use]
    pub fn install_actions(&self) -> &[InstallAction] {
        &self.install_actions
    }

    /// Shell command used to smoke-test the installed result.
    ///
    /// May contain `{bin}`, `{lib}`, and `{prefix}` placeholders.
    #[must_use]
    pub fn test_command(&self) -> &str {
        &self.test_command
    }

    /// Post-install notes for the user.
    #[must_use]
    pub fn caveats(&self) -> Option<&str> {
        self.caveats.as_deref()
    }
}
