//! Package catalog.
//!
//! Holds every descriptor known to the process: the built-in definitions
//! embedded at compile time plus any `*.toml` files from user catalog
//! directories. Names are unique across all sources.

use crate::descriptor::{DescriptorError, PackageDescriptor, parse_descriptor};
use crate::package_name::PackageName;
use camino::Utf8Path;
use std::collections::BTreeMap;

const BUILTIN_DESCRIPTORS: &[(&str, &str)] = &[
    (
        "builtin:ctx-switch.toml",
        include_str!("../formula/ctx-switch.toml"),
    ),
    ("builtin:gcx.toml", include_str!("../formula/gcx.toml")),
];

/// Errors raised while building or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A descriptor failed to parse or validate.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// A catalog directory or file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// The directory or file being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two descriptors share a name.
    #[error("package {name} is defined twice (second definition in {origin})")]
    DuplicatePackage {
        /// The repeated name.
        name: PackageName,
        /// Where the second definition came from.
        origin: String,
    },

    /// No descriptor has the requested name.
    #[error("unknown package: {name}")]
    UnknownPackage {
        /// The requested name.
        name: PackageName,
    },
}

/// Descriptors indexed by package name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: BTreeMap<PackageName, PackageDescriptor>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog holding the embedded `ctx-switch` and `gcx` definitions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if an embedded definition is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::catalog::Catalog;
    ///
    /// let catalog = Catalog::builtin().expect("built-in catalog");
    /// assert!(catalog.get("gcx").is_ok());
    /// ```
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::empty();
        for (origin, document) in BUILTIN_DESCRIPTORS {
            catalog.add_document(document, origin)?;
        }
        Ok(catalog)
    }

    /// Add every `*.toml` file in `dir`, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the directory cannot be listed or a
    /// file cannot be read, [`CatalogError::Descriptor`] for an invalid
    /// file, and [`CatalogError::DuplicatePackage`] for a repeated name.
    pub fn load_dir(&mut self, dir: &Utf8Path) -> Result<(), CatalogError> {
        let io_error = |source| CatalogError::Io {
            path: dir.to_string(),
            source,
        };
        let mut files = Vec::new();
        for entry in dir.read_dir_utf8().map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let path = entry.into_path();
            if path.extension() == Some("toml") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for path in files {
            let document = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.to_string(),
                source,
            })?;
            self.add_document(&document, path.as_str())?;
        }
        Ok(())
    }

    /// Parse one descriptor document and add it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Descriptor`] or
    /// [`CatalogError::DuplicatePackage`].
    pub fn add_document(&mut self, document: &str, origin: &str) -> Result<(), CatalogError> {
        let descriptor = parse_descriptor(document, origin)?;
        self.insert(descriptor, origin)
    }

    /// Add an already-parsed descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicatePackage`] if the name is taken.
    pub fn insert(&mut self, descriptor: PackageDescriptor, origin: &str) -> Result<(), CatalogError> {
        let name = descriptor.name().clone();
        if self.packages.contains_key(&name) {
            return Err(CatalogError::DuplicatePackage {
                name,
                origin: origin.to_owned(),
            });
        }
        if !descriptor.has_well_formed_checksum() {
            log::warn!(
                "{name} from {origin} has a malformed sha256 ({}); archive installs will fail verification",
                descriptor.checksum()
            );
        }
        log::debug!("catalog: added {name} {} from {origin}", descriptor.version());
        self.packages.insert(name, descriptor);
        Ok(())
    }

    /// Look up a descriptor by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownPackage`] when absent.
    pub fn get(&self, name: &str) -> Result<&PackageDescriptor, CatalogError> {
        let name = PackageName::from(name);
        self.packages
            .get(&name)
            .ok_or(CatalogError::UnknownPackage { name })
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.values()
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Return true when the catalog holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
