//! TOML deserialisation for package descriptors.
//!
//! The document shape mirrors the fields of [`PackageDescriptor`]; unknown
//! keys are rejected so that typos surface at load time rather than as a
//! silently ignored install step.

use super::error::{DescriptorError, Result};
use super::install_action::{InstallAction, check_destination_path, check_source_path};
use super::{HeadSource, PackageDescriptor};
use crate::package_name::PackageName;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    name: String,
    #[serde(default)]
    version: String,
    description: String,
    homepage: String,
    url: String,
    sha256: String,
    #[serde(default)]
    license: String,
    #[serde(default)]
    head: Option<RawHead>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    install: Vec<InstallAction>,
    test: String,
    #[serde(default)]
    caveats: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHead {
    url: String,
    #[serde(default = "default_branch")]
    branch: String,
}

fn default_branch() -> String {
    "main".to_owned()
}

/// Parse and validate one descriptor document.
///
/// `origin` names the source (a file path or built-in label) in error
/// messages.
///
/// # Errors
///
/// Returns [`DescriptorError`] if the TOML is malformed, the name is
/// invalid, a required field is blank, no install actions are declared, or
/// an install path escapes its root.
///
/// # Examples
///
/// ```
/// use formulary_installer::descriptor::parse_descriptor;
///
/// let toml = r#"
/// name = "tool"
/// description = "A tool"
/// homepage = "https://example.test"
/// url = "https://example.test/tool-1.0.tar.gz"
/// sha256 = "abc123"
/// test = "{bin}/tool --help"
///
/// [[install]]
/// from = "bin/tool.sh"
/// to = "bin/tool"
/// "#;
/// let descriptor = parse_descriptor(toml, "example").expect("valid descriptor");
/// assert_eq!(descriptor.name().as_str(), "tool");
/// assert_eq!(descriptor.install_actions().len(), 1);
/// ```
pub fn parse_descriptor(document: &str, origin: &str) -> Result<PackageDescriptor> {
    let raw: RawDescriptor = toml::from_str(document).map_err(|e| DescriptorError::Syntax {
        origin: origin.to_owned(),
        reason: e.message().to_owned(),
    })?;
    validate(raw, origin)
}

fn validate(raw: RawDescriptor, origin: &str) -> Result<PackageDescriptor> {
    let name = PackageName::from(raw.name.trim());
    if !name.is_valid() {
        return Err(DescriptorError::InvalidName {
            origin: origin.to_owned(),
            name: raw.name,
        });
    }

    require_non_blank(&raw.url, "url", origin)?;
    require_non_blank(&raw.sha256, "sha256", origin)?;
    require_non_blank(&raw.test, "test", origin)?;

    if raw.install.is_empty() {
        return Err(DescriptorError::NoInstallActions {
            origin: origin.to_owned(),
        });
    }
    for action in &raw.install {
        check_source_path(&action.source)
            .map_err(|reason| invalid_path(origin, &action.source, reason))?;
        check_destination_path(&action.destination)
            .map_err(|reason| invalid_path(origin, &action.destination, reason))?;
    }

    let head = raw.head.map(|head| HeadSource {
        url: head.url,
        branch: head.branch,
    });
    let dependencies: BTreeSet<PackageName> = raw
        .dependencies
        .iter()
        .map(|dep| PackageName::from(dep.trim()))
        .filter(|dep| !dep.as_str().is_empty())
        .collect();

    Ok(PackageDescriptor {
        name,
        version: raw.version,
        description: raw.description,
        homepage: raw.homepage,
        source_url: raw.url.trim().to_owned(),
        checksum: raw.sha256.trim().to_owned(),
        license: raw.license,
        head,
        dependencies,
        install_actions: raw.install,
        test_command: raw.test,
        caveats: raw
            .caveats
            .map(|text| text.trim_end().to_owned())
            .filter(|text| !text.is_empty()),
    })
}

fn require_non_blank(value: &str, field: &'static str, origin: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DescriptorError::EmptyField {
            origin: origin.to_owned(),
            field,
        });
    }
    Ok(())
}

fn invalid_path(origin: &str, path: &camino::Utf8Path, reason: &'static str) -> DescriptorError {
    DescriptorError::InvalidActionPath {
        origin: origin.to_owned(),
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
