//! Output formatting for package listing.
//!
//! This module renders catalog entries, with their installed status, as
//! human-readable text or JSON.

use serde::Serialize;

/// One catalog entry with its installed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Catalog version.
    pub version: String,
    /// One-line description.
    pub description: String,
    /// Installed version from the receipt, if any.
    pub installed: Option<String>,
}

/// Format entries for human-readable output.
///
/// # Examples
///
/// ```
/// use formulary_installer::list_output::format_human;
///
/// let output = format_human(&[]);
/// assert!(output.contains("No packages available"));
/// ```
#[must_use]
pub fn format_human(entries: &[PackageEntry]) -> String {
    if entries.is_empty() {
        return String::from(
            "No packages available.\n\nAdd descriptors with `--catalog DIR` or `catalog_dirs` in config.toml.",
        );
    }

    let width = entries
        .iter()
        .map(|entry| entry.name.len())
        .max()
        .unwrap_or_default();
    let mut output = String::from("Available packages:\n");
    for entry in entries {
        let status = match &entry.installed {
            Some(version) if *version == entry.version => " [installed]".to_owned(),
            Some(version) => format!(" [installed {version}]"),
            None => String::new(),
        };
        output.push_str(&format!(
            "  {:<width$}  {:<8}  {}{status}\n",
            entry.name, entry.version, entry.description
        ));
    }
    output
}

/// Format entries as JSON.
///
/// # Examples
///
/// ```
/// use formulary_installer::list_output::format_json;
///
/// let json = format_json(&[]);
/// assert!(json.contains("\"packages\""));
/// ```
#[must_use]
pub fn format_json(entries: &[PackageEntry]) -> String {
    let json_data = PackagesJson { packages: entries };
    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

#[derive(Serialize)]
struct PackagesJson<'a> {
    packages: &'a [PackageEntry],
}
