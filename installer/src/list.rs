//! List and info command implementations.
//!
//! Both commands read the catalog and the receipts under the prefix; neither
//! touches the network.

use log::trace;
use std::io::Write;

use crate::catalog::Catalog;
use crate::error::{InstallerError, Result};
use crate::layout::PrefixLayout;
use crate::list_output::{PackageEntry, format_human, format_json};
use crate::output::format_info;
use crate::receipt::read_receipt;

/// Build listing entries for every catalog package.
#[must_use]
pub fn catalog_entries(catalog: &Catalog, layout: &PrefixLayout) -> Vec<PackageEntry> {
    catalog
        .iter()
        .map(|descriptor| {
            let installed = read_receipt(layout, descriptor.name()).map(|receipt| receipt.version);
            trace!("{}: installed {installed:?}", descriptor.name());
            PackageEntry {
                name: descriptor.name().to_string(),
                version: descriptor.version().to_owned(),
                description: descriptor.description().to_owned(),
                installed,
            }
        })
        .collect()
}

/// Lists catalog packages and their installed status.
///
/// Output is written to `stdout` (human-readable by default, JSON when
/// `json` is set).
///
/// # Errors
///
/// Returns [`InstallerError::WriteFailed`] if writing to `stdout` fails.
pub fn run_list(
    catalog: &Catalog,
    layout: &PrefixLayout,
    json: bool,
    stdout: &mut dyn Write,
) -> Result<()> {
    let entries = catalog_entries(catalog, layout);
    let output = if json {
        format_json(&entries)
    } else {
        format_human(&entries)
    };

    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}

/// Prints details and caveats for one package.
///
/// # Errors
///
/// Returns [`InstallerError::Catalog`] for an unknown package and
/// [`InstallerError::WriteFailed`] if writing to `stdout` fails.
pub fn run_info(
    catalog: &Catalog,
    layout: &PrefixLayout,
    name: &str,
    stdout: &mut dyn Write,
) -> Result<()> {
    let descriptor = catalog.get(name)?;
    let installed = read_receipt(layout, descriptor.name()).map(|receipt| receipt.version);
    let output = format_info(descriptor, installed.as_deref());

    write!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}
