//! Install receipts.
//!
//! A receipt is written after every successful install at
//! `<prefix>/var/formulary/receipts/<name>.json`. `list` reads receipts to
//! report installed versions. An unreadable or malformed receipt is treated
//! as absent.

use crate::error::{InstallerError, Result};
use crate::installer::{InstallResult, InstalledFile};
use crate::layout::PrefixLayout;
use crate::package_name::PackageName;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Where the installed files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptSource {
    /// The checksum-verified release archive.
    Archive,
    /// A development-head git checkout.
    Head,
}

/// Record of one completed install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Package name.
    pub name: PackageName,
    /// Installed version, or `HEAD` for head installs.
    pub version: String,
    /// Install source.
    pub source: ReceiptSource,
    /// Installed files.
    pub files: Vec<InstalledFile>,
}

impl InstallReceipt {
    /// Build a receipt from an install result.
    #[must_use]
    pub fn new(version: &str, source: ReceiptSource, result: &InstallResult) -> Self {
        let version = match source {
            ReceiptSource::Archive => version.to_owned(),
            ReceiptSource::Head => "HEAD".to_owned(),
        };
        Self {
            name: result.package.clone(),
            version,
            source,
            files: result.files.clone(),
        }
    }
}

/// Path of the receipt for `name`.
#[must_use]
pub fn receipt_path(layout: &PrefixLayout, name: &PackageName) -> Utf8PathBuf {
    layout.receipts_dir().join(format!("{name}.json"))
}

/// Persist `receipt` atomically.
///
/// # Errors
///
/// Returns [`InstallerError::Write`] if the receipt directory or file cannot
/// be written.
pub fn write_receipt(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<Utf8PathBuf> {
    let path = receipt_path(layout, &receipt.name);
    let dir = layout.receipts_dir();
    let write_error = |source| InstallerError::Write {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(&dir).map_err(write_error)?;
    let json = serde_json::to_vec_pretty(receipt)
        .map_err(|e| write_error(std::io::Error::other(e)))?;
    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
    temp.write_all(&json).map_err(write_error)?;
    temp.write_all(b"\n").map_err(write_error)?;
    temp.persist(&path).map_err(|e| write_error(e.error))?;
    log::debug!("wrote receipt {path}");
    Ok(path)
}

/// Read the receipt for `name`, if any.
#[must_use]
pub fn read_receipt(layout: &PrefixLayout, name: &PackageName) -> Option<InstallReceipt> {
    let path = receipt_path(layout, name);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("ignoring unreadable receipt {path}: {err}");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(receipt) => Some(receipt),
        Err(err) => {
            log::warn!("ignoring malformed receipt {path}: {err}");
            None
        }
    }
}
