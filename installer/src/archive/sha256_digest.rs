//! SHA-256 digests of downloaded archives.
//!
//! Digests are held in canonical form (64 lowercase hex characters).
//! Descriptor checksums are compared against them without regard to hex
//! case, so an uppercase checksum still verifies.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HEX_LEN: usize = 64;

/// Why a string is not a SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDigest {
    /// Wrong number of characters.
    #[error("expected 64 hex characters, found {found}")]
    Length {
        /// Characters present.
        found: usize,
    },
    /// A character outside `[0-9a-fA-F]`.
    #[error("'{character}' is not a hex digit")]
    NotHex {
        /// The first offending character.
        character: char,
    },
}

/// Canonical lowercase hex SHA-256 digest.
///
/// # Examples
///
/// ```
/// use formulary_installer::archive::sha256_digest::Sha256Digest;
///
/// let digest: Sha256Digest = "AB".repeat(32).parse().expect("valid digest");
/// assert_eq!(digest.as_str(), "ab".repeat(32));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Hash `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::archive::sha256_digest::Sha256Digest;
    ///
    /// let digest = Sha256Digest::of_bytes(b"");
    /// assert!(digest.as_str().starts_with("e3b0c442"));
    /// ```
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return true when `declared` names this digest, ignoring hex case.
    /// Anything that is not a well-formed digest never matches.
    #[must_use]
    pub fn matches(&self, declared: &str) -> bool {
        declared.len() == HEX_LEN && self.0.eq_ignore_ascii_case(declared)
    }
}

impl FromStr for Sha256Digest {
    type Err = InvalidDigest;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(character) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(InvalidDigest::NotHex { character });
        }
        if value.len() != HEX_LEN {
            return Err(InvalidDigest::Length { found: value.len() });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
