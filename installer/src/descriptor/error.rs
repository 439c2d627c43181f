//! Error types for descriptor parsing and validation.
//!
//! Each variant identifies the offending descriptor source and the
//! constraint that was violated.

use thiserror::Error;

/// Errors arising from malformed package descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The TOML document could not be deserialised.
    #[error("invalid descriptor {origin}: {reason}")]
    Syntax {
        /// Where the descriptor came from (file path or built-in name).
        origin: String,
        /// The deserialiser's message.
        reason: String,
    },

    /// The package name is empty or uses forbidden characters.
    #[error("invalid package name \"{name}\" in {origin}")]
    InvalidName {
        /// Where the descriptor came from.
        origin: String,
        /// The rejected name.
        name: String,
    },

    /// The descriptor declares no install actions.
    #[error("descriptor {origin} declares no install actions")]
    NoInstallActions {
        /// Where the descriptor came from.
        origin: String,
    },

    /// An install action path escapes its root.
    #[error("install action path \"{path}\" in {origin} is not allowed: {reason}")]
    InvalidActionPath {
        /// Where the descriptor came from.
        origin: String,
        /// The rejected path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// A required text field is blank.
    #[error("descriptor {origin} has an empty {field}")]
    EmptyField {
        /// Where the descriptor came from.
        origin: String,
        /// Name of the blank field.
        field: &'static str,
    },
}

/// Result type alias using [`DescriptorError`].
pub type Result<T> = std::result::Result<T, DescriptorError>;
