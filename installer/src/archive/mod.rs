//! Archive retrieval, integrity verification, and extraction.
//!
//! # Sub-modules
//!
//! - [`download`] - Fetcher trait and `ureq` implementation.
//! - [`extraction`] - Format sniffing and traversal-safe unpacking.
//! - [`sha256_digest`] - SHA-256 digest newtype and hashing.
//! - [`tree`] - Scoped temporary directory holding an extracted archive.

pub mod download;
pub mod extraction;
pub mod sha256_digest;
pub mod tree;
