//! Archive extraction with path traversal protection.
//!
//! Unpacks gzip- or zstd-compressed tarballs and zip files held in memory.
//! The container format is sniffed from the leading magic bytes, so the
//! source URL's extension is irrelevant.

use std::io::{Cursor, Read};
use std::path::{Component, Path};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Trait for extracting archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract `archive` into `dest_dir`.
    ///
    /// Returns the archive-relative paths of the extracted regular files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::UnknownFormat`]
    /// if the bytes are not a supported archive,
    /// [`ExtractionError::EmptyArchive`] if no files are found, and
    /// [`ExtractionError::Io`] or [`ExtractionError::Zip`] on read failures.
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip reader rejected the archive.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The bytes do not start with a recognised archive signature.
    #[error("unrecognised archive format")]
    UnknownFormat,

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Container formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.gz` / `.tgz`.
    TarGzip,
    /// `.tar.zst`.
    TarZstd,
    /// `.zip`.
    Zip,
}

impl ArchiveFormat {
    /// Identify the container format from leading magic bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::archive::extraction::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::sniff(&[0x1f, 0x8b, 0x08]), Some(ArchiveFormat::TarGzip));
    /// assert_eq!(ArchiveFormat::sniff(b"plain text"), None);
    /// ```
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(GZIP_MAGIC) {
            Some(Self::TarGzip)
        } else if bytes.starts_with(ZSTD_MAGIC) {
            Some(Self::TarZstd)
        } else if bytes.starts_with(ZIP_MAGIC) {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Default extractor covering every [`ArchiveFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoExtractor;

impl ArchiveExtractor for AutoExtractor {
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<String>, ExtractionError> {
        let format = ArchiveFormat::sniff(archive).ok_or(ExtractionError::UnknownFormat)?;
        log::debug!("extracting {format:?} archive into {}", dest_dir.display());
        let extracted = match format {
            ArchiveFormat::TarGzip => {
                unpack_tar(flate2::read::GzDecoder::new(Cursor::new(archive)), dest_dir)?
            }
            ArchiveFormat::TarZstd => {
                unpack_tar(zstd::Decoder::new(Cursor::new(archive))?, dest_dir)?
            }
            ArchiveFormat::Zip => unpack_zip(archive, dest_dir)?,
        };

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<String>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
            continue;
        }

        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        // `unpack_in` also refuses to write through symlinks that point
        // outside `dest_dir`.
        let unpacked = entry.unpack_in(dest_dir)?;
        if !unpacked {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if entry_type.is_file() {
            log::trace!("extracted {}", entry_path.display());
            extracted.push(entry_path.to_string_lossy().into_owned());
        }
    }

    Ok(extracted)
}

fn unpack_zip(archive: &[u8], dest_dir: &Path) -> Result<Vec<String>, ExtractionError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut extracted = Vec::new();

    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        let raw_name = file.name().to_owned();
        let entry_path = file
            .enclosed_name()
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: raw_name.clone(),
            })?;
        validate_entry_path(&entry_path)?;

        let dest_path = dest_dir.join(&entry_path);
        if file.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&dest_path)?;
        std::io::copy(&mut file, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                let permissions = std::fs::Permissions::from_mode((mode & 0o777) | 0o600);
                std::fs::set_permissions(&dest_path, permissions)?;
            }
        }

        log::trace!("extracted {raw_name}");
        extracted.push(entry_path.to_string_lossy().into_owned());
    }

    Ok(extracted)
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ArchiveEntry, tar_gz_archive};
    use rstest::rstest;
    use std::io::Write;
    use std::path::PathBuf;

    fn tar_zst_archive(name: &str, contents: &[u8]) -> Vec<u8> {
        let encoder = zstd::Encoder::new(Vec::new(), 0).expect("zstd encoder");
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents)
            .expect("append");
        let encoder = builder.into_inner().expect("tar finish");
        encoder.finish().expect("zstd finish")
    }

    fn zip_archive(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(contents).expect("write zip entry");
        writer.finish().expect("zip finish").into_inner()
    }

    #[test]
    fn extracts_tar_gz_preserving_layout() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz_archive(&[
            ArchiveEntry::file("tool-1.0/bin/tool.sh", b"#!/bin/sh\necho tool\n"),
            ArchiveEntry::file("tool-1.0/README.md", b"readme"),
        ]);

        let files = AutoExtractor
            .extract(&archive, temp.path())
            .expect("extract");

        assert_eq!(files.len(), 2);
        let script = std::fs::read_to_string(temp.path().join("tool-1.0/bin/tool.sh"))
            .expect("read script");
        assert!(script.contains("echo tool"));
    }

    #[test]
    fn extracts_tar_zst() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_zst_archive("hello.txt", b"hello world");

        let files = AutoExtractor
            .extract(&archive, temp.path())
            .expect("extract");

        assert_eq!(files, vec!["hello.txt"]);
        assert!(temp.path().join("hello.txt").exists());
    }

    #[test]
    fn extracts_zip() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = zip_archive("bin/tool.sh", b"#!/bin/sh\n");

        let files = AutoExtractor
            .extract(&archive, temp.path())
            .expect("extract");

        assert_eq!(files, vec!["bin/tool.sh"]);
        assert!(temp.path().join("bin").join("tool.sh").exists());
    }

    #[test]
    fn rejects_unknown_format() {
        let temp = tempfile::tempdir().expect("temp dir");
        let result = AutoExtractor.extract(b"definitely not an archive", temp.path());
        assert!(matches!(result, Err(ExtractionError::UnknownFormat)));
    }

    #[test]
    fn rejects_empty_archive() {
        let temp = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz_archive(&[]);
        let result = AutoExtractor.extract(&archive, temp.path());
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(&PathBuf::from(bad_path));
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(&PathBuf::from("gcx-1.2.0/lib/gcx-vm.sh")).is_ok());
    }
}
