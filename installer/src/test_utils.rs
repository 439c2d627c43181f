//! Shared test utilities for the installer crate.

use crate::archive::download::{ArchiveFetcher, DownloadError};
use crate::smoke::CommandExecutor;
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Output};
use std::time::Duration;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with the given stdout.
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g. `sh`).
    pub cmd: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `sh -c <script>` and answer with `result`.
    pub fn shell(script: impl Into<String>, result: io::Result<Output>) -> Self {
        Self {
            cmd: "sh",
            args: vec!["-c".to_owned(), script.into()],
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], _timeout: Duration) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        let actual: Vec<String> = args.iter().map(|arg| (*arg).to_owned()).collect();
        assert_eq!(call.args, actual);

        call.result
    }
}

/// Serves a fixed body for every request and counts the calls made.
#[derive(Debug)]
pub struct StaticFetcher {
    body: Result<Vec<u8>, String>,
    calls: Cell<usize>,
}

impl StaticFetcher {
    /// Answer every request with `body`.
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            body: Ok(body),
            calls: Cell::new(0),
        }
    }

    /// Fail every request with an HTTP error carrying `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            body: Err(reason.to_owned()),
            calls: Cell::new(0),
        }
    }

    /// Number of `fetch` calls observed.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArchiveFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        self.calls.set(self.calls.get() + 1);
        match &self.body {
            Ok(bytes) => Ok(bytes.clone()),
            Err(reason) => Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: reason.clone(),
            }),
        }
    }
}

/// One entry of an in-memory test archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Archive-relative path.
    pub path: String,
    /// File contents.
    pub contents: Vec<u8>,
    /// Unix mode bits recorded in the header.
    pub mode: u32,
    /// Link target when the entry is a symbolic link.
    pub link_target: Option<String>,
}

impl ArchiveEntry {
    /// A regular, non-executable file.
    pub fn file(path: &str, contents: &[u8]) -> Self {
        Self {
            path: path.to_owned(),
            contents: contents.to_vec(),
            mode: 0o644,
            link_target: None,
        }
    }

    /// A regular file with the executable bit already set.
    pub fn executable(path: &str, contents: &[u8]) -> Self {
        Self {
            mode: 0o755,
            ..Self::file(path, contents)
        }
    }

    /// A symbolic link at `path` pointing to `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            mode: 0o777,
            link_target: Some(target.to_owned()),
            ..Self::file(path, b"")
        }
    }
}

/// Build a gzip-compressed tarball from `entries`.
pub fn tar_gz_archive(entries: &[ArchiveEntry]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mode(entry.mode);
        if let Some(target) = &entry.link_target {
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            builder
                .append_link(&mut header, &entry.path, target)
                .expect("append tar link");
            continue;
        }
        header.set_size(entry.contents.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, &entry.path, entry.contents.as_slice())
            .expect("append tar entry");
    }
    let encoder = builder.into_inner().expect("finish tar");
    encoder.finish().expect("finish gzip")
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
