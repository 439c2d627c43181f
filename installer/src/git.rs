//! Git checkouts for head installs.
//!
//! A head install clones the package's development branch into a scoped
//! temporary directory instead of downloading a release archive. The clone
//! is shallow and bounded by a timeout so network trouble cannot hang the
//! installer.

use crate::archive::tree::{ExtractedTree, new_temp_dir};
use crate::descriptor::HeadSource;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const CHECKOUT_DIR: &str = "checkout";

/// Source of development-head checkouts.
#[cfg_attr(test, mockall::automock)]
pub trait HeadFetcher {
    /// Check out `head` into a fresh temporary tree.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Git`] if the clone fails or times out.
    fn checkout(&self, head: &HeadSource) -> Result<ExtractedTree>;
}

/// Clones with the `git` binary.
#[derive(Debug, Clone, Copy)]
pub struct GitHeadFetcher {
    timeout: Duration,
}

impl GitHeadFetcher {
    /// Create a fetcher whose clones are killed after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Time allowed for one clone.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HeadFetcher for GitHeadFetcher {
    fn checkout(&self, head: &HeadSource) -> Result<ExtractedTree> {
        let temp = new_temp_dir()?;
        let target = Utf8PathBuf::from_path_buf(temp.path().join(CHECKOUT_DIR)).map_err(|path| {
            InstallerError::Git {
                operation: "clone",
                message: format!("checkout path is not valid UTF-8: {}", path.display()),
            }
        })?;

        let args = clone_args(head, &target);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = run_git_with_timeout(&arg_refs, self.timeout, "clone")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallerError::Git {
                operation: "clone",
                message: stderr.trim().to_owned(),
            });
        }

        log::debug!("cloned {} ({}) into {target}", head.url, head.branch);
        Ok(ExtractedTree::from_parts(temp, target))
    }
}

/// Arguments for a shallow single-branch clone of `head` into `target`.
fn clone_args(head: &HeadSource, target: &Utf8Path) -> Vec<String> {
    vec![
        "clone".to_owned(),
        "--depth".to_owned(),
        "1".to_owned(),
        "--branch".to_owned(),
        head.branch.clone(),
        "--".to_owned(),
        head.url.clone(),
        target.to_string(),
    ]
}

/// Runs a git command with a timeout.
fn run_git_with_timeout(
    args: &[&str],
    timeout: Duration,
    operation: &'static str,
) -> Result<Output> {
    let mut child = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| InstallerError::Git {
            operation,
            message: format!("failed to run git: {e}"),
        })?;

    match child.wait_timeout(timeout)? {
        Some(status) => {
            let stdout = child
                .stdout
                .take()
                .map(std::io::read_to_string)
                .transpose()?
                .unwrap_or_default();
            let stderr = child
                .stderr
                .take()
                .map(std::io::read_to_string)
                .transpose()?
                .unwrap_or_default();

            Ok(Output {
                status,
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            })
        }
        None => {
            if let Err(err) = child.kill().and_then(|()| child.wait()) {
                log::debug!("could not reap timed-out git process: {err}");
            }
            Err(InstallerError::Git {
                operation,
                message: format!("operation timed out after {} seconds", timeout.as_secs()),
            })
        }
    }
}
