//! Post-install smoke test.
//!
//! Runs a package's test command through `sh -c` and checks that the
//! combined output mentions the package name. Failure is reported as a
//! boolean, never as an error.

use crate::package_name::PackageName;
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from spawning or waiting, and an error of kind
    /// [`io::ErrorKind::TimedOut`] when the command is killed for exceeding
    /// `timeout`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use formulary_installer::smoke::{CommandExecutor, SystemCommandExecutor};
    /// use std::time::Duration;
    ///
    /// let output = SystemCommandExecutor.run("sh", &["-c", "echo hi"], Duration::from_secs(5))?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], timeout: Duration) -> io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], timeout: Duration) -> io::Result<Output> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(status) = child.wait_timeout(timeout)? {
            let stdout = child
                .stdout
                .take()
                .map(io::read_to_string)
                .transpose()?
                .unwrap_or_default();
            let stderr = child
                .stderr
                .take()
                .map(io::read_to_string)
                .transpose()?
                .unwrap_or_default();
            return Ok(Output {
                status,
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            });
        }

        if let Err(err) = child.kill().and_then(|()| child.wait()) {
            log::debug!("could not reap timed-out {cmd} process: {err}");
        }
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{cmd} timed out after {} seconds", timeout.as_secs()),
        ))
    }
}

/// Run `command` through the shell and report whether its output mentions
/// `name`. The exit status is ignored: many tools print usage to stderr and
/// exit non-zero for `--help`.
pub fn run_smoke_test(
    executor: &dyn CommandExecutor,
    command: &str,
    name: &PackageName,
    timeout: Duration,
) -> bool {
    log::debug!("smoke test for {name}: {command}");
    match executor.run("sh", &["-c", command], timeout) {
        Ok(output) => {
            let passed = output_mentions(&output, name.as_str());
            if !passed {
                log::warn!(
                    "smoke test output for {name} did not mention the package (status {})",
                    output.status
                );
            }
            passed
        }
        Err(err) => {
            log::warn!("smoke test for {name} could not run: {err}");
            false
        }
    }
}

/// Return true when stdout or stderr contains `needle`.
#[must_use]
pub fn output_mentions(output: &Output, needle: &str) -> bool {
    [&output.stdout, &output.stderr]
        .into_iter()
        .any(|stream| String::from_utf8_lossy(stream).contains(needle))
}
