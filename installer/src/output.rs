//! Output formatting for the installer CLI.
//!
//! Renders install summaries, package details for `info`, and the search
//! path hint shown when the prefix `bin` directory is not on `PATH`.

use crate::descriptor::PackageDescriptor;
use crate::layout::FileKind;
use crate::pipeline::{InstallReport, InstallStatus};
use camino::Utf8Path;
use std::ffi::OsStr;
use std::io::Write;

/// Write one line to `stderr`, ignoring failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Summary printed after an install completes.
///
/// # Examples
///
/// ```
/// use formulary_installer::output::success_message;
///
/// assert_eq!(
///     success_message("gcx", "1.2.0", 7),
///     "Installed gcx 1.2.0 (7 files)"
/// );
/// ```
#[must_use]
pub fn success_message(name: &str, version: &str, count: usize) -> String {
    let plural = if count == 1 { "file" } else { "files" };
    format!("Installed {name} {version} ({count} {plural})")
}

/// Full post-install report: summary, per-kind counts, and warnings.
#[must_use]
pub fn format_install_report(report: &InstallReport, version: &str) -> String {
    let mut text = success_message(
        report.result.package.as_str(),
        version,
        report.result.files.len(),
    );
    for kind in [
        FileKind::Binary,
        FileKind::Library,
        FileKind::BashCompletion,
        FileKind::ZshCompletion,
        FileKind::FishCompletion,
        FileKind::Other,
    ] {
        for file in report.result.files_of_kind(kind) {
            text.push_str(&format!("\n  {kind}: {}", file.path));
        }
    }
    if report.status() == InstallStatus::InstalledWithWarnings {
        for warning in &report.warnings {
            text.push_str(&format!("\nWarning: {warning}"));
        }
    }
    text
}

/// Package details for `formulary info`.
#[must_use]
pub fn format_info(descriptor: &PackageDescriptor, installed_version: Option<&str>) -> String {
    let mut text = format!(
        "{} {}\n{}\n{}\n",
        descriptor.name(),
        descriptor.version(),
        descriptor.description(),
        descriptor.homepage()
    );
    text.push_str(&format!("License: {}\n", descriptor.license()));
    text.push_str(&format!("Source: {}\n", descriptor.source_url()));
    if let Some(head) = descriptor.head() {
        text.push_str(&format!("Head: {} ({})\n", head.url, head.branch));
    }
    if !descriptor.dependencies().is_empty() {
        let deps: Vec<&str> = descriptor
            .dependencies()
            .iter()
            .map(|dep| dep.as_str())
            .collect();
        text.push_str(&format!("Dependencies: {}\n", deps.join(", ")));
    }
    match installed_version {
        Some(version) => text.push_str(&format!("Installed: {version}\n")),
        None => text.push_str("Not installed\n"),
    }
    text.push_str("Files:\n");
    for action in descriptor.install_actions() {
        text.push_str(&format!("  {action}\n"));
    }
    if let Some(caveats) = descriptor.caveats() {
        text.push_str(&format!("\nCaveats:\n{caveats}\n"));
    }
    text
}

/// Return true when `dir` appears in the `PATH`-style list.
#[must_use]
pub fn is_directory_in_path(dir: &Utf8Path, search_path: Option<&OsStr>) -> bool {
    search_path.is_some_and(|path| std::env::split_paths(path).any(|p| p == dir.as_std_path()))
}

/// Returns instructions for adding a directory to `PATH`.
#[must_use]
pub fn path_instructions(bin_dir: &Utf8Path) -> String {
    format!(
        concat!(
            "Add the following to your shell profile (~/.bashrc or ~/.zshrc):\n",
            "  export PATH=\"{}:$PATH\""
        ),
        bin_dir
    )
}
