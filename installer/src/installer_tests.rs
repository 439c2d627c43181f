//! Unit tests for the installer stages.

use super::*;
use crate::archive::download::{DownloadError, MockArchiveFetcher};
use crate::archive::extraction::{AutoExtractor, MockArchiveExtractor};
use crate::descriptor::parse_descriptor;
use crate::test_utils::{
    ArchiveEntry, ExpectedCall, StaticFetcher, StubExecutor, sha256_hex, stdout_output,
    tar_gz_archive,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Prefix {
    _temp: TempDir,
    layout: PrefixLayout,
}

#[fixture]
fn prefix() -> Prefix {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().join("prefix")).expect("utf-8 temp dir");
    Prefix {
        _temp: temp,
        layout: PrefixLayout::new(root),
    }
}

fn gcx_archive() -> Vec<u8> {
    tar_gz_archive(&[
        ArchiveEntry::file("gcx-1.2.0/bin/gcx.sh", b"#!/bin/sh\necho gcx\n"),
        ArchiveEntry::file("gcx-1.2.0/lib/gcx-vm.sh", b"vm() { :; }\n"),
        ArchiveEntry::file("gcx-1.2.0/completions/_gcx", b"#compdef gcx\n"),
        ArchiveEntry::file("gcx-1.2.0/completions/gcx.bash", b"complete -F _gcx gcx\n"),
    ])
}

fn gcx_descriptor(sha256: &str) -> PackageDescriptor {
    let document = format!(
        r#"
name = "gcx"
version = "1.2.0"
description = "GCloud Context Switcher"
homepage = "https://example.test/gcx"
url = "https://example.test/gcx-1.2.0.tar.gz"
sha256 = "{sha256}"
license = "MIT"
dependencies = ["yq", "gum"]
test = "{{bin}}/gcx --help"

[[install]]
from = "bin/gcx.sh"
to = "bin/gcx"

[[install]]
from = "lib/gcx-vm.sh"
to = "lib/gcx/gcx-vm.sh"

[[install]]
from = "completions/gcx.bash"
to = "etc/bash_completion.d/gcx"

[[install]]
from = "completions/_gcx"
to = "share/zsh/site-functions/_gcx"
"#
    );
    parse_descriptor(&document, "test:gcx.toml").expect("valid descriptor")
}

fn installer<'a>(
    layout: &PrefixLayout,
    fetcher: &'a dyn ArchiveFetcher,
    extractor: &'a dyn ArchiveExtractor,
    executor: &'a dyn CommandExecutor,
) -> Installer<'a> {
    Installer::new(layout.clone(), fetcher, extractor, executor)
}

fn no_commands() -> StubExecutor {
    StubExecutor::new(Vec::new())
}

#[rstest]
fn fetch_returns_verified_archive(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive.clone());
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);

    let verified = installer.fetch(&descriptor).expect("fetch");

    assert_eq!(verified.bytes(), archive.as_slice());
    assert_eq!(verified.digest().as_str(), sha256_hex(&archive));
    assert_eq!(fetcher.calls(), 1);
}

#[rstest]
#[case::different_digest("def456")]
#[case::placeholder("PLACEHOLDER_SHA256")]
#[case::wrong_but_well_formed(&"0".repeat(64))]
fn corrupted_bytes_never_reach_extraction(prefix: Prefix, #[case] declared: &str) {
    let descriptor = gcx_descriptor(declared);
    let fetcher = StaticFetcher::serving(gcx_archive());
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().never();
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &extractor, &executor);

    let err = installer.fetch(&descriptor).expect_err("integrity failure");

    assert!(
        matches!(err, InstallerError::Integrity { ref expected, .. } if expected == declared),
        "unexpected: {err}"
    );
    assert_eq!(err.exit_code(), crate::error::EXIT_FETCH_FAILED);
}

#[rstest]
fn uppercase_checksum_still_matches(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive).to_uppercase());
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);

    assert!(installer.fetch(&descriptor).is_ok());
}

#[rstest]
fn network_failure_is_reported(prefix: Prefix) {
    let descriptor = gcx_descriptor("def456");
    let mut fetcher = MockArchiveFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == "https://example.test/gcx-1.2.0.tar.gz")
        .times(1)
        .returning(|url| {
            Err(DownloadError::NotFound {
                url: url.to_owned(),
            })
        });
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);

    let err = installer.fetch(&descriptor).expect_err("network failure");

    assert!(matches!(err, InstallerError::Network(DownloadError::NotFound { .. })));
}

#[cfg(unix)]
#[rstest]
fn install_copies_files_and_marks_binaries_executable(prefix: Prefix) {
    use std::os::unix::fs::PermissionsExt;

    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);

    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");
    let result = installer.install(&tree, &descriptor).expect("install");

    let layout = &prefix.layout;
    let kinds: Vec<FileKind> = result.files.iter().map(|file| file.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FileKind::Binary,
            FileKind::Library,
            FileKind::BashCompletion,
            FileKind::ZshCompletion,
        ]
    );
    assert_eq!(result.completions().count(), 2);

    let binary = layout.bin_dir().join("gcx");
    let mode = std::fs::metadata(&binary).expect("binary").permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    let library = layout.lib_dir().join("gcx").join("gcx-vm.sh");
    let mode = std::fs::metadata(&library).expect("library").permissions().mode();
    assert_eq!(mode & 0o111, 0);
    assert_eq!(
        std::fs::read_to_string(layout.zsh_completion_dir().join("_gcx")).expect("zsh"),
        "#compdef gcx\n"
    );
}

#[rstest]
fn install_is_idempotent(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    let first = installer.install(&tree, &descriptor).expect("first install");
    let second = installer.install(&tree, &descriptor).expect("second install");

    assert_eq!(first, second);
    let bin_entries = std::fs::read_dir(prefix.layout.bin_dir())
        .expect("bin dir")
        .count();
    assert_eq!(bin_entries, 1, "no temporary files should remain");
    assert_eq!(
        std::fs::read_to_string(prefix.layout.bin_dir().join("gcx")).expect("binary"),
        "#!/bin/sh\necho gcx\n"
    );
}

#[rstest]
fn missing_source_aborts_before_any_write(prefix: Prefix) {
    let archive = tar_gz_archive(&[
        ArchiveEntry::file("gcx-1.2.0/bin/gcx.sh", b"#!/bin/sh\n"),
        ArchiveEntry::file("gcx-1.2.0/lib/gcx-vm.sh", b""),
    ]);
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    let err = installer
        .install(&tree, &descriptor)
        .expect_err("missing source");

    assert!(
        matches!(err, InstallerError::MissingSourceFile { ref path, .. } if path == "completions/gcx.bash"),
        "unexpected: {err}"
    );
    assert_eq!(err.exit_code(), crate::error::EXIT_WRITE_FAILED);
    assert!(!prefix.layout.prefix().exists());
}

#[rstest]
fn unwritable_destination_is_a_write_error(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    std::fs::create_dir_all(prefix.layout.prefix()).expect("prefix");
    std::fs::write(prefix.layout.bin_dir(), b"not a directory").expect("block bin dir");
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    let err = installer.install(&tree, &descriptor).expect_err("write error");

    assert!(
        matches!(err, InstallerError::Write { ref path, .. } if path.ends_with("bin/gcx")),
        "unexpected: {err}"
    );
}

#[rstest]
fn cancellation_between_copies_leaves_no_partial_files(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let token = CancellationToken::new();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor)
        .with_cancellation(token.clone());
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");
    let tree_root = tree.root().to_owned();

    token.cancel();
    let err = installer.install(&tree, &descriptor).expect_err("cancelled");
    drop(tree);

    assert!(matches!(err, InstallerError::Cancelled { stage: "copy" }));
    assert!(!prefix.layout.prefix().exists());
    assert!(!tree_root.exists());
}

fn temp_files_in(dir: &Utf8Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(TEMP_FILE_PREFIX))
        .collect()
}

#[rstest]
fn write_failure_after_first_copy_leaves_no_partial_files(prefix: Prefix) {
    let archive = gcx_archive();
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let layout = &prefix.layout;
    std::fs::create_dir_all(layout.prefix()).expect("prefix");
    std::fs::write(layout.lib_dir(), b"not a directory").expect("block lib dir");
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    let err = installer.install(&tree, &descriptor).expect_err("write error");

    assert!(
        matches!(err, InstallerError::Write { ref path, .. } if path.ends_with("lib/gcx/gcx-vm.sh")),
        "unexpected: {err}"
    );
    assert_eq!(
        std::fs::read_to_string(layout.bin_dir().join("gcx")).expect("first copy"),
        "#!/bin/sh\necho gcx\n"
    );
    assert!(temp_files_in(&layout.bin_dir()).is_empty());
    assert!(temp_files_in(layout.prefix()).is_empty());
    assert_eq!(
        std::fs::read(layout.lib_dir()).expect("blocking file"),
        b"not a directory"
    );
}

#[cfg(unix)]
#[rstest]
fn symlinked_source_outside_archive_is_missing(prefix: Prefix) {
    let archive = tar_gz_archive(&[
        ArchiveEntry::symlink("bin/gcx.sh", "/etc/hostname"),
        ArchiveEntry::file("lib/gcx-vm.sh", b""),
        ArchiveEntry::file("completions/_gcx", b""),
        ArchiveEntry::file("completions/gcx.bash", b""),
    ]);
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    let err = installer.install(&tree, &descriptor).expect_err("escaping link");

    assert!(
        matches!(err, InstallerError::MissingSourceFile { ref path, .. } if path == "bin/gcx.sh"),
        "unexpected: {err}"
    );
    assert!(!prefix.layout.prefix().exists());
}

#[cfg(unix)]
#[rstest]
fn executable_library_files_keep_their_execute_bits(prefix: Prefix) {
    use std::os::unix::fs::PermissionsExt;

    let archive = tar_gz_archive(&[
        ArchiveEntry::executable("gcx-1.2.0/bin/gcx.sh", b"#!/bin/sh\n"),
        ArchiveEntry::executable("gcx-1.2.0/lib/gcx-vm.sh", b"#!/bin/sh\n"),
        ArchiveEntry::file("gcx-1.2.0/completions/_gcx", b""),
        ArchiveEntry::file("gcx-1.2.0/completions/gcx.bash", b""),
    ]);
    let descriptor = gcx_descriptor(&sha256_hex(&archive));
    let fetcher = StaticFetcher::serving(archive);
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let verified = installer.fetch(&descriptor).expect("fetch");
    let tree = installer.extract(&verified).expect("extract");

    installer.install(&tree, &descriptor).expect("install");

    let mode_of = |path: Utf8PathBuf| {
        std::fs::metadata(path).expect("installed file").permissions().mode() & 0o777
    };
    let layout = &prefix.layout;
    assert_eq!(mode_of(layout.lib_dir().join("gcx").join("gcx-vm.sh")), 0o755);
    assert_eq!(mode_of(layout.bash_completion_dir().join("gcx")), 0o644);
}

#[rstest]
fn cancellation_before_fetch_skips_download(prefix: Prefix) {
    let descriptor = gcx_descriptor("def456");
    let fetcher = StaticFetcher::serving(gcx_archive());
    let executor = no_commands();
    let token = CancellationToken::new();
    token.cancel();
    let installer =
        installer(&prefix.layout, &fetcher, &AutoExtractor, &executor).with_cancellation(token);

    let err = installer.fetch(&descriptor).expect_err("cancelled");

    assert_eq!(err.exit_code(), crate::error::EXIT_CANCELLED);
    assert_eq!(fetcher.calls(), 0);
}

#[rstest]
#[case::mentions_name("Usage: gcx <command>", true)]
#[case::silent("", false)]
fn verify_install_runs_expanded_test_command(
    prefix: Prefix,
    #[case] stdout: &str,
    #[case] expected: bool,
) {
    let descriptor = gcx_descriptor("def456");
    let fetcher = StaticFetcher::serving(Vec::new());
    let command = format!("{}/gcx --help", prefix.layout.bin_dir());
    let executor = StubExecutor::new(vec![ExpectedCall::shell(command, Ok(stdout_output(stdout)))]);
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);

    assert_eq!(installer.verify_install(&descriptor), expected);
    executor.assert_finished();
}

#[cfg(unix)]
#[test]
fn verify_install_runs_under_a_prefix_with_spaces() {
    use crate::smoke::SystemCommandExecutor;
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().join("Application Support").join("formulary"))
        .expect("utf-8 temp dir");
    let layout = PrefixLayout::new(root);
    std::fs::create_dir_all(layout.bin_dir()).expect("bin dir");
    let binary = layout.bin_dir().join("gcx");
    std::fs::write(&binary, "#!/bin/sh\necho 'usage: gcx <command>'\n").expect("write script");
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    let descriptor = gcx_descriptor("def456");
    let fetcher = StaticFetcher::serving(Vec::new());
    let executor = SystemCommandExecutor;
    let installer = installer(&layout, &fetcher, &AutoExtractor, &executor);

    assert!(installer.verify_install(&descriptor));
}

#[rstest]
fn check_dependencies_reports_absent_binaries(prefix: Prefix) {
    let descriptor = gcx_descriptor("def456");
    let fetcher = StaticFetcher::serving(Vec::new());
    let executor = no_commands();
    let installer = installer(&prefix.layout, &fetcher, &AutoExtractor, &executor);
    let empty = tempfile::tempdir().expect("temp dir");

    let missing = installer.check_dependencies_in(&descriptor, Some(empty.path().as_os_str()));

    let names: Vec<&str> = missing.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["gum", "yq"]);
}
