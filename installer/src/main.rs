//! Formulary installer CLI entrypoint.
//!
//! This binary resolves configuration, loads the package catalog, and runs
//! the `install`, `info`, and `list` commands. After an install it prints
//! the installed files, any caveats, and a `PATH` hint when the prefix `bin`
//! directory is not on the search path.

use clap::Parser;
use formulary_installer::archive::download::HttpFetcher;
use formulary_installer::archive::extraction::AutoExtractor;
use formulary_installer::cancel::CancellationToken;
use formulary_installer::catalog::Catalog;
use formulary_installer::cli::{Cli, Command, InstallArgs};
use formulary_installer::config::InstallerConfig;
use formulary_installer::dirs::SystemBaseDirs;
use formulary_installer::error::Result;
use formulary_installer::git::GitHeadFetcher;
use formulary_installer::installer::Installer;
use formulary_installer::layout::PrefixLayout;
use formulary_installer::list::{run_info, run_list};
use formulary_installer::output::{
    format_install_report, is_directory_in_path, path_instructions, write_stderr_line,
};
use formulary_installer::pipeline::{InstallRequest, run_install};
use formulary_installer::receipt::ReceiptSource;
use formulary_installer::smoke::SystemCommandExecutor;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let token = CancellationToken::new();
    interrupt::bind(&token);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &token, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Initialises `env_logger` at the level implied by `-v`/`-q`; `RUST_LOG`
/// overrides it.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(
    cli: &Cli,
    token: &CancellationToken,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32> {
    let dirs = SystemBaseDirs::new();
    let config = InstallerConfig::resolve(&dirs, &cli.command.config_overrides())?;
    let catalog = load_catalog(&config)?;
    let layout = PrefixLayout::new(config.resolve_prefix(&dirs)?);
    log::debug!(
        "prefix {}, {} package(s) in catalog",
        layout.prefix(),
        catalog.len()
    );

    match &cli.command {
        Command::Install(args) => {
            let context = InstallContext {
                config: &config,
                catalog: &catalog,
                layout,
                token,
                quiet: cli.quiet,
            };
            install(&context, args, stderr)
        }
        Command::Info(args) => run_info(&catalog, &layout, &args.name, stdout).map(|()| 0),
        Command::List(args) => run_list(&catalog, &layout, args.json, stdout).map(|()| 0),
    }
}

/// Built-in descriptors followed by each configured catalog directory.
fn load_catalog(config: &InstallerConfig) -> Result<Catalog> {
    let mut catalog = Catalog::builtin()?;
    for dir in config.catalog_dirs() {
        log::debug!("loading descriptors from {dir}");
        catalog.load_dir(dir)?;
    }
    Ok(catalog)
}

struct InstallContext<'a> {
    config: &'a InstallerConfig,
    catalog: &'a Catalog,
    layout: PrefixLayout,
    token: &'a CancellationToken,
    quiet: bool,
}

/// Head clones are network operations, so they share the download timeout.
fn head_fetcher(config: &InstallerConfig) -> GitHeadFetcher {
    GitHeadFetcher::new(config.download_timeout())
}

/// Runs one install and prints its report, caveats, and `PATH` hint.
fn install(context: &InstallContext<'_>, args: &InstallArgs, stderr: &mut dyn Write) -> Result<i32> {
    let descriptor = context.catalog.get(&args.name)?;
    let fetcher = HttpFetcher::with_timeout(context.config.download_timeout());
    let executor = SystemCommandExecutor;
    let head_fetcher = head_fetcher(context.config);
    let installer = Installer::new(
        context.layout.clone(),
        &fetcher,
        &AutoExtractor,
        &executor,
    )
    .with_cancellation(context.token.clone())
    .with_test_timeout(context.config.test_timeout());

    let request = InstallRequest {
        package: descriptor,
        head: args.head,
        skip_test: args.skip_test,
        quiet: context.quiet,
    };
    let search_path = std::env::var_os("PATH");
    let report = run_install(
        &installer,
        &head_fetcher,
        &request,
        search_path.as_deref(),
        stderr,
    )?;

    let version = match report.source {
        ReceiptSource::Archive => descriptor.version(),
        ReceiptSource::Head => "HEAD",
    };
    if context.quiet {
        for warning in &report.warnings {
            write_stderr_line(stderr, format!("Warning: {warning}"));
        }
        return Ok(report.exit_code());
    }

    write_stderr_line(stderr, format_install_report(&report, version));
    if let Some(caveats) = descriptor.caveats() {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, caveats);
    }
    let bin_dir = context.layout.bin_dir();
    if report.result.files.iter().any(|file| file.path.starts_with(&bin_dir))
        && !is_directory_in_path(&bin_dir, search_path.as_deref())
    {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, path_instructions(&bin_dir));
    }

    Ok(report.exit_code())
}

fn exit_code_for_run_result(result: Result<i32>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}

/// SIGINT handling: the first interrupt cancels the running install.
#[cfg(unix)]
mod interrupt {
    use formulary_installer::cancel::CancellationToken;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, OnceLock};

    static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    extern "C" fn on_sigint(_signal: libc::c_int) {
        if let Some(flag) = FLAG.get() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn bind(token: &CancellationToken) {
        if FLAG.set(token.flag()).is_err() {
            return;
        }
        let handler = on_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only performs an atomic store, which is
        // async-signal-safe, and `FLAG` is initialised before installation.
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            log::warn!("could not install SIGINT handler; Ctrl-C will abort immediately");
        }
    }
}

#[cfg(not(unix))]
mod interrupt {
    use formulary_installer::cancel::CancellationToken;

    pub(crate) fn bind(_token: &CancellationToken) {}
}
