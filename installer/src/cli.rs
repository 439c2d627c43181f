//! CLI argument definitions for the formulary installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::ConfigOverrides;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Install shell tools from declarative package descriptors.
#[derive(Parser, Debug)]
#[command(name = "formulary")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install shell tools from declarative package descriptors.\n\n",
    "Each package is described by a TOML descriptor naming a release archive, ",
    "its SHA-256 checksum, and the files to copy. The installer downloads the ",
    "archive, verifies the checksum, copies scripts, libraries, and shell ",
    "completions under the install prefix, and runs the package's smoke test.\n\n",
    "Declared dependencies are checked on PATH after install; missing ones are ",
    "reported as warnings and never fail the command.",
))]
#[command(after_help = concat!(
    "EXIT CODES:\n",
    "  0    Installed (possibly with dependency warnings)\n",
    "  1    Smoke test did not confirm the install\n",
    "  2    Download, checksum, or extraction failure\n",
    "  3    Filesystem write failure or missing source file\n",
    "  4    Unknown package, configuration, or git failure\n",
    "  130  Cancelled\n\n",
    "EXAMPLES:\n",
    "  Install a package into the default prefix:\n",
    "    $ formulary install gcx\n\n",
    "  Install the development head into a custom prefix:\n",
    "    $ formulary install gcx --head --prefix ~/.local\n\n",
    "  Show package details and caveats:\n",
    "    $ formulary info gcx\n\n",
    "  List packages as JSON:\n",
    "    $ formulary list --json",
))]
pub struct Cli {
    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download, verify, and install a package.
    Install(InstallArgs),

    /// Show package details and caveats.
    Info(InfoArgs),

    /// List catalog packages with installed status.
    List(ListArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct InstallArgs {
    /// Package to install.
    #[arg(value_name = "PACKAGE")]
    pub name: String,

    /// Install the development head from git instead of the release archive.
    #[arg(long)]
    pub head: bool,

    /// Install prefix [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Extra directory of package descriptors (can be repeated).
    #[arg(short, long, value_name = "DIR")]
    pub catalog: Vec<Utf8PathBuf>,

    /// Skip the post-install smoke test.
    #[arg(long)]
    pub skip_test: bool,
}

/// Arguments for the info command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct InfoArgs {
    /// Package to describe.
    #[arg(value_name = "PACKAGE")]
    pub name: String,

    /// Prefix whose receipts are consulted [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Extra directory of package descriptors (can be repeated).
    #[arg(short, long, value_name = "DIR")]
    pub catalog: Vec<Utf8PathBuf>,
}

/// Arguments for the list command.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,

    /// Prefix whose receipts are consulted [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Extra directory of package descriptors (can be repeated).
    #[arg(short, long, value_name = "DIR")]
    pub catalog: Vec<Utf8PathBuf>,
}

impl InstallArgs {
    /// Creates arguments for installing `name` with every flag disabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::cli::InstallArgs;
    ///
    /// let args = InstallArgs::new("gcx");
    /// assert_eq!(args.name, "gcx");
    /// assert!(!args.head);
    /// assert!(args.catalog.is_empty());
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: false,
            prefix: None,
            catalog: Vec::new(),
            skip_test: false,
        }
    }
}

impl Command {
    /// Configuration overrides carried by the subcommand's flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use formulary_installer::cli::{Command, ListArgs};
    ///
    /// let command = Command::List(ListArgs {
    ///     prefix: Some(Utf8PathBuf::from("/opt/tools")),
    ///     ..ListArgs::default()
    /// });
    /// let overrides = command.config_overrides();
    /// assert_eq!(overrides.prefix, Some(Utf8PathBuf::from("/opt/tools")));
    /// ```
    #[must_use]
    pub fn config_overrides(&self) -> ConfigOverrides {
        let (prefix, catalog) = match self {
            Self::Install(args) => (&args.prefix, &args.catalog),
            Self::Info(args) => (&args.prefix, &args.catalog),
            Self::List(args) => (&args.prefix, &args.catalog),
        };
        ConfigOverrides {
            prefix: prefix.clone(),
            catalog_dirs: catalog.clone(),
        }
    }
}

impl Cli {
    /// Log level filter implied by `-v` and `-q`.
    ///
    /// `RUST_LOG` still takes precedence when set.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
