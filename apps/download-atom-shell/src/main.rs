#![warn(clippy::pedantic)]

//! # download-atom-shell
//!
//! Installs a specific atom-shell release into a directory.
//!
//! ## Examples
//!
//! Install v0.20.0 into `./atom-shell`:
//! ```bash
//! download-atom-shell 0.20.0 --output-dir atom-shell
//! ```
//!
//! Install with debug symbols and rebuild native modules afterwards:
//! ```bash
//! download-atom-shell 0.20.0 --output-dir atom-shell --symbols --rebuild
//! ```
//!
//! Read options from a file:
//! ```bash
//! download-atom-shell --config atom-shell.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use download_atom_shell::{InstallOptions, InstallPhase, InstallSource, PluginError, install};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Downloads, caches and installs atom-shell release builds.
#[derive(Parser)]
#[command(
    name = "download-atom-shell",
    author,
    version,
    about = "Downloads, caches and installs atom-shell release builds",
    after_help = "\
ENVIRONMENT VARIABLES:
    ATOM_SHELL_DOWNLOAD_DIR     Download cache (default: <temp>/downloaded-atom-shell)
    ATOM_SHELL_REPO             Release repository (default: atom/atom-shell)
    ATOM_SHELL_REBUILD_TOOL     Native-module rebuild tool (default: apm)
    ATOM_SHELL_GITHUB_API       GitHub API base URL (default: https://api.github.com)
    GITHUB_TOKEN                Token for GitHub API requests
    RUST_LOG                    Log filter, overrides -v"
)]
struct Cli {
    /// Version to install, e.g. 0.20.0.
    #[arg(value_name = "VERSION")]
    shell_version: Option<String>,

    /// Directory the distribution is installed into.
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Directory downloaded versions are cached in.
    #[arg(long, value_name = "DIR", env = "ATOM_SHELL_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Install the build that carries debug symbols.
    #[arg(long)]
    symbols: bool,

    /// Rebuild native modules when the installed version changes.
    #[arg(long)]
    rebuild: bool,

    /// Tool invoked as `<tool> rebuild`.
    #[arg(long, value_name = "PATH", env = "ATOM_SHELL_REBUILD_TOOL")]
    rebuild_tool: Option<PathBuf>,

    /// GitHub repository releases are fetched from.
    #[arg(long, value_name = "OWNER/NAME", env = "ATOM_SHELL_REPO")]
    repo: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide = true, hide_env_values = true)]
    github_token: Option<String>,

    /// TOML file with an `[atom-shell]` table of options.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            version: self.shell_version.clone(),
            output_dir: self.output_dir.clone(),
            download_dir: self.download_dir.clone(),
            symbols: self.symbols.then_some(true),
            rebuild: self.rebuild.then_some(true),
            rebuild_tool: self.rebuild_tool.clone(),
            repo: self.repo.clone(),
            github_token: self.github_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints the error chain and returns the exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("download_atom_shell=info"),
        1 => EnvFilter::new("download_atom_shell=debug"),
        _ => EnvFilter::new("download_atom_shell=trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = match &cli.config {
        Some(path) => InstallOptions::load(path)
            .map_err(|e| PluginError::new(InstallPhase::Configure, e))?
            .merge(cli.options()),
        None => cli.options(),
    };

    let outcome = install(options).await?;
    match outcome.source {
        InstallSource::AlreadyInstalled => {
            debug!("atom-shell {} is up to date", outcome.version);
        }
        InstallSource::Cache | InstallSource::Downloaded => {
            info!("Installed atom-shell {}.", outcome.version);
        }
    }

    Ok(())
}
