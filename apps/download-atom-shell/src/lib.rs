#![warn(clippy::pedantic)]

//! # download-atom-shell
//!
//! Downloads a release build of atom-shell from GitHub, keeps an extracted
//! copy per version in a download cache, and installs it into an output
//! directory. Optionally rebuilds native modules after the installed version
//! changes.
//!
//! ```rust,ignore
//! use download_atom_shell::{InstallOptions, install};
//!
//! let outcome = install(InstallOptions {
//!     version: Some("0.20.0".into()),
//!     output_dir: Some("atom-shell".into()),
//!     ..InstallOptions::default()
//! })
//! .await?;
//! println!("installed {}", outcome.version);
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod download;
pub mod errors;
pub mod installer;
pub mod platform;
pub mod progress;
pub mod rebuild;
pub mod release;
pub mod resolver;
pub mod version;

pub use config::{InstallOptions, InstallRequest};
pub use errors::{InstallError, InstallPhase, PLUGIN_NAME, PluginError};
pub use installer::{InstallOutcome, InstallSource, Installer, install};
pub use platform::{Platform, Target};
pub use release::{Asset, AssetDownload, GithubReleases, Release, ReleaseHost};
pub use version::ShellVersion;
