//! Error types for atom-shell installs.
//!
//! [`InstallError`] enumerates every way a single install attempt can fail.
//! None of them are retried; the [`Installer`](crate::installer::Installer)
//! aborts on the first one and wraps it in a [`PluginError`] that names the
//! phase it happened in.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Name reported in front of every surfaced error.
pub const PLUGIN_NAME: &str = "download-atom-shell";

/// Boxed error from an external collaborator (HTTP client, archive decoder).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of one step of an install.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Required options missing or malformed.
    #[error("{message}")]
    Configuration {
        /// What was wrong with the options.
        message: String,
    },

    /// The release host has no release for the tag.
    #[error("cannot find atom-shell {version} from GitHub")]
    ReleaseNotFound {
        /// The requested tag.
        version: String,
    },

    /// The release exists but lists no assets at all.
    #[error("atom-shell {version} release has no assets")]
    ReleaseHasNoAssets {
        /// The requested tag.
        version: String,
    },

    /// No asset of the release carries the expected name.
    #[error("cannot find {filename} in atom-shell {version} release")]
    AssetNotFound {
        /// The expected asset file name.
        filename: String,
        /// The requested tag.
        version: String,
    },

    /// The release host could not be queried.
    #[error("cannot look up atom-shell {version} releases")]
    ReleaseLookup {
        /// The requested tag.
        version: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// The asset download could not be started or the byte stream failed.
    #[error("cannot download atom-shell {version}")]
    Download {
        /// The requested tag.
        version: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// Writing into the cache directory failed.
    #[error("failed to write {}", path.display())]
    Write {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Unpacking the downloaded archive failed.
    #[error("failed to extract {}: {message}", archive.display())]
    Extraction {
        /// The archive being extracted.
        archive: PathBuf,
        /// Description of the failure.
        message: String,
        /// The underlying error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// Copying the cached version into the output directory failed.
    #[error("failed to install atom-shell {version} into {}", output_dir.display())]
    InstallCopy {
        /// The version being installed.
        version: String,
        /// The output directory.
        output_dir: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The native-module rebuild tool could not be run or failed.
    #[error("rebuild with {} failed: {message}", tool.display())]
    Rebuild {
        /// The rebuild tool that was invoked.
        tool: PathBuf,
        /// Exit status description or spawn failure.
        message: String,
        /// Spawn error, if the tool could not be started.
        #[source]
        source: Option<std::io::Error>,
    },
}

impl InstallError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Download` error.
    #[must_use]
    pub fn download(version: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Download {
            version: version.into(),
            source: source.into(),
        }
    }

    /// Creates a new `Write` error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new `Extraction` error without an underlying source.
    #[must_use]
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Extraction` error wrapping the decoder's error.
    #[must_use]
    pub fn extraction_with_source(
        archive: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns whether the requested asset could not be located, either
    /// because the release has no assets or because none matched.
    #[must_use]
    pub fn is_asset_not_found(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound { .. } | Self::ReleaseHasNoAssets { .. }
        )
    }
}

/// Step of the install state machine that can fail.
///
/// Checking the installed version and the cache cannot fail (an unreadable
/// marker counts as absent), so neither has a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Validating options.
    Configure,
    /// Finding the release and asset, downloading and unpacking it.
    Download,
    /// Copying the cache entry into the output directory.
    Install,
    /// Rebuilding native modules.
    Rebuild,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configure => "configure",
            Self::Download => "download",
            Self::Install => "install",
            Self::Rebuild => "rebuild",
        };
        f.write_str(name)
    }
}

/// The single error surfaced to callers of an install.
#[derive(Debug, Error)]
#[error("{plugin}: {phase} failed: {source}")]
pub struct PluginError {
    /// Always [`PLUGIN_NAME`].
    pub plugin: &'static str,
    /// Phase that failed.
    pub phase: InstallPhase,
    /// Cause of the failure.
    #[source]
    pub source: InstallError,
}

impl PluginError {
    /// Wraps `source` as a failure of `phase`.
    #[must_use]
    pub fn new(phase: InstallPhase, source: InstallError) -> Self {
        Self {
            plugin: PLUGIN_NAME,
            phase,
            source,
        }
    }

    /// The underlying install error.
    #[must_use]
    pub fn kind(&self) -> &InstallError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_displays_message() {
        let err = InstallError::configuration("version and outputDir option must be given!");
        assert_eq!(err.to_string(), "version and outputDir option must be given!");
    }

    #[test]
    fn asset_not_found_embeds_filename_and_version() {
        let err = InstallError::AssetNotFound {
            filename: "atom-shell-v0.20.0-linux-x64.zip".into(),
            version: "v0.20.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot find atom-shell-v0.20.0-linux-x64.zip in atom-shell v0.20.0 release"
        );
        assert!(err.is_asset_not_found());
    }

    #[test]
    fn missing_release_is_distinct_from_missing_asset() {
        let err = InstallError::ReleaseNotFound {
            version: "v9.9.9".into(),
        };
        assert_eq!(err.to_string(), "cannot find atom-shell v9.9.9 from GitHub");
        assert!(!err.is_asset_not_found());

        let err = InstallError::ReleaseHasNoAssets {
            version: "v9.9.9".into(),
        };
        assert!(err.is_asset_not_found());
    }

    #[test]
    fn extraction_displays_archive_and_message() {
        let err = InstallError::extraction("/tmp/cache/v1.0.0/atom-shell.zip", "bad header");
        assert_eq!(
            err.to_string(),
            "failed to extract /tmp/cache/v1.0.0/atom-shell.zip: bad header"
        );
    }

    #[test]
    fn plugin_error_names_plugin_and_phase() {
        let err = PluginError::new(
            InstallPhase::Download,
            InstallError::ReleaseNotFound {
                version: "v0.20.0".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "download-atom-shell: download failed: cannot find atom-shell v0.20.0 from GitHub"
        );
        assert!(matches!(err.kind(), InstallError::ReleaseNotFound { .. }));
    }

    #[test]
    fn phases_display_names() {
        let names: Vec<String> = [
            InstallPhase::Configure,
            InstallPhase::Download,
            InstallPhase::Install,
            InstallPhase::Rebuild,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["configure", "download", "install", "rebuild"]);
    }

    #[test]
    fn plugin_error_exposes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PluginError::new(
            InstallPhase::Install,
            InstallError::InstallCopy {
                version: "v0.20.0".into(),
                output_dir: PathBuf::from("out"),
                source: io,
            },
        );
        let source = std::error::Error::source(&err).expect("has source");
        assert!(source.to_string().contains("failed to install atom-shell v0.20.0"));
    }
}
