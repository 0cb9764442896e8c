//! The install state machine.
//!
//! An install walks through these steps strictly in order, aborting on the
//! first failure:
//!
//! 1. **Check current**: if `<output_dir>/version` already names the
//!    requested version, stop. Nothing else is touched.
//! 2. **Check cache**: if `<download_dir>/<tag>/version` exists, skip to 4.
//! 3. **Download**: look up the release, resolve the asset for the target
//!    platform, stream it into the cache and unpack it.
//! 4. **Install**: replace the output directory with a copy of the cache
//!    entry.
//! 5. **Rebuild**: when requested, run the rebuild tool. Only reachable when
//!    the previously installed version differs from the requested one.
//!
//! Installs sharing a download directory must be serialized by the caller;
//! no locking is done here.

use std::io;

use tracing::{debug, info};

use crate::archive::Extractor;
use crate::cache;
use crate::config::{InstallOptions, InstallRequest};
use crate::download::save_to_cache;
use crate::errors::{InstallError, InstallPhase, PluginError};
use crate::platform::Target;
use crate::rebuild::run_rebuild;
use crate::release::{GithubReleases, ReleaseHost};
use crate::resolver;
use crate::version::ShellVersion;

/// Where the installed files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallSource {
    /// The output directory already held the requested version.
    AlreadyInstalled,
    /// Copied from an existing cache entry.
    Cache,
    /// Downloaded, unpacked into the cache, then copied.
    Downloaded,
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The version now installed.
    pub version: ShellVersion,
    /// Version recorded in the output directory before the install, if any.
    pub previous: Option<String>,
    pub source: InstallSource,
    /// Whether the rebuild tool ran.
    pub rebuilt: bool,
}

/// Performs one install request against a release host.
#[derive(Debug)]
pub struct Installer<H = GithubReleases> {
    request: InstallRequest,
    host: H,
    target: Target,
    extractor: Extractor,
}

impl Installer<GithubReleases> {
    /// Creates an installer that fetches releases from GitHub.
    ///
    /// # Errors
    ///
    /// Returns a configuration failure if the HTTP client cannot be built.
    pub fn new(request: InstallRequest) -> Result<Self, PluginError> {
        let host = GithubReleases::new(request.repo.clone(), request.github_token.as_deref())
            .map_err(|e| {
                PluginError::new(
                    InstallPhase::Configure,
                    InstallError::configuration(format!("cannot create GitHub client: {e}")),
                )
            })?;
        Ok(Self::with_host(request, host))
    }
}

impl<H: ReleaseHost> Installer<H> {
    /// Creates an installer using `host` for the running platform.
    #[must_use]
    pub fn with_host(request: InstallRequest, host: H) -> Self {
        Self {
            request,
            host,
            target: Target::host(),
            extractor: Extractor::for_host(),
        }
    }

    /// Installs for `target` instead of the running platform.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Unpacks archives with `extractor` instead of the platform default.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn request(&self) -> &InstallRequest {
        &self.request
    }

    /// Runs the install.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] naming the phase that failed. The output
    /// directory is untouched by failures before the install phase; a failed
    /// download may leave an incomplete cache entry that later runs ignore.
    pub async fn run(&self) -> Result<InstallOutcome, PluginError> {
        let version = &self.request.version;
        let output_dir = &self.request.output_dir;
        let download_dir = &self.request.download_dir;

        let previous = cache::installed_version(output_dir);
        if previous.as_deref().is_some_and(|p| version.matches(p)) {
            debug!(
                "atom-shell {version} is already installed in {}",
                output_dir.display()
            );
            return Ok(InstallOutcome {
                version: version.clone(),
                previous,
                source: InstallSource::AlreadyInstalled,
                rebuilt: false,
            });
        }

        let source = if cache::is_cached(download_dir, version) {
            debug!(
                "Using cached atom-shell {version} from {}",
                download_dir.display()
            );
            InstallSource::Cache
        } else {
            self.fetch()
                .await
                .map_err(|e| PluginError::new(InstallPhase::Download, e))?;
            InstallSource::Downloaded
        };

        self.copy_into_output()
            .await
            .map_err(|e| PluginError::new(InstallPhase::Install, e))?;

        // `previous` cannot name the requested version past the check above.
        let rebuilt = if self.request.rebuild {
            info!("Rebuilding native modules for new atom-shell version {version}.");
            run_rebuild(&self.request.rebuild_tool)
                .await
                .map_err(|e| PluginError::new(InstallPhase::Rebuild, e))?;
            true
        } else {
            false
        };

        Ok(InstallOutcome {
            version: version.clone(),
            previous,
            source,
            rebuilt,
        })
    }

    /// Looks up, downloads and unpacks the requested version into the cache.
    async fn fetch(&self) -> Result<(), InstallError> {
        let version = &self.request.version;
        let tag = version.as_tag();

        let releases = self
            .host
            .list_releases(tag)
            .await
            .map_err(|source| InstallError::ReleaseLookup {
                version: tag.to_string(),
                source,
            })?;
        let asset = resolver::resolve(&releases, version, &self.target, self.request.symbols)?;

        let download = self
            .host
            .download_asset(asset)
            .await
            .map_err(|e| InstallError::download(tag, e))?;

        info!("Downloading atom-shell {version}.");
        save_to_cache(
            download,
            &self.request.download_dir,
            version,
            self.extractor,
        )
        .await?;
        Ok(())
    }

    async fn copy_into_output(&self) -> Result<(), InstallError> {
        let output_dir = self.request.output_dir.clone();
        let download_dir = self.request.download_dir.clone();
        let version = self.request.version.clone();

        let task_output = output_dir.clone();
        tokio::task::spawn_blocking(move || cache::install(&task_output, &download_dir, &version))
            .await
            .map_err(|e| InstallError::InstallCopy {
                version: self.request.version.to_string(),
                output_dir,
                source: io::Error::other(e),
            })?
    }
}

/// Validates `options` and installs the requested version from GitHub.
///
/// # Errors
///
/// Returns a [`PluginError`] if the options are invalid or any install phase
/// fails.
pub async fn install(options: InstallOptions) -> Result<InstallOutcome, PluginError> {
    let request = InstallRequest::from_options(options)
        .map_err(|e| PluginError::new(InstallPhase::Configure, e))?;
    Installer::new(request)?.run().await
}
