//! Release host access.
//!
//! The installer only needs two capabilities from wherever releases live:
//! listing the releases for a tag and opening a byte stream for one of their
//! assets. [`ReleaseHost`] captures exactly that; [`GithubReleases`] is the
//! production implementation backed by the GitHub REST API.
//!
//! ## Environment Variables
//!
//! - `ATOM_SHELL_REPO`: repository to read releases from (default `atom/atom-shell`)
//! - `ATOM_SHELL_GITHUB_API`: API base URL (default `https://api.github.com`)
//! - `GITHUB_TOKEN`: optional token sent as a bearer credential

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::errors::BoxError;

/// Repository releases are fetched from unless configured otherwise.
pub const DEFAULT_REPO: &str = "atom/atom-shell";

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "ATOM_SHELL_GITHUB_API";

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = "download-atom-shell";

/// Connect timeout in seconds. No overall timeout is applied to transfers.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    /// Descriptor the host needs to download the asset (the API URL on GitHub).
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// An opened asset download.
pub struct AssetDownload {
    /// Declared length of the body, when the host provides one.
    pub content_length: Option<u64>,
    /// The body, chunk by chunk.
    pub body: BoxStream<'static, std::io::Result<Bytes>>,
}

impl std::fmt::Debug for AssetDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetDownload")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Where releases are listed and downloaded from.
pub trait ReleaseHost {
    /// Lists the releases whose tag equals `tag`.
    ///
    /// An unknown tag yields an empty list, not an error.
    fn list_releases(
        &self,
        tag: &str,
    ) -> impl Future<Output = Result<Vec<Release>, BoxError>> + Send;

    /// Opens a download stream for `asset`.
    fn download_asset(
        &self,
        asset: &Asset,
    ) -> impl Future<Output = Result<AssetDownload, BoxError>> + Send;
}

/// Releases of a GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: reqwest::Client,
    api_base: String,
    repo: String,
}

impl GithubReleases {
    /// Creates a client for `repo` (`owner/name`).
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(repo: impl Into<String>, token: Option<&str>) -> Result<Self, BoxError> {
        Self::with_api_base(api_base_from_env(), repo, token)
    }

    /// Creates a client talking to a specific API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn with_api_base(
        api_base: impl Into<String>,
        repo: impl Into<String>,
        token: Option<&str>,
    ) -> Result<Self, BoxError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            repo: repo.into(),
        })
    }

    /// URL of the release lookup for `tag`.
    #[must_use]
    pub fn release_url(&self, tag: &str) -> String {
        format!("{}/repos/{}/releases/tags/{tag}", self.api_base, self.repo)
    }
}

/// Reads the API base from the environment; empty values are treated as unset.
fn api_base_from_env() -> String {
    std::env::var(API_BASE_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Turns a non-success status into an error naming the URL.
fn http_error(status: StatusCode, url: &str) -> BoxError {
    match status.as_u16() {
        401 | 403 => format!("GitHub refused the request ({status}), set GITHUB_TOKEN: {url}").into(),
        code if code >= 500 => format!("Server error ({code}): {url}").into(),
        code => format!("HTTP error {code}: {url}").into(),
    }
}

impl ReleaseHost for GithubReleases {
    async fn list_releases(&self, tag: &str) -> Result<Vec<Release>, BoxError> {
        let url = self.release_url(tag);
        debug!("Fetching release metadata from {url}");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(http_error(response.status(), &url));
        }

        let text = response.text().await?;
        let release: Release = serde_json::from_str(&text)?;
        Ok(vec![release])
    }

    async fn download_asset(&self, asset: &Asset) -> Result<AssetDownload, BoxError> {
        debug!("Downloading asset {} from {}", asset.name, asset.url);

        let response = self
            .client
            .get(&asset.url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response.status(), &asset.url));
        }

        let content_length = response.content_length().or(asset.size);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(AssetDownload {
            content_length,
            body,
        })
    }
}
