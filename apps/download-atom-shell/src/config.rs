//! Install options and their validation.
//!
//! Options arrive from up to two layers: an optional TOML file and the
//! command line (including environment variables read by the CLI). Each
//! layer is an [`InstallOptions`] with every field optional; they are merged
//! with [`InstallOptions::merge`] and turned into a validated
//! [`InstallRequest`] with defaults applied.
//!
//! ## Config File Format
//!
//! ```toml
//! [atom-shell]
//! version = "0.20.0"
//! output-dir = "atom-shell"
//! download-dir = "/var/cache/atom-shell"
//! symbols = false
//! rebuild = true
//! rebuild-tool = "node_modules/.bin/apm"
//! repo = "atom/atom-shell"
//! ```
//!
//! The option names used by the gulp plugin (`outputDir`, `downloadDir`,
//! `apm`) are accepted as aliases.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::InstallError;
use crate::rebuild::default_rebuild_tool;
use crate::release::DEFAULT_REPO;
use crate::version::ShellVersion;

/// Subdirectory of the temp directory used as the default download cache.
pub const DEFAULT_DOWNLOAD_SUBDIR: &str = "downloaded-atom-shell";

/// Message reported when a required option is absent.
pub const MISSING_REQUIRED: &str = "version and outputDir option must be given!";

/// One layer of user supplied options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InstallOptions {
    pub version: Option<String>,
    #[serde(alias = "outputDir")]
    pub output_dir: Option<PathBuf>,
    #[serde(alias = "downloadDir")]
    pub download_dir: Option<PathBuf>,
    pub symbols: Option<bool>,
    pub rebuild: Option<bool>,
    #[serde(alias = "apm")]
    pub rebuild_tool: Option<PathBuf>,
    pub repo: Option<String>,
    pub github_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "atom-shell", default)]
    atom_shell: InstallOptions,
}

impl InstallOptions {
    /// Parses the `[atom-shell]` table of a TOML document.
    ///
    /// A document without the table yields empty options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is not valid TOML or the
    /// table holds unknown keys or mistyped values.
    pub fn from_toml_str(content: &str) -> Result<Self, InstallError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| InstallError::configuration(format!("invalid config file: {e}")))?;
        Ok(file.atom_shell)
    }

    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InstallError> {
        debug!("Loading options from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            InstallError::configuration(format!(
                "cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Overlays `other` onto `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            version: other.version.or(self.version),
            output_dir: other.output_dir.or(self.output_dir),
            download_dir: other.download_dir.or(self.download_dir),
            symbols: other.symbols.or(self.symbols),
            rebuild: other.rebuild.or(self.rebuild),
            rebuild_tool: other.rebuild_tool.or(self.rebuild_tool),
            repo: other.repo.or(self.repo),
            github_token: other.github_token.or(self.github_token),
        }
    }
}

/// A validated install request with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub version: ShellVersion,
    pub output_dir: PathBuf,
    pub download_dir: PathBuf,
    pub symbols: bool,
    pub rebuild: bool,
    pub rebuild_tool: PathBuf,
    /// Release repository as `owner/name`.
    pub repo: String,
    pub github_token: Option<String>,
}

impl InstallRequest {
    /// Validates `options` and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Configuration`] if `version` or `output_dir`
    /// is missing, or the version is not a semantic version.
    pub fn from_options(options: InstallOptions) -> Result<Self, InstallError> {
        let (Some(version), Some(output_dir)) = (options.version, options.output_dir) else {
            return Err(InstallError::configuration(MISSING_REQUIRED));
        };
        if version.trim().is_empty() || output_dir.as_os_str().is_empty() {
            return Err(InstallError::configuration(MISSING_REQUIRED));
        }

        let version = ShellVersion::parse(&version)?;
        let download_dir = options.download_dir.unwrap_or_else(default_download_dir);
        let rebuild_tool = options.rebuild_tool.unwrap_or_else(|| {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            default_rebuild_tool(&cwd)
        });
        let repo = options
            .repo
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REPO.to_string());

        Ok(Self {
            version,
            output_dir,
            download_dir,
            symbols: options.symbols.unwrap_or(false),
            rebuild: options.rebuild.unwrap_or(false),
            rebuild_tool,
            repo,
            github_token: options.github_token.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Default download cache: a fixed subdirectory of the temp directory.
#[must_use]
pub fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DOWNLOAD_SUBDIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> InstallOptions {
        InstallOptions {
            version: Some("0.20.0".into()),
            output_dir: Some(PathBuf::from("out")),
            ..InstallOptions::default()
        }
    }

    #[test]
    fn missing_version_or_output_dir_is_rejected() {
        let cases = [
            InstallOptions::default(),
            InstallOptions {
                version: Some("0.20.0".into()),
                ..InstallOptions::default()
            },
            InstallOptions {
                output_dir: Some(PathBuf::from("out")),
                ..InstallOptions::default()
            },
            InstallOptions {
                version: Some("  ".into()),
                output_dir: Some(PathBuf::from("out")),
                ..InstallOptions::default()
            },
        ];

        for options in cases {
            let err = InstallRequest::from_options(options).unwrap_err();
            assert_eq!(err.to_string(), MISSING_REQUIRED);
        }
    }

    #[test]
    fn invalid_version_is_a_configuration_error() {
        let options = InstallOptions {
            version: Some("latest".into()),
            ..required()
        };
        let err = InstallRequest::from_options(options).unwrap_err();
        assert!(matches!(err, InstallError::Configuration { .. }));
        assert!(err.to_string().contains("latest"));
    }

    #[test]
    fn defaults_are_applied() {
        let request = InstallRequest::from_options(required()).unwrap();

        assert_eq!(request.version.as_tag(), "v0.20.0");
        assert_eq!(request.output_dir, PathBuf::from("out"));
        assert_eq!(
            request.download_dir,
            std::env::temp_dir().join("downloaded-atom-shell")
        );
        assert!(!request.symbols);
        assert!(!request.rebuild);
        assert_eq!(request.repo, "atom/atom-shell");
        assert_eq!(request.github_token, None);
        assert!(!request.rebuild_tool.as_os_str().is_empty());
    }

    #[test]
    fn explicit_values_are_kept() {
        let options = InstallOptions {
            download_dir: Some(PathBuf::from("/cache")),
            symbols: Some(true),
            rebuild: Some(true),
            rebuild_tool: Some(PathBuf::from("/usr/local/bin/apm")),
            repo: Some("electron/electron".into()),
            github_token: Some("secret".into()),
            ..required()
        };
        let request = InstallRequest::from_options(options).unwrap();

        assert_eq!(request.download_dir, PathBuf::from("/cache"));
        assert!(request.symbols);
        assert!(request.rebuild);
        assert_eq!(request.rebuild_tool, PathBuf::from("/usr/local/bin/apm"));
        assert_eq!(request.repo, "electron/electron");
        assert_eq!(request.github_token.as_deref(), Some("secret"));
    }

    #[test]
    fn blank_repo_and_token_fall_back() {
        let options = InstallOptions {
            repo: Some(" ".into()),
            github_token: Some(String::new()),
            ..required()
        };
        let request = InstallRequest::from_options(options).unwrap();
        assert_eq!(request.repo, DEFAULT_REPO);
        assert_eq!(request.github_token, None);
    }

    #[test]
    fn merge_prefers_later_layer() {
        let file = InstallOptions {
            version: Some("0.19.0".into()),
            download_dir: Some(PathBuf::from("/cache")),
            rebuild: Some(true),
            ..InstallOptions::default()
        };
        let cli = InstallOptions {
            version: Some("0.20.0".into()),
            output_dir: Some(PathBuf::from("out")),
            ..InstallOptions::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.version.as_deref(), Some("0.20.0"));
        assert_eq!(merged.output_dir, Some(PathBuf::from("out")));
        assert_eq!(merged.download_dir, Some(PathBuf::from("/cache")));
        assert_eq!(merged.rebuild, Some(true));
    }

    #[test]
    fn parse_config_table() {
        let options = InstallOptions::from_toml_str(
            r#"
            [atom-shell]
            version = "0.20.0"
            output-dir = "atom-shell"
            symbols = true
            rebuild-tool = "bin/apm"
            "#,
        )
        .unwrap();

        assert_eq!(options.version.as_deref(), Some("0.20.0"));
        assert_eq!(options.output_dir, Some(PathBuf::from("atom-shell")));
        assert_eq!(options.symbols, Some(true));
        assert_eq!(options.rebuild_tool, Some(PathBuf::from("bin/apm")));
        assert_eq!(options.rebuild, None);
    }

    #[test]
    fn parse_config_accepts_plugin_option_names() {
        let options = InstallOptions::from_toml_str(
            r#"
            [atom-shell]
            outputDir = "out"
            downloadDir = "cache"
            apm = "apm.cmd"
            "#,
        )
        .unwrap();

        assert_eq!(options.output_dir, Some(PathBuf::from("out")));
        assert_eq!(options.download_dir, Some(PathBuf::from("cache")));
        assert_eq!(options.rebuild_tool, Some(PathBuf::from("apm.cmd")));
    }

    #[test]
    fn parse_config_without_table_is_empty() {
        let options = InstallOptions::from_toml_str("[other]\nkey = 1\n").unwrap();
        assert_eq!(options, InstallOptions::default());
    }

    #[test]
    fn parse_config_rejects_unknown_keys() {
        let err = InstallOptions::from_toml_str("[atom-shell]\nverison = \"0.20.0\"\n").unwrap_err();
        assert!(matches!(err, InstallError::Configuration { .. }));
        assert!(err.to_string().starts_with("invalid config file"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = InstallOptions::load(Path::new("/nonexistent/download-atom-shell.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config file"));
    }
}
