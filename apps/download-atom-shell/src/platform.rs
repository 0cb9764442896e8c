//! Platform detection for atom-shell release assets.
//!
//! Release assets are named after Node.js style platform and architecture
//! identifiers (`darwin`, `win32`, `x64`, `ia32`, ...), so the host values
//! reported by Rust are translated here before they reach the resolver.
//!
//! ## Architecture table
//!
//! | Platform | Asset architecture      |
//! |----------|-------------------------|
//! | `win32`  | `ia32` (fixed)          |
//! | `darwin` | `x64` (fixed)           |
//! | other    | detected host CPU arch  |

use std::fmt;

/// Operating system identifier used in release asset names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux (`linux`)
    Linux,
    /// macOS (`darwin`)
    Darwin,
    /// Windows (`win32`)
    Win32,
    /// Any other OS, named as Rust reports it (e.g. `freebsd`).
    Other(String),
}

impl Platform {
    /// Detects the platform of the running process.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a Rust `target_os` name onto the release naming scheme.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::Darwin,
            "windows" | "win32" => Self::Win32,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the identifier embedded in asset file names.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Win32 => "win32",
            Self::Other(name) => name,
        }
    }

    /// Returns whether this platform is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Win32)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the CPU architecture of the running process in release naming.
#[must_use]
pub fn host_arch() -> String {
    normalize_arch(std::env::consts::ARCH).to_string()
}

/// Translates a Rust `target_arch` name into the release naming scheme.
#[must_use]
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Architecture used in the asset name for `platform`.
///
/// Windows and macOS builds are published for a single architecture each,
/// every other platform uses the detected CPU architecture.
#[must_use]
pub fn asset_arch<'a>(platform: &Platform, detected_arch: &'a str) -> &'a str {
    match platform {
        Platform::Win32 => "ia32",
        Platform::Darwin => "x64",
        Platform::Linux | Platform::Other(_) => detected_arch,
    }
}

/// The platform and CPU architecture an install is performed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub platform: Platform,
    /// Detected CPU architecture, already normalized.
    pub arch: String,
}

impl Target {
    #[must_use]
    pub fn new(platform: Platform, arch: impl Into<String>) -> Self {
        Self {
            platform,
            arch: arch.into(),
        }
    }

    /// The running host.
    #[must_use]
    pub fn host() -> Self {
        Self::new(Platform::detect(), host_arch())
    }

    /// Architecture component of the asset name for this target.
    #[must_use]
    pub fn asset_arch(&self) -> &str {
        asset_arch(&self.platform, &self.arch)
    }
}
