//! Normalized atom-shell version identifiers.
//!
//! Users pass plain semantic versions (`0.20.0`); releases, cache entries and
//! the `version` marker file all use the tag form (`v0.20.0`).

use std::fmt;
use std::str::FromStr;

use crate::errors::InstallError;

/// Prefix carried by every release tag.
pub const TAG_PREFIX: char = 'v';

/// A release tag such as `v0.20.0`.
///
/// Built once from user input and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellVersion {
    tag: String,
}

impl ShellVersion {
    /// Parses a user supplied version.
    ///
    /// A leading `v` is accepted and ignored; the remainder must be a valid
    /// semantic version.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the version is empty or not semver.
    pub fn parse(input: &str) -> Result<Self, InstallError> {
        let trimmed = input.trim();
        let bare = trimmed.strip_prefix(TAG_PREFIX).unwrap_or(trimmed);
        if bare.is_empty() {
            return Err(InstallError::configuration("version must not be empty"));
        }

        semver::Version::parse(bare).map_err(|e| {
            InstallError::configuration(format!("invalid version '{input}': {e}"))
        })?;

        Ok(Self {
            tag: format!("{TAG_PREFIX}{bare}"),
        })
    }

    /// The tag form, e.g. `v0.20.0`.
    #[must_use]
    pub fn as_tag(&self) -> &str {
        &self.tag
    }

    /// The version without the tag prefix, e.g. `0.20.0`.
    #[must_use]
    pub fn bare(&self) -> &str {
        &self.tag[TAG_PREFIX.len_utf8()..]
    }

    /// Returns whether `recorded` (a marker file's content) names this version.
    #[must_use]
    pub fn matches(&self, recorded: &str) -> bool {
        recorded.trim() == self.tag
    }
}

impl FromStr for ShellVersion {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ShellVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl AsRef<str> for ShellVersion {
    fn as_ref(&self) -> &str {
        &self.tag
    }
}
