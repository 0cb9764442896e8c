//! Download cache for extracted atom-shell distributions.
//!
//! ## Directory Structure
//!
//! ```text
//! <download_dir>/
//!   v0.20.0/                  # One entry per version tag
//!     version                 # Marker written by the archive itself
//!     ...                     # Extracted distribution
//!   v0.21.0.partial/          # Staging while downloading/extracting
//!     atom-shell.zip
//! <output_dir>/
//!   version                   # Marker of the installed version
//!   ...
//! ```
//!
//! An entry is valid only when its `version` marker exists. Directory
//! existence alone means nothing. Downloads are unpacked into a staging
//! directory and renamed into place only once complete, so an interrupted
//! or failed run never leaves a marker in a partial entry.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::InstallError;
use crate::version::ShellVersion;

/// Name of the marker file inside a complete distribution directory.
pub const VERSION_MARKER: &str = "version";

/// Returns the cache entry directory for `version`.
#[must_use]
pub fn entry_dir(download_dir: &Path, version: &ShellVersion) -> PathBuf {
    download_dir.join(version.as_tag())
}

/// Suffix of the staging directory a version is unpacked into.
pub const STAGING_SUFFIX: &str = ".partial";

/// Returns the staging directory `version` is downloaded and unpacked into.
#[must_use]
pub fn staging_dir(download_dir: &Path, version: &ShellVersion) -> PathBuf {
    download_dir.join(format!("{}{STAGING_SUFFIX}", version.as_tag()))
}

/// Returns whether a complete, extracted copy of `version` is cached.
#[must_use]
pub fn is_cached(download_dir: &Path, version: &ShellVersion) -> bool {
    entry_dir(download_dir, version).join(VERSION_MARKER).is_file()
}

/// Reads the version recorded in `output_dir`, if any.
///
/// An unreadable marker is treated like a missing one so that the next
/// install simply overwrites it.
#[must_use]
pub fn installed_version(output_dir: &Path) -> Option<String> {
    let marker = output_dir.join(VERSION_MARKER);
    if !marker.is_file() {
        return None;
    }

    match std::fs::read_to_string(&marker) {
        Ok(content) => Some(content.trim().to_string()),
        Err(e) => {
            warn!("Ignoring unreadable marker {}: {e}", marker.display());
            None
        }
    }
}

/// Copies the cached `version` into `output_dir`.
///
/// Whatever `output_dir` held before is removed first, read-only files
/// included. On failure the state of `output_dir` is undefined; there is no
/// rollback.
///
/// # Errors
///
/// Returns [`InstallError::InstallCopy`] if removing the old contents or
/// copying any entry fails.
pub fn install(
    output_dir: &Path,
    download_dir: &Path,
    version: &ShellVersion,
) -> Result<(), InstallError> {
    let source = entry_dir(download_dir, version);
    let wrap = |source: io::Error| InstallError::InstallCopy {
        version: version.to_string(),
        output_dir: output_dir.to_path_buf(),
        source,
    };

    debug!(
        "Copying {} into {}",
        source.display(),
        output_dir.display()
    );

    if output_dir.exists() {
        force_remove_dir(output_dir).map_err(wrap)?;
    }
    copy_dir_recursive(&source, output_dir).map_err(wrap)
}

/// Removes `dir` recursively, clearing read-only flags when removal is denied.
fn force_remove_dir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!("Clearing read-only flags under {}", dir.display());
            make_tree_writable(dir)?;
            std::fs::remove_dir_all(dir)
        }
        Err(e) => Err(e),
    }
}

fn make_tree_writable(dir: &Path) -> io::Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.path_is_symlink() {
            continue;
        }
        let perms = entry.metadata().map_err(io::Error::other)?.permissions();
        if let Some(perms) = owner_writable(perms) {
            std::fs::set_permissions(entry.path(), perms)?;
        }
    }
    Ok(())
}

/// Returns `perms` with the owner write bit added, or `None` if it is set.
#[cfg(unix)]
fn owner_writable(mut perms: std::fs::Permissions) -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = perms.mode();
    if mode & 0o200 != 0 {
        return None;
    }
    perms.set_mode(mode | 0o200);
    Some(perms)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn owner_writable(mut perms: std::fs::Permissions) -> Option<std::fs::Permissions> {
    if !perms.readonly() {
        return None;
    }
    perms.set_readonly(false);
    Some(perms)
}

/// Copies `source` onto `dest`, recreating directories, files and symlinks.
fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let points_to = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    if link.is_dir() {
        copy_dir_recursive(link, target)
    } else {
        std::fs::copy(link, target).map(|_| ())
    }
}
