//! Archive extraction for downloaded distributions.
//!
//! Two extractors with identical observable behavior are available: the
//! `zip` crate, and the system `unzip` tool. macOS uses `unzip` by default so
//! framework bundles come out exactly as the platform tool lays them out;
//! every other platform uses the library.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::InstallError;

/// How an archive is unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// In-process extraction with the `zip` crate.
    Library,
    /// The system `unzip` executable.
    Native,
}

impl Extractor {
    /// Extractor used on the running platform.
    #[must_use]
    pub fn for_host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Native
        } else {
            Self::Library
        }
    }

    /// Extracts every entry of `archive` into `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Extraction`] if the archive cannot be read,
    /// contains unsafe paths, or any entry cannot be written.
    pub async fn extract(self, archive: &Path, dest_dir: &Path) -> Result<(), InstallError> {
        debug!(
            "Extracting {} into {} ({self:?})",
            archive.display(),
            dest_dir.display()
        );

        match self {
            Self::Library => {
                let archive = archive.to_path_buf();
                let dest_dir = dest_dir.to_path_buf();
                let task_archive = archive.clone();
                tokio::task::spawn_blocking(move || extract_zip(&task_archive, &dest_dir))
                    .await
                    .map_err(|e| {
                        InstallError::extraction_with_source(archive, "extraction task failed", e)
                    })?
            }
            Self::Native => extract_with_unzip(archive, dest_dir).await,
        }
    }
}

/// Extracts a ZIP archive into `dest_dir` using the `zip` crate.
///
/// Creates `dest_dir` if needed. Unix permission bits are restored and
/// symlink entries are recreated as symlinks on Unix. Nothing is ever
/// written through a symlink, so links can only point within `dest_dir`
/// and never redirect later entries.
///
/// # Errors
///
/// Returns [`InstallError::Extraction`] if:
/// - The archive cannot be opened or is not a valid ZIP file
/// - An entry has an absolute path or escapes `dest_dir`
/// - A symlink entry points at an absolute path or outside `dest_dir`
/// - An entry would be written below an already extracted symlink
/// - Directory or file creation fails
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), InstallError> {
    let fail = |message: String, source: Box<dyn std::error::Error + Send + Sync>| {
        InstallError::extraction_with_source(archive_path, message, source)
    };

    let file = std::fs::File::open(archive_path)
        .map_err(|e| fail("cannot open archive".to_string(), e.into()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| fail("not a valid ZIP archive".to_string(), e.into()))?;

    std::fs::create_dir_all(dest_dir).map_err(|e| {
        fail(
            format!("cannot create directory {}", dest_dir.display()),
            e.into(),
        )
    })?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| fail(format!("cannot read entry {i}"), e.into()))?;

        let Some(entry_path) = entry.enclosed_name() else {
            return Err(InstallError::extraction(
                archive_path,
                format!("refusing to extract unsafe path {}", entry.name()),
            ));
        };
        if entry_path.is_absolute()
            || entry_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(InstallError::extraction(
                archive_path,
                format!("refusing to extract unsafe path {}", entry_path.display()),
            ));
        }

        if has_symlink_ancestor(dest_dir, &entry_path) {
            return Err(InstallError::extraction(
                archive_path,
                format!(
                    "refusing to extract {} through a symlink",
                    entry_path.display()
                ),
            ));
        }

        let output_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).map_err(|e| {
                fail(
                    format!("cannot create directory {}", output_path.display()),
                    e.into(),
                )
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                fail(
                    format!("cannot create directory {}", parent.display()),
                    e.into(),
                )
            })?;
        }

        if entry.is_symlink() {
            let mut link_target = String::new();
            std::io::Read::read_to_string(&mut entry, &mut link_target)
                .map_err(|e| fail(format!("cannot read link {}", entry_path.display()), e.into()))?;
            if !link_stays_inside(&entry_path, Path::new(&link_target)) {
                return Err(InstallError::extraction(
                    archive_path,
                    format!(
                        "refusing to extract link {} -> {link_target}",
                        entry_path.display()
                    ),
                ));
            }
            write_symlink(&link_target, &output_path).map_err(|e| {
                fail(
                    format!("cannot create link {}", output_path.display()),
                    e.into(),
                )
            })?;
            continue;
        }

        if is_symlink(&output_path) {
            std::fs::remove_file(&output_path).map_err(|e| {
                fail(
                    format!("cannot replace link {}", output_path.display()),
                    e.into(),
                )
            })?;
        }

        let mut outfile = std::fs::File::create(&output_path).map_err(|e| {
            fail(
                format!("cannot create file {}", output_path.display()),
                e.into(),
            )
        })?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| fail(format!("cannot extract {}", output_path.display()), e.into()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| {
                    fail(
                        format!("cannot set permissions on {}", output_path.display()),
                        e.into(),
                    )
                })?;
        }
    }

    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|meta| meta.file_type().is_symlink())
}

/// Returns whether any directory between `dest_dir` and the entry is a symlink.
fn has_symlink_ancestor(dest_dir: &Path, entry_path: &Path) -> bool {
    let mut current = dest_dir.to_path_buf();
    let mut components = entry_path.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        if is_symlink(&current) {
            return true;
        }
    }
    false
}

/// Returns whether a link at `entry_path` pointing to `target` resolves inside
/// the extraction root, judged on the path text alone.
fn link_stays_inside(entry_path: &Path, target: &Path) -> bool {
    let mut depth = entry_path.parent().map_or(0, |parent| {
        parent
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    });

    if target.as_os_str().is_empty() {
        return false;
    }
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(unix)]
fn write_symlink(link_target: &str, path: &Path) -> std::io::Result<()> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path)?;
    }
    std::os::unix::fs::symlink(link_target, path)
}

/// Without symlink support the link is written as a small file holding its target.
#[cfg(not(unix))]
fn write_symlink(link_target: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, link_target)
}

/// Extracts `archive` with the system `unzip` tool.
async fn extract_with_unzip(archive: &Path, dest_dir: &Path) -> Result<(), InstallError> {
    tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
        InstallError::extraction_with_source(
            archive,
            format!("cannot create directory {}", dest_dir.display()),
            e,
        )
    })?;

    let output = Command::new("unzip")
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| InstallError::extraction_with_source(archive, "cannot run unzip", e))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(InstallError::extraction(
            archive,
            format!("unzip exited with {}: {}", output.status, stderr.trim()),
        ))
    }
}

/// Path the pipeline downloads an archive to inside a cache entry.
#[must_use]
pub fn archive_path(entry_dir: &Path) -> PathBuf {
    entry_dir.join(ARCHIVE_FILE)
}

/// File name of the transient archive inside a cache entry.
pub const ARCHIVE_FILE: &str = "atom-shell.zip";
