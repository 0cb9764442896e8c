//! Download-and-unpack pipeline.
//!
//! Streams an opened asset into `<download_dir>/<tag>.partial/atom-shell.zip`,
//! extracts it next to itself and deletes the archive. Only when the
//! extracted `version` marker exists is the staging directory renamed to
//! `<download_dir>/<tag>`, so an interrupted or failed run never leaves a
//! valid-looking entry behind and the next run re-downloads it.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::archive::{Extractor, archive_path};
use crate::cache::{self, VERSION_MARKER};
use crate::errors::InstallError;
use crate::progress::DownloadProgress;
use crate::release::AssetDownload;
use crate::version::ShellVersion;

/// Saves `download` into the cache entry for `version` and unpacks it.
///
/// Returns the populated entry directory.
///
/// # Errors
///
/// - [`InstallError::Download`] if the byte stream fails
/// - [`InstallError::Write`] if the staging directory or archive cannot be
///   written, the archive cannot be removed afterwards, or the staging
///   directory cannot be moved into place
/// - [`InstallError::Extraction`] if unpacking fails or the archive carries no
///   `version` marker
pub async fn save_to_cache(
    download: AssetDownload,
    download_dir: &Path,
    version: &ShellVersion,
    extractor: Extractor,
) -> Result<PathBuf, InstallError> {
    let staging = cache::staging_dir(download_dir, version);
    remove_if_present(&staging).await?;
    tokio::fs::create_dir_all(&staging)
        .await
        .map_err(|e| InstallError::write(&staging, e))?;

    let zip_path = archive_path(&staging);
    let progress = DownloadProgress::new(download.content_length);
    let received = match write_stream(download, &zip_path, version, &progress).await {
        Ok(received) => {
            progress.finish();
            received
        }
        Err(e) => {
            progress.abandon();
            return Err(e);
        }
    };
    debug!("Wrote {received} bytes to {}", zip_path.display());

    info!("Unzipping atom-shell.");
    extractor.extract(&zip_path, &staging).await?;

    tokio::fs::remove_file(&zip_path)
        .await
        .map_err(|e| InstallError::write(&zip_path, e))?;

    if !staging.join(VERSION_MARKER).is_file() {
        return Err(InstallError::extraction(
            &zip_path,
            format!("archive did not contain a '{VERSION_MARKER}' file"),
        ));
    }

    let entry = cache::entry_dir(download_dir, version);
    remove_if_present(&entry).await?;
    tokio::fs::rename(&staging, &entry)
        .await
        .map_err(|e| InstallError::write(&entry, e))?;
    debug!("Moved {} to {}", staging.display(), entry.display());

    Ok(entry)
}

/// Removes a leftover directory (or stray file) at `path`.
async fn remove_if_present(path: &Path) -> Result<(), InstallError> {
    let Ok(meta) = tokio::fs::symlink_metadata(path).await else {
        return Ok(());
    };
    warn!("Removing leftover {}", path.display());

    let removed = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    removed.map_err(|e| InstallError::write(path, e))
}

/// Copies the asset body into `dest`, returning the number of bytes written.
async fn write_stream(
    download: AssetDownload,
    dest: &Path,
    version: &ShellVersion,
    progress: &DownloadProgress,
) -> Result<u64, InstallError> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| InstallError::write(dest, e))?;

    let mut body = download.body;
    let mut received: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| InstallError::download(version.as_tag(), e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| InstallError::write(dest, e))?;

        received += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    file.flush()
        .await
        .map_err(|e| InstallError::write(dest, e))?;

    Ok(received)
}
