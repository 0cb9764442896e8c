//! Asset resolution.
//!
//! Computes the file name atom-shell publishes for a platform and picks the
//! matching asset out of a release listing.
//!
//! File names follow `atom-shell-<tag>-<platform>-<arch>[-symbols].zip`, for
//! example `atom-shell-v0.20.0-darwin-x64.zip`.

use tracing::debug;

use crate::errors::InstallError;
use crate::platform::Target;
use crate::release::{Asset, Release};
use crate::version::ShellVersion;

/// Expected asset file name for `version` on `target`.
#[must_use]
pub fn asset_filename(version: &ShellVersion, target: &Target, symbols: bool) -> String {
    let suffix = if symbols { "-symbols" } else { "" };
    format!(
        "atom-shell-{}-{}-{}{suffix}.zip",
        version.as_tag(),
        target.platform,
        target.asset_arch()
    )
}

/// Finds the asset named `filename` in the first of `releases`.
///
/// The first asset with an exactly matching name wins.
///
/// # Errors
///
/// - [`InstallError::ReleaseNotFound`] if `releases` is empty
/// - [`InstallError::ReleaseHasNoAssets`] if the release lists no assets
/// - [`InstallError::AssetNotFound`] if no asset is named `filename`
pub fn find_asset<'a>(
    releases: &'a [Release],
    version: &ShellVersion,
    filename: &str,
) -> Result<&'a Asset, InstallError> {
    let release = releases
        .first()
        .ok_or_else(|| InstallError::ReleaseNotFound {
            version: version.to_string(),
        })?;

    if release.assets.is_empty() {
        return Err(InstallError::ReleaseHasNoAssets {
            version: version.to_string(),
        });
    }

    release
        .assets
        .iter()
        .find(|asset| asset.name == filename)
        .ok_or_else(|| InstallError::AssetNotFound {
            filename: filename.to_string(),
            version: version.to_string(),
        })
}

/// Computes the expected file name and resolves it against `releases`.
///
/// # Errors
///
/// See [`find_asset`].
pub fn resolve<'a>(
    releases: &'a [Release],
    version: &ShellVersion,
    target: &Target,
    symbols: bool,
) -> Result<&'a Asset, InstallError> {
    let filename = asset_filename(version, target, symbols);
    debug!("Looking for asset {filename}");
    find_asset(releases, version, &filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn version() -> ShellVersion {
        ShellVersion::parse("0.20.0").unwrap()
    }

    fn asset(name: &str, url: &str) -> Asset {
        Asset {
            name: name.to_string(),
            url: url.to_string(),
            size: None,
        }
    }

    fn release(assets: Vec<Asset>) -> Release {
        Release {
            tag_name: "v0.20.0".to_string(),
            assets,
        }
    }

    #[test]
    fn filename_for_each_platform() {
        let cases = [
            (Platform::Linux, "x64", "atom-shell-v0.20.0-linux-x64.zip"),
            (Platform::Linux, "ia32", "atom-shell-v0.20.0-linux-ia32.zip"),
            (Platform::Linux, "arm", "atom-shell-v0.20.0-linux-arm.zip"),
            (Platform::Darwin, "arm64", "atom-shell-v0.20.0-darwin-x64.zip"),
            (Platform::Win32, "x64", "atom-shell-v0.20.0-win32-ia32.zip"),
            (
                Platform::Other("freebsd".into()),
                "x64",
                "atom-shell-v0.20.0-freebsd-x64.zip",
            ),
        ];

        for (platform, arch, expected) in cases {
            let target = Target::new(platform, arch);
            assert_eq!(asset_filename(&version(), &target, false), expected);
        }
    }

    #[test]
    fn filename_with_symbols() {
        let target = Target::new(Platform::Win32, "x64");
        assert_eq!(
            asset_filename(&version(), &target, true),
            "atom-shell-v0.20.0-win32-ia32-symbols.zip"
        );

        let target = Target::new(Platform::Linux, "x64");
        assert_eq!(
            asset_filename(&version(), &target, true),
            "atom-shell-v0.20.0-linux-x64-symbols.zip"
        );
    }

    #[test]
    fn find_asset_requires_exact_name() {
        let releases = vec![release(vec![
            asset("atom-shell-v0.20.0-linux-x64-symbols.zip", "sym"),
            asset("atom-shell-v0.20.0-linux-x64.zip", "plain"),
        ])];

        let found = find_asset(&releases, &version(), "atom-shell-v0.20.0-linux-x64.zip").unwrap();
        assert_eq!(found.url, "plain");
    }

    #[test]
    fn find_asset_first_duplicate_wins() {
        let releases = vec![release(vec![
            asset("atom-shell-v0.20.0-linux-x64.zip", "first"),
            asset("atom-shell-v0.20.0-linux-x64.zip", "second"),
        ])];

        let found = find_asset(&releases, &version(), "atom-shell-v0.20.0-linux-x64.zip").unwrap();
        assert_eq!(found.url, "first");
    }

    #[test]
    fn find_asset_without_release() {
        let err = find_asset(&[], &version(), "atom-shell-v0.20.0-linux-x64.zip").unwrap_err();
        assert!(matches!(err, InstallError::ReleaseNotFound { ref version } if version == "v0.20.0"));
    }

    #[test]
    fn find_asset_with_empty_release() {
        let releases = vec![release(Vec::new())];
        let err = find_asset(&releases, &version(), "atom-shell-v0.20.0-linux-x64.zip").unwrap_err();
        assert!(matches!(err, InstallError::ReleaseHasNoAssets { .. }));
    }

    #[test]
    fn find_asset_without_match() {
        let releases = vec![release(vec![asset("atom-shell-v0.20.0-darwin-x64.zip", "mac")])];
        let err = find_asset(&releases, &version(), "atom-shell-v0.20.0-linux-x64.zip").unwrap_err();

        match err {
            InstallError::AssetNotFound { filename, version } => {
                assert_eq!(filename, "atom-shell-v0.20.0-linux-x64.zip");
                assert_eq!(version, "v0.20.0");
            }
            other => panic!("Expected AssetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_combines_filename_and_lookup() {
        let releases = vec![release(vec![
            asset("atom-shell-v0.20.0-win32-ia32.zip", "win"),
            asset("atom-shell-v0.20.0-darwin-x64.zip", "mac"),
        ])];

        let target = Target::new(Platform::Darwin, "arm64");
        let found = resolve(&releases, &version(), &target, false).unwrap();
        assert_eq!(found.url, "mac");
    }
}
