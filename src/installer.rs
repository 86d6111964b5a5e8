use std::path::{Path, PathBuf};
use semver::Version;
use crate::config::{ChecksumPolicy, DistConfig};
use crate::error::{DistError, DownloadError, Result};
use crate::fetch::{ArtifactFetcher, FetchedArtifact};
use crate::platform::{resolve_target, PlatformTarget};
use crate::util::{parse_sha256_line, release_asset_url};

/// Everything needed to download one release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub target: PlatformTarget,
    pub version: Version,
    pub asset: String,
    pub url: String,
    pub dest: PathBuf,
}

/// Resolves the asset, URL and destination for `version` on (os, arch).
///
/// # Errors
///
/// [`DistError::UnsupportedPlatform`] if no asset is published for the pair.
pub fn plan_install(
    config: &DistConfig,
    version: &Version,
    os: &str,
    arch: &str,
    dir: &Path,
) -> Result<InstallPlan> {
    let target = resolve_target(os, arch)?;
    let bin = &config.project.bin_name;
    let asset = target.asset_name(bin);
    let tag = config.release.tag_name(version);
    let url = release_asset_url(&config.install.base_url, &config.project.repo, &tag, &asset);
    Ok(InstallPlan {
        target,
        version: version.clone(),
        dest: dir.join(target.binary_file_name(bin)),
        asset,
        url,
    })
}

/// Looks up the digest the downloaded asset must match, per the configured policy.
pub fn resolve_checksum(
    config: &DistConfig,
    fetcher: &ArtifactFetcher,
    plan: &InstallPlan,
) -> Result<Option<String>> {
    match config.install.checksum {
        ChecksumPolicy::Skip => {
            log::warn!("checksum verification disabled for {}", plan.asset);
            Ok(None)
        }
        ChecksumPolicy::Pinned => config
            .install
            .checksums
            .get(&plan.asset)
            .and_then(|pinned| parse_sha256_line(pinned))
            .map(Some)
            .ok_or_else(|| {
                DistError::Config(format!("no valid pinned sha256 for asset {}", plan.asset))
            }),
        ChecksumPolicy::Sidecar => {
            let sidecar = format!("{}.sha256", plan.url);
            let content = match fetcher.fetch_text(&sidecar) {
                Ok(content) => content,
                Err(DistError::Download(DownloadError::NotFound { .. })) => {
                    if config.install.require_checksum {
                        return Err(DownloadError::ChecksumUnavailable { url: sidecar }.into());
                    }
                    log::warn!("no checksum published for {}, installing unverified", plan.asset);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            parse_sha256_line(&content).map(Some).ok_or_else(|| {
                DistError::Config(format!("{sidecar} does not contain a sha256 digest"))
            })
        }
    }
}

/// Downloads, verifies and installs the binary described by `plan`.
pub fn install_binary(config: &DistConfig, plan: &InstallPlan) -> Result<FetchedArtifact> {
    let fetcher = ArtifactFetcher::new(config.install.max_redirects)?;
    let expected = resolve_checksum(config, &fetcher, plan)?;
    println!("Downloading {} from {}...", plan.asset, plan.url);
    fetcher.fetch(&plan.url, &plan.dest, expected.as_deref())
}
