use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use crate::error::{DownloadError, Result};
use crate::util::{ensure_dir, eq_hex_sha256};

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// A file produced by [`ArtifactFetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the downloaded bytes.
    pub sha256: String,
    pub size: u64,
}

/// Downloads release assets over HTTP.
///
/// Redirects are followed by hand so the chain length can be bounded and
/// reported; the underlying client never follows them itself.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: Client,
    max_redirects: usize,
}

impl ArtifactFetcher {
    pub fn new(max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("vc-dist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DownloadError::Transport {
                url: String::new(),
                source,
            })?;
        Ok(ArtifactFetcher {
            client,
            max_redirects,
        })
    }

    /// Issues a GET and follows up to `max_redirects` redirects.
    ///
    /// # Errors
    ///
    /// [`DownloadError::NotFound`] for a terminal 404, [`DownloadError::Status`]
    /// for any other non-2xx, [`DownloadError::RedirectLimit`] when the chain is
    /// longer than allowed.
    fn get(&self, url: &str) -> Result<Response> {
        let mut current = url.to_string();
        for hop in 0..=self.max_redirects {
            log::debug!("GET {current}");
            let response = self
                .client
                .get(&current)
                .send()
                .map_err(|source| DownloadError::Transport {
                    url: current.clone(),
                    source,
                })?;
            let status = response.status();

            if is_redirect(status) {
                if hop == self.max_redirects {
                    break;
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| DownloadError::MissingLocation {
                        url: current.clone(),
                    })?;
                let next = Url::parse(&current)
                    .and_then(|base| base.join(location))
                    .map_err(|e| DownloadError::InvalidUrl {
                        url: location.to_string(),
                        reason: e.to_string(),
                    })?;
                log::debug!("{} redirect to {next}", status.as_u16());
                current = next.to_string();
                continue;
            }
            if status == StatusCode::NOT_FOUND {
                return Err(DownloadError::NotFound { url: current }.into());
            }
            if !status.is_success() {
                return Err(DownloadError::Status {
                    url: current,
                    status: status.as_u16(),
                }
                .into());
            }
            return Ok(response);
        }
        Err(DownloadError::RedirectLimit {
            url: url.to_string(),
            limit: self.max_redirects,
        }
        .into())
    }

    /// Fetches a small text resource, such as a `.sha256` sidecar.
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url)?;
        response.text().map_err(|source| {
            DownloadError::Transport {
                url: url.to_string(),
                source,
            }
            .into()
        })
    }

    /// Downloads `url` and installs it as an executable at `dest`.
    ///
    /// The body is streamed into a temporary file next to `dest`, checked
    /// against `expected_sha256` when given, marked executable, then renamed
    /// over `dest`. On any failure the temporary file is removed and an
    /// existing `dest` is left untouched.
    ///
    /// # Errors
    ///
    /// Any [`DownloadError`], or an I/O error while writing.
    pub fn fetch(&self, url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<FetchedArtifact> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_dir(&parent)?;

        let mut response = self.get(url)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".vc-dist-download")
            .tempfile_in(&parent)?;

        let (sha256, size) = stream_into(&mut response, &mut tmp)?;
        if let Some(expected) = expected_sha256 {
            if !eq_hex_sha256(&sha256, expected) {
                return Err(DownloadError::ChecksumMismatch {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual: sha256,
                }
                .into());
            }
            log::debug!("sha256 verified: {sha256}");
        }

        mark_executable(tmp.path())?;
        tmp.persist(dest).map_err(|e| e.error)?;
        log::info!("installed {} ({size} bytes)", dest.display());
        Ok(FetchedArtifact {
            path: dest.to_path_buf(),
            sha256,
            size,
        })
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn stream_into<R: Read>(reader: &mut R, file: &mut NamedTempFile) -> std::io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut size = 0u64;
    let mut buf = [0u8; 1024 * 64];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])?;
        size += n as u64;
    }
    file.as_file().sync_all()?;
    Ok((hex::encode(hasher.finalize()), size))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
