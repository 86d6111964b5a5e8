use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the install and release machinery.
///
/// Every variant except [`DistError::InvalidVersionInput`] is fatal for the
/// operation that raised it.
#[derive(Debug, Error)]
pub enum DistError {
    /// The host (os, arch) pair has no published asset.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A manifest's version field could not be located.
    #[error("could not parse version from {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("versions do not match {expected}:\n{}", format_mismatches(mismatches))]
    VersionMismatch {
        expected: String,
        mismatches: Vec<Mismatch>,
    },

    /// Operator-supplied version text that is not a semantic version.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersionInput { input: String, reason: String },

    #[error("`{command}` failed:\n{output}")]
    VersionControl { command: String, output: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while fetching a remote asset.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("release not found for this version (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("download failed with HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("redirect limit of {limit} exceeded while fetching {url}")]
    RedirectLimit { url: String, limit: usize },

    #[error("redirect from {url} has no Location header")]
    MissingLocation { url: String },

    #[error("invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No checksum was published for an asset whose verification is required.
    #[error("no sha256 checksum published at {url}")]
    ChecksumUnavailable { url: String },

    #[error("sha256 mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::NotFound { .. } | DownloadError::ChecksumUnavailable { .. } => Some(404),
            DownloadError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One channel whose version differs from the authoritative one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub label: String,
    pub path: PathBuf,
    pub found: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.label, self.path.display(), self.found)
    }
}

fn format_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("  {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, DistError>;
