use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Ensures the directory exists, creating any missing parents.
/// Succeeds without changes if it is already there.
///
/// Returns the path that was passed in.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> std::io::Result<PathBuf> {
    let path = PathBuf::from(path.as_ref());
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Strips the `sha256:` prefix from a hash if present.
/// This is useful for formatting hashes uniformly.
pub fn format_hash(hash: &str) -> String {
    if let Some(hash) = hash.strip_prefix("sha256:") {
        hash.to_string()
    } else {
        hash.to_string()
    }
}

/// Parses the contents of a `.sha256` file.
///
/// Accepts both a bare digest and the `sha256sum` format (`<digest>  <file>`).
/// Returns the lowercase hex digest, or `None` if the first token isn't one.
pub fn parse_sha256_line(content: &str) -> Option<String> {
    let token = content.split_whitespace().next()?;
    let hash = format_hash(token).to_ascii_lowercase();
    if hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hash)
    } else {
        None
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn eq_hex_sha256(a: &str, b: &str) -> bool {
    format_hash(a.trim()).eq_ignore_ascii_case(&format_hash(b.trim()))
}

/// Returns the operating system and CPU architecture of the host,
/// as reported by the standard library (e.g. `("linux", "x86_64")`).
pub fn current_platform() -> (&'static str, &'static str) {
    (std::env::consts::OS, std::env::consts::ARCH)
}

/// Builds the download URL of a release asset.
///
/// `https://github.com` + `user/repo` + `v1.2.3` + `vc-linux-amd64` becomes
/// `https://github.com/user/repo/releases/download/v1.2.3/vc-linux-amd64`.
pub fn release_asset_url(base_url: &str, repo: &str, tag: &str, asset: &str) -> String {
    format!(
        "{}/{}/releases/download/{}/{}",
        base_url.trim_end_matches('/'),
        repo.trim_matches('/'),
        tag,
        asset
    )
}

/// Returns the per-user directory binaries are installed into when no
/// directory is given, e.g. `~/.local/share/vc/bin` on Linux.
pub fn default_install_dir(bin_name: &str) -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", bin_name)
        .ok_or_else(|| anyhow!("Could not get project directories"))?;
    Ok(proj_dirs.data_local_dir().join("bin"))
}

/// Checks if a given path is an executable file on Unix.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
/// Checks if a given path has a Windows executable extension (.exe, .bat, .cmd).
#[cfg(windows)]
pub fn is_executable(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        let ext = ext.to_ascii_lowercase();
        path.is_file() && matches!(ext.as_str(), "exe" | "bat" | "cmd")
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a").join("bin");
        ensure_dir(&target).unwrap();
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_format_hash_removes_prefix() {
        let input = "sha256:abcdef123456";
        let expected = "abcdef123456";
        assert_eq!(format_hash(input), expected);
    }

    #[test]
    fn test_format_hash_without_prefix() {
        let input = "abcdef123456";
        assert_eq!(format_hash(input), input);
    }

    #[test]
    fn test_parse_sha256_line() {
        let digest = sha256_hex(b"hello");
        assert_eq!(parse_sha256_line(&digest), Some(digest.clone()));
        assert_eq!(parse_sha256_line(&format!("{digest}  vc-linux-amd64\n")), Some(digest.clone()));
        assert_eq!(parse_sha256_line(&format!("sha256:{}", digest.to_uppercase())), Some(digest));
        assert_eq!(parse_sha256_line("not-a-digest"), None);
        assert_eq!(parse_sha256_line(""), None);
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(eq_hex_sha256(
            "sha256:2CF24DBA5FB0A30E26E83B2AC5B9E29E1B161E5C1FA7425E73043362938B9824",
            &sha256_hex(b"hello")
        ));
    }

    #[test]
    fn test_release_asset_url() {
        assert_eq!(
            release_asset_url("https://github.com/", "athexweb3/vanity_crypto", "v0.1.0", "vc-linux-amd64"),
            "https://github.com/athexweb3/vanity_crypto/releases/download/v0.1.0/vc-linux-amd64"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        assert!(!is_executable(&path));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&path));
        assert!(!is_executable(dir.path()));
    }
}
