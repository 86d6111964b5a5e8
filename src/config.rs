use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::manifest::{ManifestDescriptor, SyntaxKind};

/// File name of the configuration looked up in the project root.
pub const CONFIG_FILE: &str = "dist.toml";

/// Represents the contents of a `dist.toml` file.
///
/// Everything the installer and the release workflow need to know about the
/// project lives here instead of in constants, so the same binary can serve
/// other repositories (and tests) unchanged.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DistConfig {
    /// Where releases are published and what the binary is called.
    pub project: Project,
    #[serde(default)]
    pub install: InstallSettings,
    #[serde(default)]
    pub release: ReleaseSettings,
    /// The source of truth for the current version.
    pub authoritative: ManifestDescriptor,
    /// Every other file carrying a copy of the version, in write order.
    #[serde(default)]
    pub manifests: Vec<ManifestDescriptor>,
}

/// Basic metadata for the distributed binary.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Project {
    /// GitHub repository hosting the releases, e.g. `"user/repo"`.
    pub repo: String,
    /// Name of the installed binary, also the prefix of every asset name.
    pub bin_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InstallSettings {
    /// Host serving `<repo>/releases/download/...`.
    pub base_url: String,
    pub max_redirects: usize,
    pub checksum: ChecksumPolicy,
    /// Fail instead of installing unverified when no sidecar is published.
    pub require_checksum: bool,
    /// Asset name to hex SHA-256, used with [`ChecksumPolicy::Pinned`].
    pub checksums: BTreeMap<String, String>,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            max_redirects: 5,
            checksum: ChecksumPolicy::Sidecar,
            require_checksum: false,
            checksums: BTreeMap::new(),
        }
    }
}

/// Where the expected digest of a downloaded asset comes from.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumPolicy {
    /// `<asset url>.sha256` published next to the asset, when there is one.
    Sidecar,
    /// `install.checksums` in this file.
    Pinned,
    Skip,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReleaseSettings {
    pub tag_prefix: String,
    /// `{version}` is replaced with the new version.
    pub commit_message: String,
    pub remote: String,
    pub annotated_tag: bool,
    pub default_preid: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            tag_prefix: "v".to_string(),
            commit_message: "chore: release v{version}".to_string(),
            remote: "origin".to_string(),
            annotated_tag: false,
            default_preid: "alpha".to_string(),
        }
    }
}

impl ReleaseSettings {
    pub fn tag_name(&self, version: &semver::Version) -> String {
        format!("{}{}", self.tag_prefix, version)
    }

    pub fn commit_message_for(&self, version: &semver::Version) -> String {
        self.commit_message.replace("{version}", &version.to_string())
    }
}

impl Default for DistConfig {
    /// The layout of the vanity_crypto repository.
    fn default() -> Self {
        DistConfig {
            project: Project {
                repo: "athexweb3/vanity_crypto".to_string(),
                bin_name: "vc".to_string(),
            },
            install: InstallSettings::default(),
            release: ReleaseSettings::default(),
            authoritative: ManifestDescriptor::new(
                "package.json",
                "package.json",
                SyntaxKind::StructuredKeyValueDocument,
            ),
            manifests: vec![
                ManifestDescriptor::new("Cargo.toml", "Cargo.toml", SyntaxKind::ScopedKeyValueText)
                    .with_table("workspace.package"),
                ManifestDescriptor::new(
                    "Homebrew formula",
                    "Formula/vanity_crypto.rb",
                    SyntaxKind::FlatKeyValueText,
                ),
                ManifestDescriptor::new(
                    "Scoop manifest",
                    "scoop/vanity_crypto.json",
                    SyntaxKind::StructuredKeyValueDocument,
                ),
            ],
        }
    }
}

impl DistConfig {
    /// Loads a `DistConfig` from a file path.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or deserialized.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DistConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Could not parse {}", path.display()))
    }

    /// Loads the file if it exists, otherwise returns the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<DistConfig> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            log::debug!("{} not found, using built-in defaults", path.as_ref().display());
            Ok(DistConfig::default())
        }
    }

    /// Saves the `DistConfig` to the given file path in pretty TOML format.
    ///
    /// # Errors
    /// Returns an error if the file can't be written or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

/// Returns the config path for a project root unless one was given explicitly.
pub fn config_path(root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| root.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_matches_repository_layout() {
        let config = DistConfig::default();
        assert_eq!(config.project.bin_name, "vc");
        assert_eq!(config.authoritative.path, PathBuf::from("package.json"));
        let paths: Vec<_> = config.manifests.iter().map(|m| m.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("Cargo.toml"),
                PathBuf::from("Formula/vanity_crypto.rb"),
                PathBuf::from("scoop/vanity_crypto.json"),
            ]
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = DistConfig::default();
        config.install.checksum = ChecksumPolicy::Pinned;
        config.install.checksums.insert("vc-linux-amd64".to_string(), "ab".repeat(32));
        config.save(&path).unwrap();

        let loaded = DistConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[project]
repo = "someone/tool"
bin_name = "tool"

[authoritative]
path = "package.json"
syntax = "structured-key-value-document"

[[manifests]]
label = "formula"
path = "Formula/tool.rb"
syntax = "flat-key-value-text"
"#,
        )
        .unwrap();

        let config = DistConfig::load(&path).unwrap();
        assert_eq!(config.install.max_redirects, 5);
        assert_eq!(config.install.checksum, ChecksumPolicy::Sidecar);
        assert!(!config.install.require_checksum);
        assert_eq!(config.release.tag_prefix, "v");
        assert_eq!(config.manifests.len(), 1);
        assert_eq!(config.manifests[0].key, "version");
        assert_eq!(config.authoritative.path, PathBuf::from("package.json"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let config = DistConfig::load_or_default(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, DistConfig::default());
    }

    #[test]
    fn test_release_naming() {
        let settings = ReleaseSettings::default();
        let version = semver::Version::parse("0.4.1-beta.0").unwrap();
        assert_eq!(settings.tag_name(&version), "v0.4.1-beta.0");
        assert_eq!(settings.commit_message_for(&version), "chore: release v0.4.1-beta.0");
    }
}
