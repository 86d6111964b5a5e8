use std::fmt;
use std::path::PathBuf;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use crate::error::{DistError, Mismatch, Result};

/// How a manifest embeds its version string.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyntaxKind {
    /// A line such as `version "1.2.3"`, `version = "1.2.3"` or
    /// `version: '1.2.3'`. The first such line wins.
    FlatKeyValueText,
    /// A key inside one named TOML table, e.g. `[workspace.package]`.
    ScopedKeyValueText,
    /// A top-level field of a JSON object.
    StructuredKeyValueDocument,
}

/// One file that carries a copy of the release version.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestDescriptor {
    /// Human-readable channel name. Defaults to the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Path relative to the project root.
    pub path: PathBuf,
    pub syntax: SyntaxKind,
    /// Name of the field holding the version.
    #[serde(default = "default_key")]
    pub key: String,
    /// Dotted table path, required for [`SyntaxKind::ScopedKeyValueText`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

fn default_key() -> String {
    "version".to_string()
}

impl ManifestDescriptor {
    pub fn new<P: Into<PathBuf>>(label: &str, path: P, syntax: SyntaxKind) -> Self {
        ManifestDescriptor {
            label: Some(label.to_string()),
            path: path.into(),
            syntax,
            key: default_key(),
            table: None,
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.path.display().to_string(),
        }
    }

    fn parse_error(&self, reason: impl Into<String>) -> DistError {
        DistError::Parse {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ManifestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.path.display())
    }
}

/// Extracts the version string from the contents of a manifest.
///
/// # Errors
///
/// Returns [`DistError::Parse`] if the version field can't be located.
pub fn extract_version(descriptor: &ManifestDescriptor, text: &str) -> Result<String> {
    match descriptor.syntax {
        SyntaxKind::FlatKeyValueText => {
            let span = flat_value_span(descriptor, text)?;
            Ok(text[span].to_string())
        }
        SyntaxKind::ScopedKeyValueText => {
            let doc = parse_toml(descriptor, text)?;
            let table = scope_of(descriptor)?;
            let mut item = doc.as_item();
            for segment in table.split('.') {
                item = item
                    .get(segment)
                    .ok_or_else(|| descriptor.parse_error(format!("no [{table}] table")))?;
            }
            item.get(descriptor.key.as_str())
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    descriptor.parse_error(format!("no string `{}` in [{table}]", descriptor.key))
                })
        }
        SyntaxKind::StructuredKeyValueDocument => {
            let doc: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| descriptor.parse_error(e.to_string()))?;
            doc.as_object()
                .and_then(|obj| obj.get(&descriptor.key))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    descriptor.parse_error(format!("no top-level string `{}`", descriptor.key))
                })
        }
    }
}

/// Returns `text` with the version value replaced by `version`.
///
/// Only the value itself changes; every other byte of the file is kept.
/// Rewriting the same version twice yields the same text.
pub fn rewrite_version(descriptor: &ManifestDescriptor, text: &str, version: &Version) -> Result<String> {
    let version = version.to_string();
    let updated = match descriptor.syntax {
        SyntaxKind::FlatKeyValueText => {
            let span = flat_value_span(descriptor, text)?;
            splice(text, span, &version)
        }
        SyntaxKind::ScopedKeyValueText => {
            let mut doc = parse_toml(descriptor, text)?;
            let table = scope_of(descriptor)?.to_string();
            let mut item = doc.as_item_mut();
            for segment in table.split('.') {
                item = item
                    .get_mut(segment)
                    .ok_or_else(|| descriptor.parse_error(format!("no [{table}] table")))?;
            }
            let value = item
                .get_mut(descriptor.key.as_str())
                .and_then(|v| v.as_value_mut())
                .filter(|v| v.is_str())
                .ok_or_else(|| {
                    descriptor.parse_error(format!("no string `{}` in [{table}]", descriptor.key))
                })?;
            let literal = raw_repr(value).is_some_and(|raw| raw.starts_with('\''));
            let decor = value.decor().clone();
            *value = if literal {
                format!("'{version}'")
                    .parse::<toml_edit::Value>()
                    .map_err(|e| descriptor.parse_error(e.to_string()))?
            } else {
                toml_edit::Value::from(version.clone())
            };
            *value.decor_mut() = decor;
            doc.to_string()
        }
        SyntaxKind::StructuredKeyValueDocument => {
            // validates the document and the field before touching it
            extract_version(descriptor, text)?;
            let span = json_value_span(descriptor, text)?;
            splice(text, span, &version)
        }
    };

    let derived = extract_version(descriptor, &updated)?;
    if derived != version {
        return Err(descriptor.parse_error(format!(
            "rewrite produced `{derived}` instead of `{version}`"
        )));
    }
    Ok(updated)
}

fn splice(text: &str, span: std::ops::Range<usize>, value: &str) -> String {
    let mut out = String::with_capacity(text.len() + value.len());
    out.push_str(&text[..span.start]);
    out.push_str(value);
    out.push_str(&text[span.end..]);
    out
}

fn raw_repr(value: &toml_edit::Value) -> Option<String> {
    match value {
        toml_edit::Value::String(s) => s
            .as_repr()
            .and_then(|repr| repr.as_raw().as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn scope_of(descriptor: &ManifestDescriptor) -> Result<&str> {
    descriptor
        .table
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| descriptor.parse_error("scoped manifest has no `table` configured"))
}

fn parse_toml(descriptor: &ManifestDescriptor, text: &str) -> Result<DocumentMut> {
    text.parse::<DocumentMut>()
        .map_err(|e| descriptor.parse_error(e.to_string()))
}

fn flat_value_span(descriptor: &ManifestDescriptor, text: &str) -> Result<std::ops::Range<usize>> {
    let pattern = format!(
        r#"(?m)^[ \t]*["']?{}["']?[ \t]*(?:=|:)?[ \t]*(?:"(?P<dq>[^"\n]*)"|'(?P<sq>[^'\n]*)')"#,
        regex::escape(&descriptor.key)
    );
    let re = Regex::new(&pattern).map_err(|e| DistError::Config(e.to_string()))?;
    re.captures(text)
        .and_then(|caps| caps.name("dq").or_else(|| caps.name("sq")))
        .map(|m| m.range())
        .ok_or_else(|| descriptor.parse_error(format!("no `{}` line found", descriptor.key)))
}

/// Span of the string value of the top-level `key` in a JSON object.
fn json_value_span(descriptor: &ManifestDescriptor, text: &str) -> Result<std::ops::Range<usize>> {
    let pattern = format!(
        r#""{}"\s*:\s*"(?P<value>(?:[^"\\]|\\.)*)""#,
        regex::escape(&descriptor.key)
    );
    let re = Regex::new(&pattern).map_err(|e| DistError::Config(e.to_string()))?;
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            (json_depth_at(text, whole.start()) == Some(1)).then(|| caps.name("value"))?
        })
        .map(|m| m.range())
        .next()
        .ok_or_else(|| descriptor.parse_error(format!("no top-level `{}` found", descriptor.key)))
}

/// Nesting depth of `offset` in a JSON text, or `None` inside a string.
fn json_depth_at(text: &str, offset: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for b in &text.as_bytes()[..offset] {
        if in_string {
            if escaped {
                escaped = false;
            } else if *b == b'\\' {
                escaped = true;
            } else if *b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    (!in_string).then_some(depth)
}

/// Result of comparing every channel against the authoritative version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyReport {
    Consistent { version: String },
    Mismatches { expected: String, mismatches: Vec<Mismatch> },
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        matches!(self, ConsistencyReport::Consistent { .. })
    }

    /// Converts a mismatch report into [`DistError::VersionMismatch`].
    pub fn into_result(self) -> Result<String> {
        match self {
            ConsistencyReport::Consistent { version } => Ok(version),
            ConsistencyReport::Mismatches { expected, mismatches } => {
                Err(DistError::VersionMismatch { expected, mismatches })
            }
        }
    }
}

/// Compares found versions against `authoritative` by exact string equality.
///
/// All mismatches are reported, ordered by path so the outcome doesn't depend
/// on the order of `found`.
pub fn check_consistency(authoritative: &str, found: &[(ManifestDescriptor, String)]) -> ConsistencyReport {
    let mut mismatches: Vec<Mismatch> = found
        .iter()
        .filter(|(_, version)| version != authoritative)
        .map(|(descriptor, version)| Mismatch {
            label: descriptor.name(),
            path: descriptor.path.clone(),
            found: version.clone(),
        })
        .collect();
    if mismatches.is_empty() {
        return ConsistencyReport::Consistent {
            version: authoritative.to_string(),
        };
    }
    mismatches.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.found.cmp(&b.found)));
    ConsistencyReport::Mismatches {
        expected: authoritative.to_string(),
        mismatches,
    }
}

/// The set of version-bearing files of one project.
#[derive(Debug, Clone)]
pub struct ManifestRegistry {
    root: PathBuf,
    authoritative: ManifestDescriptor,
    channels: Vec<ManifestDescriptor>,
}

impl ManifestRegistry {
    pub fn new<P: Into<PathBuf>>(
        root: P,
        authoritative: ManifestDescriptor,
        channels: Vec<ManifestDescriptor>,
    ) -> Self {
        ManifestRegistry {
            root: root.into(),
            authoritative,
            channels,
        }
    }

    pub fn from_config<P: Into<PathBuf>>(root: P, config: &crate::config::DistConfig) -> Self {
        Self::new(root, config.authoritative.clone(), config.manifests.clone())
    }

    pub fn authoritative(&self) -> &ManifestDescriptor {
        &self.authoritative
    }

    pub fn channels(&self) -> &[ManifestDescriptor] {
        &self.channels
    }

    /// Authoritative descriptor first, then the channels in write order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ManifestDescriptor> {
        std::iter::once(&self.authoritative).chain(self.channels.iter())
    }

    pub fn resolve(&self, descriptor: &ManifestDescriptor) -> PathBuf {
        self.root.join(&descriptor.path)
    }

    fn read_text(&self, descriptor: &ManifestDescriptor) -> Result<String> {
        let path = self.resolve(descriptor);
        std::fs::read_to_string(&path).map_err(|e| DistError::Parse {
            path: descriptor.path.clone(),
            reason: format!("could not read {}: {e}", path.display()),
        })
    }

    pub fn read_version(&self, descriptor: &ManifestDescriptor) -> Result<String> {
        let text = self.read_text(descriptor)?;
        extract_version(descriptor, &text)
    }

    pub fn write_version(&self, descriptor: &ManifestDescriptor, version: &Version) -> Result<()> {
        let text = self.read_text(descriptor)?;
        let updated = rewrite_version(descriptor, &text, version)?;
        if updated != text {
            std::fs::write(self.resolve(descriptor), updated)?;
        }
        Ok(())
    }

    /// The version in the authoritative descriptor, which must be valid semver.
    pub fn authoritative_version(&self) -> Result<Version> {
        let raw = self.read_version(&self.authoritative)?;
        Version::parse(&raw).map_err(|e| {
            self.authoritative
                .parse_error(format!("`{raw}` is not a semantic version: {e}"))
        })
    }

    /// Reads every descriptor, authoritative first.
    pub fn snapshot(&self) -> Result<Vec<(ManifestDescriptor, String)>> {
        self.descriptors()
            .map(|d| Ok((d.clone(), self.read_version(d)?)))
            .collect()
    }

    /// Compares every channel on disk against the authoritative version.
    pub fn check_consistency(&self) -> Result<ConsistencyReport> {
        let authoritative = self.read_version(&self.authoritative)?;
        let found = self
            .channels
            .iter()
            .map(|d| Ok((d.clone(), self.read_version(d)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(check_consistency(&authoritative, &found))
    }

    /// Computes every rewrite for `version` in memory without touching disk.
    ///
    /// Each staged text is re-derived and cross-checked against `version`.
    pub fn stage(&self, version: &Version) -> Result<StagedRelease> {
        let mut files = Vec::new();
        for descriptor in self.descriptors() {
            let original = self.read_text(descriptor)?;
            let updated = rewrite_version(descriptor, &original, version)?;
            files.push(StagedFile {
                descriptor: descriptor.clone(),
                path: self.resolve(descriptor),
                original,
                updated,
            });
        }
        let derived = files
            .iter()
            .map(|f| Ok((f.descriptor.clone(), extract_version(&f.descriptor, &f.updated)?)))
            .collect::<Result<Vec<_>>>()?;
        check_consistency(&version.to_string(), &derived).into_result()?;
        Ok(StagedRelease { files })
    }
}

#[derive(Debug, Clone)]
pub struct StagedFile {
    pub descriptor: ManifestDescriptor,
    pub path: PathBuf,
    original: String,
    updated: String,
}

/// All manifest rewrites of one release, held in memory until applied.
#[derive(Debug, Clone)]
pub struct StagedRelease {
    files: Vec<StagedFile>,
}

impl StagedRelease {
    /// Paths relative to the project root, in write order.
    pub fn relative_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.descriptor.path.clone()).collect()
    }

    /// Writes every staged file in order.
    ///
    /// If a write fails, files already written are restored before the
    /// error is returned.
    pub fn apply(&self) -> Result<UndoLog> {
        let mut undo = UndoLog::default();
        for file in &self.files {
            // recorded first so a write that truncates and then fails is restored too
            undo.entries.push((file.path.clone(), file.original.clone()));
            if let Err(e) = std::fs::write(&file.path, &file.updated) {
                log::error!("writing {} failed: {e}", file.path.display());
                undo.restore();
                return Err(e.into());
            }
            log::info!("{} updated", file.descriptor.name());
        }
        Ok(undo)
    }
}

/// Original contents of files written by [`StagedRelease::apply`].
#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<(PathBuf, String)>,
}

impl UndoLog {
    /// Puts the original contents back, newest first. Best-effort: failures
    /// are logged and the remaining files are still restored.
    pub fn restore(&mut self) -> usize {
        let mut restored = 0;
        while let Some((path, original)) = self.entries.pop() {
            match std::fs::write(&path, original) {
                Ok(()) => restored += 1,
                Err(e) => log::error!("could not restore {}: {e}", path.display()),
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    const PACKAGE_JSON: &str = r#"{
  "name": "vanity_crypto",
  "version": "1.2.0",
  "engines": {
    "node": ">=16"
  },
  "bin": {
    "vc": "npm/bin/vc"
  }
}
"#;

    const CARGO_TOML: &str = r#"[workspace]
members = ["crates/core", "crates/cli"]
resolver = "2"

[workspace.dependencies]
serde = { version = "1.0", features = ["derive"] }

[workspace.package]
version = "1.2.0" # kept in sync by vc-dist
edition = "2021"
"#;

    const FORMULA: &str = r#"class VanityCrypto < Formula
  desc "Vanity address generator"
  homepage "https://github.com/athexweb3/vanity_crypto"
  version "1.2.0"

  if OS.linux?
    url "https://github.com/athexweb3/vanity_crypto/releases/download/v#{version}/vc-linux-amd64"
  end
end
"#;

    fn json() -> ManifestDescriptor {
        ManifestDescriptor::new("package.json", "package.json", SyntaxKind::StructuredKeyValueDocument)
    }

    fn cargo() -> ManifestDescriptor {
        ManifestDescriptor::new("Cargo.toml", "Cargo.toml", SyntaxKind::ScopedKeyValueText)
            .with_table("workspace.package")
    }

    fn formula() -> ManifestDescriptor {
        ManifestDescriptor::new("Homebrew formula", "Formula/vanity_crypto.rb", SyntaxKind::FlatKeyValueText)
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_extract_each_syntax() {
        assert_eq!(extract_version(&json(), PACKAGE_JSON).unwrap(), "1.2.0");
        assert_eq!(extract_version(&cargo(), CARGO_TOML).unwrap(), "1.2.0");
        assert_eq!(extract_version(&formula(), FORMULA).unwrap(), "1.2.0");
    }

    #[test]
    fn test_round_trip_with_prerelease() {
        let target = v("1.3.0-beta.2");
        for (descriptor, text) in [(json(), PACKAGE_JSON), (cargo(), CARGO_TOML), (formula(), FORMULA)] {
            let updated = rewrite_version(&descriptor, text, &target).unwrap();
            assert_eq!(extract_version(&descriptor, &updated).unwrap(), "1.3.0-beta.2");
        }
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let target = v("2.0.0-rc.1");
        for (descriptor, text) in [(json(), PACKAGE_JSON), (cargo(), CARGO_TOML), (formula(), FORMULA)] {
            let once = rewrite_version(&descriptor, text, &target).unwrap();
            let twice = rewrite_version(&descriptor, &once, &target).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_rewrite_preserves_surrounding_bytes() {
        let target = v("1.2.1");
        let formula_out = rewrite_version(&formula(), FORMULA, &target).unwrap();
        assert_eq!(formula_out, FORMULA.replacen("version \"1.2.0\"", "version \"1.2.1\"", 1));

        let json_out = rewrite_version(&json(), PACKAGE_JSON, &target).unwrap();
        assert_eq!(json_out, PACKAGE_JSON.replacen("\"1.2.0\"", "\"1.2.1\"", 1));

        let toml_out = rewrite_version(&cargo(), CARGO_TOML, &target).unwrap();
        assert_eq!(
            toml_out,
            CARGO_TOML.replace("version = \"1.2.0\"", "version = \"1.2.1\"")
        );
        assert!(toml_out.contains("\"1.2.1\" # kept in sync by vc-dist"));
    }

    #[test]
    fn test_scoped_ignores_unrelated_version_fields() {
        let updated = rewrite_version(&cargo(), CARGO_TOML, &v("9.9.9")).unwrap();
        assert!(updated.contains(r#"serde = { version = "1.0", features = ["derive"] }"#));
        assert_eq!(extract_version(&cargo(), &updated).unwrap(), "9.9.9");
    }

    #[test]
    fn test_scoped_missing_table() {
        let err = extract_version(&cargo(), "[package]\nversion = \"0.1.0\"\n").unwrap_err();
        assert!(matches!(err, DistError::Parse { .. }));
        let unscoped = ManifestDescriptor::new("c", "Cargo.toml", SyntaxKind::ScopedKeyValueText);
        assert!(matches!(extract_version(&unscoped, CARGO_TOML), Err(DistError::Parse { .. })));
    }

    #[test]
    fn test_json_skips_nested_version() {
        let text = r#"{
  "dependencies": { "version": "0.0.1" },
  "description": "prints \"version\": \"x\"",
  "version": "1.0.0"
}"#;
        assert_eq!(extract_version(&json(), text).unwrap(), "1.0.0");
        let updated = rewrite_version(&json(), text, &v("1.0.1")).unwrap();
        assert!(updated.contains(r#"{ "version": "0.0.1" }"#));
        assert!(updated.contains(r#""version": "1.0.1""#));
    }

    #[test]
    fn test_json_missing_version() {
        let err = extract_version(&json(), r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, DistError::Parse { .. }));
        assert!(rewrite_version(&json(), "not json", &v("1.0.0")).is_err());
    }

    #[test]
    fn test_flat_variants() {
        let d = ManifestDescriptor::new("f", "f", SyntaxKind::FlatKeyValueText);
        assert_eq!(extract_version(&d, "version = '0.1.0'\n").unwrap(), "0.1.0");
        assert_eq!(extract_version(&d, "  \"version\": \"0.2.0\",\n").unwrap(), "0.2.0");
        assert_eq!(extract_version(&d, "versioning \"x\"\nversion \"0.3.0\"\n").unwrap(), "0.3.0");
        assert!(matches!(extract_version(&d, "desc \"no version here\"\n"), Err(DistError::Parse { .. })));
    }

    #[test]
    fn test_exact_string_equality() {
        let found = vec![(formula(), "1.2.0-0".to_string())];
        let report = check_consistency("1.2.0", &found);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_consistency_reports_all_and_is_order_independent() {
        let scoop = ManifestDescriptor::new("Scoop manifest", "scoop/vanity_crypto.json", SyntaxKind::StructuredKeyValueDocument);
        let found = vec![
            (cargo(), "1.1.0".to_string()),
            (formula(), "1.1.9".to_string()),
            (scoop, "1.2.0".to_string()),
        ];
        let mut reversed = found.clone();
        reversed.reverse();

        let a = check_consistency("1.2.0", &found);
        let b = check_consistency("1.2.0", &reversed);
        assert_eq!(a, b);
        match a {
            ConsistencyReport::Mismatches { mismatches, .. } => assert_eq!(mismatches.len(), 2),
            other => panic!("expected mismatches, got {other:?}"),
        }
    }

    fn write_fixture(root: &Path, package: &str, cargo_version: &str, formula_version: &str) {
        std::fs::create_dir_all(root.join("Formula")).unwrap();
        std::fs::write(root.join("package.json"), PACKAGE_JSON.replace("1.2.0", package)).unwrap();
        std::fs::write(root.join("Cargo.toml"), CARGO_TOML.replace("1.2.0", cargo_version)).unwrap();
        std::fs::write(root.join("Formula/vanity_crypto.rb"), FORMULA.replace("1.2.0", formula_version)).unwrap();
    }

    fn registry(root: &Path) -> ManifestRegistry {
        ManifestRegistry::new(root, json(), vec![cargo(), formula()])
    }

    #[test]
    fn test_registry_reports_single_formula_mismatch() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path(), "1.2.0", "1.2.0", "1.1.9");
        let report = registry(dir.path()).check_consistency().unwrap();
        assert_eq!(
            report,
            ConsistencyReport::Mismatches {
                expected: "1.2.0".to_string(),
                mismatches: vec![Mismatch {
                    label: "Homebrew formula".to_string(),
                    path: PathBuf::from("Formula/vanity_crypto.rb"),
                    found: "1.1.9".to_string(),
                }],
            }
        );
    }

    #[test]
    fn test_registry_write_and_read() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path(), "1.2.0", "1.2.0", "1.2.0");
        let registry = registry(dir.path());
        registry.write_version(&formula(), &v("1.2.1-alpha.0")).unwrap();
        assert_eq!(registry.read_version(&formula()).unwrap(), "1.2.1-alpha.0");
        assert_eq!(registry.authoritative_version().unwrap(), v("1.2.0"));
    }

    #[test]
    fn test_stage_does_not_touch_disk_until_applied() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path(), "1.2.0", "1.2.0", "1.2.0");
        let registry = registry(dir.path());

        let staged = registry.stage(&v("1.3.0")).unwrap();
        assert_eq!(registry.read_version(&formula()).unwrap(), "1.2.0");
        assert_eq!(
            staged.relative_paths(),
            vec![
                PathBuf::from("package.json"),
                PathBuf::from("Cargo.toml"),
                PathBuf::from("Formula/vanity_crypto.rb"),
            ]
        );

        let mut undo = staged.apply().unwrap();
        assert!(registry.check_consistency().unwrap().is_consistent());
        assert_eq!(registry.authoritative_version().unwrap(), v("1.3.0"));

        assert_eq!(undo.restore(), 3);
        assert_eq!(registry.authoritative_version().unwrap(), v("1.2.0"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Cargo.toml")).unwrap(),
            CARGO_TOML
        );
    }

    #[test]
    fn test_apply_failure_restores_written_files() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path(), "1.2.0", "1.2.0", "1.2.0");
        let registry = registry(dir.path());
        let staged = registry.stage(&v("1.3.0")).unwrap();

        let formula_path = dir.path().join("Formula/vanity_crypto.rb");
        std::fs::remove_file(&formula_path).unwrap();
        std::fs::create_dir(&formula_path).unwrap();

        assert!(matches!(staged.apply(), Err(DistError::Io(_))));
        assert_eq!(registry.authoritative_version().unwrap(), v("1.2.0"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Cargo.toml")).unwrap(),
            CARGO_TOML
        );
        assert!(formula_path.is_dir());
    }

    #[test]
    fn test_scoped_rewrite_keeps_literal_quotes() {
        let text = "[workspace.package]\nversion = '1.2.0' # pinned\nedition = \"2021\"\n";
        let updated = rewrite_version(&cargo(), text, &v("1.3.0")).unwrap();
        assert_eq!(
            updated,
            "[workspace.package]\nversion = '1.3.0' # pinned\nedition = \"2021\"\n"
        );
        assert_eq!(rewrite_version(&cargo(), &updated, &v("1.3.0")).unwrap(), updated);
    }

    #[test]
    fn test_stage_fails_on_unparseable_manifest() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path(), "1.2.0", "1.2.0", "1.2.0");
        std::fs::write(dir.path().join("Formula/vanity_crypto.rb"), "class X\nend\n").unwrap();
        let registry = registry(dir.path());
        assert!(matches!(registry.stage(&v("1.3.0")), Err(DistError::Parse { .. })));
        assert_eq!(registry.read_version(&cargo()).unwrap(), "1.2.0");
    }
}
