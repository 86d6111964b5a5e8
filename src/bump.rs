use std::fmt;
use semver::{BuildMetadata, Prerelease, Version};
use crate::error::{DistError, Result};

/// The kind of version bump an operator can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
    Prerelease,
    Prepatch,
    Preminor,
    Premajor,
    Custom,
}

impl BumpKind {
    pub const ALL: [BumpKind; 8] = [
        BumpKind::Patch,
        BumpKind::Minor,
        BumpKind::Major,
        BumpKind::Prerelease,
        BumpKind::Prepatch,
        BumpKind::Preminor,
        BumpKind::Premajor,
        BumpKind::Custom,
    ];

    /// Whether the bump produces a prerelease and needs an identifier.
    pub fn takes_identifier(self) -> bool {
        matches!(
            self,
            BumpKind::Prerelease | BumpKind::Prepatch | BumpKind::Preminor | BumpKind::Premajor
        )
    }

    /// Menu entry shown to the operator.
    pub fn describe(self) -> &'static str {
        match self {
            BumpKind::Patch => "Patch (0.0.X)",
            BumpKind::Minor => "Minor (0.X.0)",
            BumpKind::Major => "Major (X.0.0)",
            BumpKind::Prerelease => "Pre-release (Prerelease)",
            BumpKind::Prepatch => "Pre-patch (Prepatch)",
            BumpKind::Preminor => "Pre-minor (Preminor)",
            BumpKind::Premajor => "Pre-major (Premajor)",
            BumpKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Computes the next version for every kind except [`BumpKind::Custom`].
///
/// Follows the increment rules of npm's `semver.inc`: bumping a prerelease
/// to its release drops the prerelease instead of incrementing, and the first
/// prerelease of a new version ends in `.0`.
///
/// # Errors
///
/// [`DistError::InvalidVersionInput`] for `Custom` or an identifier that is
/// not a valid prerelease identifier.
pub fn increment(current: &Version, kind: BumpKind, identifier: &str) -> Result<Version> {
    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;
    match kind {
        BumpKind::Patch => bump_patch(&mut next)?,
        BumpKind::Minor => bump_minor(&mut next)?,
        BumpKind::Major => bump_major(&mut next)?,
        BumpKind::Prepatch => {
            next.pre = Prerelease::EMPTY;
            bump_patch(&mut next)?;
            bump_pre(&mut next, identifier)?;
        }
        BumpKind::Preminor => {
            next.pre = Prerelease::EMPTY;
            bump_minor(&mut next)?;
            bump_pre(&mut next, identifier)?;
        }
        BumpKind::Premajor => {
            next.pre = Prerelease::EMPTY;
            bump_major(&mut next)?;
            bump_pre(&mut next, identifier)?;
        }
        BumpKind::Prerelease => {
            if next.pre.is_empty() {
                bump_patch(&mut next)?;
            }
            bump_pre(&mut next, identifier)?;
        }
        BumpKind::Custom => {
            return Err(DistError::InvalidVersionInput {
                input: current.to_string(),
                reason: "custom versions are entered, not computed".to_string(),
            });
        }
    }
    Ok(next)
}

fn bump_patch(v: &mut Version) -> Result<()> {
    if v.pre.is_empty() {
        v.patch = step(v, v.patch)?;
    }
    v.pre = Prerelease::EMPTY;
    Ok(())
}

fn bump_minor(v: &mut Version) -> Result<()> {
    if v.patch != 0 || v.pre.is_empty() {
        v.minor = step(v, v.minor)?;
    }
    v.patch = 0;
    v.pre = Prerelease::EMPTY;
    Ok(())
}

fn bump_major(v: &mut Version) -> Result<()> {
    if v.minor != 0 || v.patch != 0 || v.pre.is_empty() {
        v.major = step(v, v.major)?;
    }
    v.minor = 0;
    v.patch = 0;
    v.pre = Prerelease::EMPTY;
    Ok(())
}

fn step(v: &Version, n: u64) -> Result<u64> {
    n.checked_add(1).ok_or_else(|| DistError::InvalidVersionInput {
        input: v.to_string(),
        reason: format!("{n} cannot be incremented"),
    })
}

fn bump_pre(v: &mut Version, identifier: &str) -> Result<()> {
    let identifier = identifier.trim();
    let fresh: Vec<String> = if identifier.is_empty() {
        vec!["0".to_string()]
    } else {
        vec![identifier.to_string(), "0".to_string()]
    };

    let mut parts: Vec<String> = if v.pre.is_empty() {
        Vec::new()
    } else {
        v.pre.as_str().split('.').map(str::to_string).collect()
    };

    if parts.is_empty() {
        parts = fresh;
    } else {
        match parts.iter_mut().rev().find_map(|p| p.parse::<u64>().ok().map(|n| (p, n))) {
            Some((part, n)) => {
                *part = n
                    .checked_add(1)
                    .ok_or_else(|| DistError::InvalidVersionInput {
                        input: v.to_string(),
                        reason: format!("prerelease number {n} cannot be incremented"),
                    })?
                    .to_string();
            }
            None => parts.push("0".to_string()),
        }
        if !identifier.is_empty() {
            let same_series = parts[0] == identifier
                && parts.get(1).is_some_and(|p| p.parse::<u64>().is_ok());
            if !same_series {
                parts = fresh;
            }
        }
    }

    let joined = parts.join(".");
    v.pre = Prerelease::new(&joined).map_err(|e| DistError::InvalidVersionInput {
        input: identifier.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Parses an operator-entered version. A leading `v` is accepted.
///
/// # Errors
///
/// [`DistError::InvalidVersionInput`] if the text isn't a semantic version.
pub fn parse_custom(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let candidate = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(candidate).map_err(|e| DistError::InvalidVersionInput {
        input: input.to_string(),
        reason: e.to_string(),
    })
}
