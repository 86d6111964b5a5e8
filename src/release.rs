use std::fmt;
use colored::Colorize;
use semver::Version;
use crate::bump::{increment, parse_custom, BumpKind};
use crate::config::ReleaseSettings;
use crate::error::{DistError, Result};
use crate::manifest::ManifestRegistry;
use crate::prompt::Prompter;
use crate::vcs::VersionControl;

/// Where a release operation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    Idle,
    BumpSelected,
    VersionComputed,
    FilesUpdated,
    Verified,
    Committed,
    Tagged,
    PushedOrSkipped,
    Done,
    Aborted,
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a release operation ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released {
        version: Version,
        tag: String,
        pushed: bool,
    },
    /// The operator declined or cancelled; nothing was written.
    Aborted { at: ReleaseStage },
}

/// Drives one interactive version bump from selection to push.
pub struct ReleaseCoordinator<'a, P: Prompter, V: VersionControl> {
    registry: &'a ManifestRegistry,
    settings: &'a ReleaseSettings,
    prompter: P,
    vcs: V,
    stage: ReleaseStage,
    failed_at: Option<ReleaseStage>,
}

impl<'a, P: Prompter, V: VersionControl> ReleaseCoordinator<'a, P, V> {
    pub fn new(registry: &'a ManifestRegistry, settings: &'a ReleaseSettings, prompter: P, vcs: V) -> Self {
        ReleaseCoordinator {
            registry,
            settings,
            prompter,
            vcs,
            stage: ReleaseStage::Idle,
            failed_at: None,
        }
    }

    pub fn stage(&self) -> ReleaseStage {
        self.stage
    }

    /// The step that failed and rolled the release back, if any.
    pub fn failed_at(&self) -> Option<ReleaseStage> {
        self.failed_at
    }

    pub fn into_parts(self) -> (P, V) {
        (self.prompter, self.vcs)
    }

    fn advance(&mut self, stage: ReleaseStage) {
        log::debug!("release: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, step: ReleaseStage) {
        self.failed_at = Some(step);
        self.advance(ReleaseStage::Aborted);
    }

    fn abort(&mut self) -> ReleaseOutcome {
        let at = self.stage;
        self.advance(ReleaseStage::Aborted);
        println!("Cancelled.");
        ReleaseOutcome::Aborted { at }
    }

    /// Runs the release.
    ///
    /// # Errors
    ///
    /// Parse, write, verification and version-control failures stop the
    /// release at the failing step. Failures before the commit exists put the
    /// original manifest contents back.
    pub fn run(&mut self) -> Result<ReleaseOutcome> {
        let current = self.registry.authoritative_version()?;
        println!("Automated Release (Current: {current})");

        let options: Vec<String> = BumpKind::ALL.iter().map(|k| k.describe().to_string()).collect();
        let kind = match self.prompter.select("Select release type:", &options)? {
            Some(index) => BumpKind::ALL[index],
            None => return Ok(self.abort()),
        };
        self.advance(ReleaseStage::BumpSelected);

        let target = match self.compute_version(&current, kind)? {
            Some(target) => target,
            None => return Ok(self.abort()),
        };
        self.advance(ReleaseStage::VersionComputed);

        let tag = self.settings.tag_name(&target);
        let question = format!("Bump versions to {target} and create git tag?");
        if !self.prompter.confirm(&question, true)? {
            return Ok(self.abort());
        }

        println!("\nUpdating files...");
        let staged = self.registry.stage(&target)?;
        let mut undo = staged.apply()?;
        self.advance(ReleaseStage::FilesUpdated);

        println!("\nRunning verification...");
        let verified = self
            .registry
            .check_consistency()
            .and_then(|report| report.into_result());
        if let Err(e) = verified {
            eprintln!("{}", "Verification failed. Aborting commit.".red());
            undo.restore();
            self.fail(ReleaseStage::Verified);
            return Err(e);
        }
        self.advance(ReleaseStage::Verified);

        println!("\nCommitting and Tagging...");
        let message = self.settings.commit_message_for(&target);
        let committed = self
            .vcs
            .stage(&staged.relative_paths())
            .and_then(|()| self.vcs.commit(&message));
        if let Err(e) = committed {
            let restored = undo.restore();
            log::warn!("restored {restored} manifest(s) after failed commit");
            self.fail(ReleaseStage::Committed);
            return Err(e);
        }
        self.advance(ReleaseStage::Committed);

        let annotation = self.settings.annotated_tag.then(|| message.clone());
        self.vcs.tag(&tag, annotation.as_deref())?;
        self.advance(ReleaseStage::Tagged);
        println!("{}", format!("Successfully tagged {tag}").green());

        let remote = self.settings.remote.clone();
        let pushed = if self.prompter.confirm("Push changes and tag now?", true)? {
            self.vcs.push(&remote)?;
            self.vcs.push_tag(&remote, &tag)?;
            println!("{}", "Pushed! CI will start building.".green());
            true
        } else {
            println!(
                "{}",
                format!("Remember to push manually: git push {remote} && git push {remote} {tag}").yellow()
            );
            false
        };
        self.advance(ReleaseStage::PushedOrSkipped);
        self.advance(ReleaseStage::Done);

        Ok(ReleaseOutcome::Released {
            version: target,
            tag,
            pushed,
        })
    }

    /// Asks for whatever `kind` needs and computes the target version.
    /// Returns `None` if the operator cancels.
    fn compute_version(&mut self, current: &Version, kind: BumpKind) -> Result<Option<Version>> {
        if kind == BumpKind::Custom {
            loop {
                let Some(input) = self.prompter.text("Enter custom version:", None)? else {
                    return Ok(None);
                };
                match parse_custom(&input) {
                    Ok(version) => return Ok(Some(version)),
                    Err(e @ DistError::InvalidVersionInput { .. }) => {
                        eprintln!("{}", format!("Invalid semver: {e}").red());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if !kind.takes_identifier() {
            return increment(current, kind, "").map(Some);
        }
        let default = self.settings.default_preid.clone();
        loop {
            let identifier = match self.prompter.text(
                "Enter prerelease identifier (e.g., alpha, beta, rc):",
                Some(default.as_str()),
            )? {
                Some(id) if id.trim().is_empty() => default.clone(),
                Some(id) => id.trim().to_string(),
                None => return Ok(None),
            };
            match increment(current, kind, &identifier) {
                Ok(version) => return Ok(Some(version)),
                Err(e @ DistError::InvalidVersionInput { .. }) => {
                    eprintln!("{}", format!("Invalid prerelease identifier: {e}").red());
                }
                Err(e) => return Err(e),
            }
        }
    }
}
