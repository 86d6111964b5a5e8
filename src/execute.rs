use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use semver::Version;
use vc_dist::config::{config_path, DistConfig};
use vc_dist::installer::{install_binary, plan_install};
use vc_dist::manifest::{ConsistencyReport, ManifestRegistry};
use vc_dist::prompt::TerminalPrompter;
use vc_dist::release::{ReleaseCoordinator, ReleaseOutcome};
use vc_dist::util::{current_platform, default_install_dir, is_executable};
use vc_dist::vcs::Git;
use crate::cli::{DistCommand, CLI};

pub fn execute(cli: CLI) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let config_file = config_path(&root, cli.config);
    let load = || DistConfig::load_or_default(&config_file);

    match cli.command {
        DistCommand::Install { version, dir, os, arch } => {
            execute_install(&root, &load()?, version, dir, os, arch)
        }
        DistCommand::Check => {
            execute_check(&root, &load()?)
        }
        DistCommand::Release => {
            execute_release(&root, &load()?)
        }
        DistCommand::Platform { os, arch, version } => {
            execute_platform(&root, &load()?, version, os, arch)
        }
        DistCommand::Init => {
            execute_init(&config_file)
        }
    }
}

fn resolve_version(root: &Path, config: &DistConfig, version: Option<String>) -> Result<Version> {
    match version {
        Some(version) => Ok(vc_dist::bump::parse_custom(&version)?),
        None => {
            let registry = ManifestRegistry::from_config(root, config);
            registry
                .authoritative_version()
                .with_context(|| format!("Could not determine the version to install from {}", config.authoritative))
        }
    }
}

fn resolve_platform(os: Option<String>, arch: Option<String>) -> (String, String) {
    let (host_os, host_arch) = current_platform();
    (
        os.unwrap_or_else(|| host_os.to_string()),
        arch.unwrap_or_else(|| host_arch.to_string()),
    )
}

pub fn execute_install(
    root: &Path,
    config: &DistConfig,
    version: Option<String>,
    dir: Option<PathBuf>,
    os: Option<String>,
    arch: Option<String>,
) -> Result<()> {
    let version = resolve_version(root, config, version)?;
    let (os, arch) = resolve_platform(os, arch);
    let dir = match dir {
        Some(dir) => dir,
        None => default_install_dir(&config.project.bin_name)?,
    };
    let plan = plan_install(config, &version, &os, &arch, &dir)?;
    let artifact = install_binary(config, &plan)?;
    if !is_executable(&artifact.path) {
        log::warn!("{} is not marked executable", artifact.path.display());
    }
    println!("{}", "Download completed.".green());
    println!("Installed {} {} to {}", config.project.bin_name, version, artifact.path.display());
    log::debug!("sha256 {}", artifact.sha256);
    Ok(())
}

pub fn execute_platform(
    root: &Path,
    config: &DistConfig,
    version: Option<String>,
    os: Option<String>,
    arch: Option<String>,
) -> Result<()> {
    let version = resolve_version(root, config, version)?;
    let (os, arch) = resolve_platform(os, arch);
    let plan = plan_install(config, &version, &os, &arch, Path::new("."))?;
    println!("asset: {}", plan.asset);
    println!("url:   {}", plan.url);
    println!("file:  {}", plan.target.binary_file_name(&config.project.bin_name));
    Ok(())
}

pub fn execute_check(root: &Path, config: &DistConfig) -> Result<()> {
    println!("Verifying version consistency...");
    let registry = ManifestRegistry::from_config(root, config);
    for (descriptor, version) in registry.snapshot()? {
        println!("  {}: {}", descriptor, version);
    }
    match registry.check_consistency()? {
        ConsistencyReport::Consistent { version } => {
            println!("{}", format!("All versions match! ({version})").green());
            Ok(())
        }
        ConsistencyReport::Mismatches { expected, mismatches } => {
            for mismatch in &mismatches {
                eprintln!("{}", format!("Mismatch: {mismatch}").red());
            }
            eprintln!(
                "{}",
                format!("Versions do not match {} ({expected})", registry.authoritative()).red()
            );
            eprintln!("{}", "Publishing aborted. Please sync ALL versions before releasing.".red());
            bail!("{} manifest(s) out of sync", mismatches.len())
        }
    }
}

pub fn execute_release(root: &Path, config: &DistConfig) -> Result<()> {
    let registry = ManifestRegistry::from_config(root, config);
    let mut coordinator = ReleaseCoordinator::new(&registry, &config.release, TerminalPrompter, Git::new(root));
    match coordinator.run() {
        Ok(ReleaseOutcome::Released { version, tag, pushed }) => {
            log::info!("released {version} as {tag} (pushed: {pushed})");
            Ok(())
        }
        Ok(ReleaseOutcome::Aborted { .. }) => Ok(()),
        Err(e) => {
            let context = match coordinator.failed_at() {
                Some(step) => format!("Release failed at stage {step}; manifests were restored"),
                None => format!("Release stopped after stage {}", coordinator.stage()),
            };
            Err(e).context(context)
        }
    }
}

pub fn execute_init(config_file: &Path) -> Result<()> {
    if config_file.exists() {
        bail!("{} already exists", config_file.display());
    }
    DistConfig::default().save(config_file)?;
    println!("Created {}", config_file.display());
    Ok(())
}
