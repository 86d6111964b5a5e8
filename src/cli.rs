use std::path::PathBuf;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Project root containing the manifests. Defaults to the current directory
    #[clap(long, global = true)]
    pub(crate) root: Option<PathBuf>,
    /// Configuration file. Defaults to `<root>/dist.toml`
    #[clap(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// More output; repeat for debug logs
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
    #[command(subcommand)]
    pub(crate) command: DistCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum DistCommand {
    /// Downloads the prebuilt binary for this platform
    Install {
        /// Release to install. Defaults to the version in the authoritative manifest
        #[clap(long)]
        version: Option<String>,
        /// Directory to install into. Defaults to the per-user data directory
        #[clap(long)]
        dir: Option<PathBuf>,
        /// Override the detected operating system
        #[clap(long)]
        os: Option<String>,
        /// Override the detected CPU architecture
        #[clap(long)]
        arch: Option<String>,
    },
    /// Verifies every manifest carries the authoritative version
    Check,
    /// Bumps the version everywhere, then commits, tags and optionally pushes
    Release,
    /// Prints the asset and URL `install` would use
    Platform {
        #[clap(long)]
        os: Option<String>,
        #[clap(long)]
        arch: Option<String>,
        #[clap(long)]
        version: Option<String>,
    },
    /// Writes a default `dist.toml`
    Init,
}
