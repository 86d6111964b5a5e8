//! # vc-dist Core Library
//!
//! This crate contains the logic behind distributing the `vc` vanity address generator:
//! installing the right prebuilt binary for the host, and keeping the release version in
//! sync across every channel it is published through (npm, Cargo, Homebrew, Scoop).
//!
//! The library is built for the `vc-dist` CLI, but every component takes its
//! configuration explicitly so it can serve other projects and tests unchanged.
//!
//! ## Modules Overview
//! - [`platform`] – Mapping (os, arch) to release asset names
//! - [`fetch`] – Downloading assets with bounded redirects and atomic installs
//! - [`installer`] – Glue between platform resolution, checksums and fetching
//! - [`manifest`] – Reading, rewriting and cross-checking version-bearing files
//! - [`bump`] – Semantic version increments
//! - [`release`] – The interactive bump, commit, tag and push workflow
//! - [`vcs`] – Version-control operations used by a release
//! - [`prompt`] – Interactive questions
//! - [`config`] – `dist.toml` project configuration
//! - [`error`] – Error types
//! - [`util`] – Shared utilities (paths, hashing, URLs)


pub mod error;
pub mod config;
pub mod platform;
pub mod fetch;
pub mod installer;
pub mod manifest;
pub mod bump;
pub mod vcs;
pub mod prompt;
pub mod release;
pub mod util;

pub use error::{DistError, DownloadError, Mismatch};
pub use config::*;
pub use platform::*;
pub use fetch::*;
pub use installer::*;
pub use manifest::*;
pub use bump::*;
pub use release::*;
pub use util::*;
