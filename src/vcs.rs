use std::path::{Path, PathBuf};
use std::process::Command;
use crate::error::{DistError, Result};

/// The version-control operations a release needs.
pub trait VersionControl {
    /// Stages exactly `paths` (relative to the repository root).
    fn stage(&mut self, paths: &[PathBuf]) -> Result<()>;
    fn commit(&mut self, message: &str) -> Result<()>;
    /// Creates `name`; annotated with `message` when one is given.
    fn tag(&mut self, name: &str, message: Option<&str>) -> Result<()>;
    /// Pushes the current branch to `remote`.
    fn push(&mut self, remote: &str) -> Result<()>;
    fn push_tag(&mut self, remote: &str, tag: &str) -> Result<()>;
}

/// Runs the `git` executable in a working tree.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
    program: String,
}

impl Git {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Git {
            root: root.as_ref().to_path_buf(),
            program: "git".to_string(),
        }
    }

    /// Uses a different executable instead of `git` from `PATH`.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let display = format!("{} {}", self.program, args.join(" "));
        println!("> {display}");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| DistError::VersionControl {
                command: display.clone(),
                output: e.to_string(),
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DistError::VersionControl {
                command: display,
                output: format!("{}{}", stdout, stderr).trim().to_string(),
            });
        }
        log::debug!("{display}: {}", stdout.trim());
        Ok(stdout)
    }
}

impl VersionControl for Git {
    fn stage(&mut self, paths: &[PathBuf]) -> Result<()> {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args).map(|_| ())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    fn tag(&mut self, name: &str, message: Option<&str>) -> Result<()> {
        let result = match message {
            Some(message) => self.run(&["tag", "-a", name, "-m", message]),
            None => self.run(&["tag", name]),
        };
        result.map(|_| ())
    }

    fn push(&mut self, remote: &str) -> Result<()> {
        self.run(&["push", remote]).map(|_| ())
    }

    fn push_tag(&mut self, remote: &str, tag: &str) -> Result<()> {
        self.run(&["push", remote, tag]).map(|_| ())
    }
}
