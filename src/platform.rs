use crate::error::{DistError, Result};

/// A platform with a published release asset.
///
/// `os` and `arch` are the names used in asset file names
/// (`vc-macos-arm64`, `vc-windows-amd64.exe`, ...), not the host's own spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTarget {
    pub os: &'static str,
    pub arch: &'static str,
    /// Suffix of the installed binary: empty, or `.exe` on Windows.
    pub extension: &'static str,
}

const SUPPORTED: &[(&str, &str, PlatformTarget)] = &[
    ("macos", "aarch64", PlatformTarget { os: "macos", arch: "arm64", extension: "" }),
    ("macos", "x86_64", PlatformTarget { os: "macos", arch: "amd64", extension: "" }),
    ("linux", "x86_64", PlatformTarget { os: "linux", arch: "amd64", extension: "" }),
    ("windows", "x86_64", PlatformTarget { os: "windows", arch: "amd64", extension: ".exe" }),
    ("freebsd", "x86_64", PlatformTarget { os: "freebsd", arch: "amd64", extension: "" }),
];

impl PlatformTarget {
    /// Name of the release asset for `bin_name`, e.g. `vc-linux-amd64`.
    pub fn asset_name(&self, bin_name: &str) -> String {
        format!("{}-{}-{}{}", bin_name, self.os, self.arch, self.extension)
    }

    /// File name of the installed binary, e.g. `vc` or `vc.exe`.
    pub fn binary_file_name(&self, bin_name: &str) -> String {
        format!("{}{}", bin_name, self.extension)
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

/// Resolves the release target for an operating system and CPU architecture.
///
/// Accepts both Rust's spelling (`std::env::consts`, e.g. `macos`/`aarch64`)
/// and Node's (`darwin`/`arm64`, `win32`/`x64`).
///
/// # Errors
///
/// Returns [`DistError::UnsupportedPlatform`] naming both inputs when the pair
/// has no published asset.
pub fn resolve_target(os: &str, arch: &str) -> Result<PlatformTarget> {
    let (norm_os, norm_arch) = (normalize_os(os), normalize_arch(arch));
    SUPPORTED
        .iter()
        .find(|(o, a, _)| *o == norm_os && *a == norm_arch)
        .map(|(_, _, target)| *target)
        .ok_or_else(|| DistError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn normalize_os(os: &str) -> String {
    let os = os.trim().to_ascii_lowercase();
    match os.as_str() {
        "darwin" | "osx" | "mac" => "macos".to_string(),
        "win32" | "win" => "windows".to_string(),
        _ => os,
    }
}

fn normalize_arch(arch: &str) -> String {
    let arch = arch.trim().to_ascii_lowercase();
    match arch.as_str() {
        "arm64" => "aarch64".to_string(),
        "x64" | "amd64" => "x86_64".to_string(),
        _ => arch,
    }
}
