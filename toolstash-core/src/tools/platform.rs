//! Platform normalization.
//!
//! Raw OS/architecture strings come from two places: the compile-time target
//! (`std::env::consts`) and `uname`-style spellings a user may pass. Both are
//! folded into one small vocabulary that tool definitions are written against.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::Error;

// ============================================================================
// Operating Systems
// ============================================================================

/// Normalized operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    /// Returns all supported operating systems.
    pub fn all() -> &'static [Os] {
        &[Self::Linux, Self::Darwin, Self::Windows]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Executable suffix on this OS (`.exe` on Windows, empty elsewhere).
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "linux" => Some(Self::Linux),
            "darwin" | "macos" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            // Git Bash and friends report e.g. MINGW64_NT-10.0-19045
            s if s.starts_with("mingw") || s.starts_with("msys") || s.starts_with("cygwin") => {
                Some(Self::Windows)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Architectures
// ============================================================================

/// Normalized CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    Armv7,
    Armv6,
}

impl Arch {
    /// Returns all supported architectures.
    pub fn all() -> &'static [Arch] {
        &[Self::Amd64, Self::Arm64, Self::Armv7, Self::Armv6]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armv7 => "armv7",
            Self::Armv6 => "armv6",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Self::Amd64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            "armv7" | "armv7l" | "arm" => Some(Self::Armv7),
            "armv6" | "armv6l" => Some(Self::Armv6),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Platform
// ============================================================================

/// An `{os, arch}` pair in normalized vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Normalizes raw OS and architecture strings.
    ///
    /// Accepts both Rust target spellings (`macos`, `aarch64`) and `uname`
    /// spellings (`Darwin`, `armv7l`). Anything else is reported as
    /// [`Error::UnsupportedPlatform`] with the raw inputs.
    pub fn normalize(raw_os: &str, raw_arch: &str) -> Result<Self, Error> {
        match (Os::parse(raw_os), Arch::parse(raw_arch)) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(Error::UnsupportedPlatform {
                os: raw_os.to_string(),
                arch: raw_arch.to_string(),
            }),
        }
    }

    /// Detects the platform this binary was compiled for.
    pub fn detect() -> Result<Self, Error> {
        Self::normalize(std::env::consts::OS, detected_arch())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// `std::env::consts::ARCH` reports plain `arm` for both ARMv6 and ARMv7.
fn detected_arch() -> &'static str {
    #[cfg(all(target_arch = "arm", not(target_feature = "v7")))]
    {
        "armv6"
    }
    #[cfg(not(all(target_arch = "arm", not(target_feature = "v7"))))]
    {
        std::env::consts::ARCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_amd64_aliases() {
        for raw in ["x86_64", "amd64", "X86_64", "x64"] {
            let platform = Platform::normalize("linux", raw).unwrap();
            assert_eq!(platform, Platform::new(Os::Linux, Arch::Amd64), "raw arch {raw}");
        }
    }

    #[test]
    fn test_normalize_arm_aliases() {
        assert_eq!(Platform::normalize("Linux", "aarch64").unwrap().arch, Arch::Arm64);
        assert_eq!(Platform::normalize("Linux", "arm64").unwrap().arch, Arch::Arm64);
        assert_eq!(Platform::normalize("Linux", "armv7l").unwrap().arch, Arch::Armv7);
        assert_eq!(Platform::normalize("Linux", "arm").unwrap().arch, Arch::Armv7);
        assert_eq!(Platform::normalize("Linux", "armv6l").unwrap().arch, Arch::Armv6);
    }

    #[test]
    fn test_normalize_os_spellings() {
        assert_eq!(Platform::normalize("Darwin", "arm64").unwrap().os, Os::Darwin);
        assert_eq!(Platform::normalize("macos", "aarch64").unwrap().os, Os::Darwin);
        assert_eq!(Platform::normalize("windows", "x86_64").unwrap().os, Os::Windows);
        assert_eq!(
            Platform::normalize("MINGW64_NT-10.0-19045", "x86_64").unwrap().os,
            Os::Windows
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let first = Platform::normalize("linux", "x86_64").unwrap();
        for _ in 0..10 {
            assert_eq!(Platform::normalize("linux", "x86_64").unwrap(), first);
        }
    }

    #[test]
    fn test_normalize_unsupported() {
        let cases = [("freebsd", "amd64"), ("linux", "riscv64"), ("", ""), ("plan9", "mips")];
        for (os, arch) in cases {
            match Platform::normalize(os, arch) {
                Err(Error::UnsupportedPlatform { os: raw_os, arch: raw_arch }) => {
                    assert_eq!(raw_os, os);
                    assert_eq!(raw_arch, arch);
                }
                other => panic!("expected UnsupportedPlatform for {os}/{arch}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_normalized_spellings_are_accepted() {
        for os in Os::all() {
            for arch in Arch::all() {
                let platform = Platform::normalize(os.as_str(), arch.as_str()).unwrap();
                assert_eq!(platform, Platform::new(*os, *arch));
            }
        }
    }

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        #[cfg(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        ))]
        assert!(platform.is_ok());
        let _ = platform;
    }

    #[test]
    fn test_exe_suffix() {
        assert_eq!(Os::Windows.exe_suffix(), ".exe");
        assert_eq!(Os::Linux.exe_suffix(), "");
        assert_eq!(Os::Darwin.exe_suffix(), "");
    }
}
