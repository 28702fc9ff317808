// ─── Platform Tag ───
// OS × architecture pairs and their LWJGL natives classifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{StageError, StageResult};

/// Supported operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Linux,
    Macos,
}

/// Supported CPU architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl Os {
    pub const ALL: [Os; 3] = [Os::Windows, Os::Linux, Os::Macos];

    pub fn as_str(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Macos => "macos",
        }
    }

    /// Accepts the Mojang (`osx`) and Rust (`macos`) spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "windows" | "win" => Some(Os::Windows),
            "linux" => Some(Os::Linux),
            "macos" | "osx" | "mac" | "darwin" => Some(Os::Macos),
            _ => None,
        }
    }
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::X86_64, Arch::Arm64];

    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "x86_64" | "x64" | "amd64" => Some(Arch::X86_64),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

/// The platform an artifact is staged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformTag {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformTag {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Every supported combination, in a stable order.
    pub fn all() -> Vec<PlatformTag> {
        Os::ALL
            .iter()
            .flat_map(|os| Arch::ALL.iter().map(move |arch| PlatformTag::new(*os, *arch)))
            .collect()
    }

    /// Detect the platform of the running process.
    pub fn current() -> StageResult<Self> {
        let os = Os::parse(std::env::consts::OS)
            .ok_or_else(|| StageError::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
        let arch = Arch::parse(std::env::consts::ARCH)
            .ok_or_else(|| StageError::UnsupportedPlatform(std::env::consts::ARCH.to_string()))?;
        Ok(Self { os, arch })
    }

    /// LWJGL natives classifier, e.g. `natives-linux-arm64`.
    ///
    /// x86_64 is the unsuffixed default.
    pub fn natives_classifier(&self) -> String {
        format!("natives-{}", self.classifier_suffix())
    }

    /// The part of the natives classifier after `natives-`.
    pub fn classifier_suffix(&self) -> String {
        match self.arch {
            Arch::X86_64 => self.os.as_str().to_string(),
            Arch::Arm64 => format!("{}-arm64", self.os.as_str()),
        }
    }

    /// Parse a natives classifier back into the platform it targets.
    ///
    /// Returns `None` for classifiers that are not platform natives
    /// (`sources`, `javadoc`) or that target an unsupported arch (`x86`).
    pub fn from_classifier(classifier: &str) -> Option<Self> {
        let rest = classifier.strip_prefix("natives-")?;
        let (os_part, arch_part) = match rest.split_once('-') {
            Some((os, arch)) => (os, Some(arch)),
            None => (rest, None),
        };
        let os = Os::parse(os_part)?;
        let arch = match arch_part {
            None => Arch::X86_64,
            Some(raw) => Arch::parse(raw)?,
        };
        Some(Self { os, arch })
    }

    /// Whether an artifact with `classifier` belongs on this platform.
    ///
    /// Unclassified artifacts are platform independent.
    pub fn accepts(&self, classifier: Option<&str>) -> bool {
        match classifier {
            None => true,
            Some(c) => PlatformTag::from_classifier(c).as_ref() == Some(self),
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

impl FromStr for PlatformTag {
    type Err = StageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || StageError::UnsupportedPlatform(raw.to_string());
        let (os, arch) = raw.trim().split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            os: Os::parse(os).ok_or_else(invalid)?,
            arch: Arch::parse(arch).ok_or_else(invalid)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_names_follow_lwjgl_convention() {
        let win = PlatformTag::new(Os::Windows, Arch::X86_64);
        let mac_arm = PlatformTag::new(Os::Macos, Arch::Arm64);
        assert_eq!(win.natives_classifier(), "natives-windows");
        assert_eq!(mac_arm.natives_classifier(), "natives-macos-arm64");
    }

    #[test]
    fn every_platform_round_trips_through_its_classifier() {
        for tag in PlatformTag::all() {
            assert_eq!(
                PlatformTag::from_classifier(&tag.natives_classifier()),
                Some(tag)
            );
        }
    }

    #[test]
    fn windows_natives_match_only_windows_x86_64() {
        let win = PlatformTag::new(Os::Windows, Arch::X86_64);
        let linux = PlatformTag::new(Os::Linux, Arch::X86_64);
        assert!(win.accepts(Some("natives-windows")));
        assert!(!linux.accepts(Some("natives-windows")));
        assert!(linux.accepts(None));
    }

    #[test]
    fn non_native_and_32_bit_classifiers_never_match() {
        assert_eq!(PlatformTag::from_classifier("sources"), None);
        assert_eq!(PlatformTag::from_classifier("natives-windows-x86"), None);
        assert_eq!(
            PlatformTag::from_classifier("natives-osx"),
            Some(PlatformTag::new(Os::Macos, Arch::X86_64))
        );
    }

    #[test]
    fn parses_os_arch_strings() {
        let tag: PlatformTag = "linux-aarch64".parse().unwrap();
        assert_eq!(tag, PlatformTag::new(Os::Linux, Arch::Arm64));
        assert_eq!(tag.to_string(), "linux-arm64");
        assert!("solaris-sparc".parse::<PlatformTag>().is_err());
        assert!("linux".parse::<PlatformTag>().is_err());
    }
}
