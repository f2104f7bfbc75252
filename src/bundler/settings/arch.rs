//! CPU architecture and Apple platform types.

use std::fmt;

/// CPU architecture of a binary slice.
///
/// Detected from the Mach-O header of the core library; fat binaries
/// contribute one entry per contained architecture.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Arch {
    /// AArch64 / ARM64 (64-bit) - Apple Silicon and all current devices
    Arm64,
    /// x86_64 (64-bit) - Intel Macs and Intel-hosted simulators
    X86_64,
}

impl Arch {
    /// Maps a Mach-O `cputype` to an architecture.
    pub fn from_cputype(cputype: u32) -> Option<Self> {
        match cputype {
            goblin::mach::cputype::CPU_TYPE_ARM64 => Some(Arch::Arm64),
            goblin::mach::cputype::CPU_TYPE_X86_64 => Some(Arch::X86_64),
            _ => None,
        }
    }

    /// Architecture name as used in xcframework slice identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "arm64" => Some(Arch::Arm64),
            "x86_64" => Some(Arch::X86_64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apple platform an installation was built for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Platform {
    MacOs,
    Ios,
    IosSimulator,
    MacCatalyst,
    VisionOs,
    VisionOsSimulator,
}

/// Platform family, the granularity Swift package conditions work at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PlatformFamily {
    MacOs,
    Ios,
    MacCatalyst,
    VisionOs,
}

impl PlatformFamily {
    /// Spelling inside `.when(platforms: [...])`.
    pub fn swift_name(&self) -> &'static str {
        match self {
            PlatformFamily::MacOs => ".macOS",
            PlatformFamily::Ios => ".iOS",
            PlatformFamily::MacCatalyst => ".macCatalyst",
            PlatformFamily::VisionOs => ".visionOS",
        }
    }

    /// Clang module map platform feature name.
    pub fn module_feature(&self) -> &'static str {
        match self {
            PlatformFamily::MacOs => "macos",
            PlatformFamily::Ios => "ios",
            PlatformFamily::MacCatalyst => "maccatalyst",
            PlatformFamily::VisionOs => "xros",
        }
    }
}

impl Platform {
    /// Maps an `LC_BUILD_VERSION` platform number.
    pub fn from_build_version(platform: u32) -> Option<Self> {
        match platform {
            1 => Some(Platform::MacOs),
            2 => Some(Platform::Ios),
            6 => Some(Platform::MacCatalyst),
            7 => Some(Platform::IosSimulator),
            11 => Some(Platform::VisionOs),
            12 => Some(Platform::VisionOsSimulator),
            _ => None,
        }
    }

    /// `SupportedPlatform` value in an xcframework descriptor.
    pub fn xcframework_platform(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Ios | Platform::IosSimulator | Platform::MacCatalyst => "ios",
            Platform::VisionOs | Platform::VisionOsSimulator => "xros",
        }
    }

    /// `SupportedPlatformVariant` value, if any.
    pub fn variant(&self) -> Option<&'static str> {
        match self {
            Platform::IosSimulator | Platform::VisionOsSimulator => Some("simulator"),
            Platform::MacCatalyst => Some("maccatalyst"),
            _ => None,
        }
    }

    pub fn family(&self) -> PlatformFamily {
        match self {
            Platform::MacOs => PlatformFamily::MacOs,
            Platform::Ios | Platform::IosSimulator => PlatformFamily::Ios,
            Platform::MacCatalyst => PlatformFamily::MacCatalyst,
            Platform::VisionOs | Platform::VisionOsSimulator => PlatformFamily::VisionOs,
        }
    }

    /// Whether frameworks use the `Versions/A` layout with symlinks.
    ///
    /// Only macOS-style bundles are versioned; every other platform uses
    /// shallow bundles.
    pub fn uses_versioned_bundles(&self) -> bool {
        matches!(self, Platform::MacOs | Platform::MacCatalyst)
    }

    /// Name of the resource directory inside a framework.
    ///
    /// Shallow bundles must not contain a top-level `Resources` directory.
    pub fn resources_dir(&self) -> &'static str {
        if self.uses_versioned_bundles() {
            "Resources"
        } else {
            "BundleResources"
        }
    }

    /// Whether raw (non-bundled) installs of this platform can be consumed
    /// directly on the build host.
    pub fn is_host(&self) -> bool {
        matches!(self, Platform::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macOS",
            Platform::Ios => "iOS",
            Platform::IosSimulator => "iOS Simulator",
            Platform::MacCatalyst => "Mac Catalyst",
            Platform::VisionOs => "visionOS",
            Platform::VisionOsSimulator => "visionOS Simulator",
        };
        f.write_str(name)
    }
}

/// Platform plus architectures: one slice of an xcframework.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PlatformTarget {
    platform: Platform,
    archs: Vec<Arch>,
}

impl PlatformTarget {
    pub fn new(platform: Platform, mut archs: Vec<Arch>) -> Self {
        archs.sort();
        archs.dedup();
        Self { platform, archs }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn archs(&self) -> &[Arch] {
        &self.archs
    }

    /// Slice directory name, e.g. `ios-arm64_x86_64-simulator`.
    pub fn slice_identifier(&self) -> String {
        let archs = self
            .archs
            .iter()
            .map(Arch::as_str)
            .collect::<Vec<_>>()
            .join("_");
        match self.platform.variant() {
            Some(variant) => format!(
                "{}-{}-{}",
                self.platform.xcframework_platform(),
                archs,
                variant
            ),
            None => format!("{}-{}", self.platform.xcframework_platform(), archs),
        }
    }

    /// Parses a slice directory name back into a target.
    ///
    /// Returns `None` for identifiers this tool does not understand.
    pub fn parse_slice_identifier(identifier: &str) -> Option<Self> {
        let mut parts = identifier.splitn(3, '-');
        let platform_name = parts.next()?;
        let arch_part = parts.next()?;
        let variant = parts.next();

        let platform = match (platform_name, variant) {
            ("macos", None) => Platform::MacOs,
            ("ios", None) => Platform::Ios,
            ("ios", Some("simulator")) => Platform::IosSimulator,
            ("ios", Some("maccatalyst")) => Platform::MacCatalyst,
            ("xros", None) => Platform::VisionOs,
            ("xros", Some("simulator")) => Platform::VisionOsSimulator,
            _ => return None,
        };

        // Arch names themselves contain '_' (x86_64), so match greedily.
        let mut archs = Vec::new();
        let mut rest = arch_part;
        while !rest.is_empty() {
            let arch = [Arch::X86_64, Arch::Arm64]
                .into_iter()
                .find(|a| rest.starts_with(a.as_str()))?;
            archs.push(arch);
            rest = &rest[arch.as_str().len()..];
            rest = rest.strip_prefix('_').unwrap_or(rest);
        }
        if archs.is_empty() {
            return None;
        }
        Some(Self::new(platform, archs))
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.platform, self.slice_identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_identifiers() {
        let mac = PlatformTarget::new(Platform::MacOs, vec![Arch::X86_64, Arch::Arm64]);
        assert_eq!(mac.slice_identifier(), "macos-arm64_x86_64");

        let sim = PlatformTarget::new(Platform::IosSimulator, vec![Arch::Arm64]);
        assert_eq!(sim.slice_identifier(), "ios-arm64-simulator");

        let catalyst = PlatformTarget::new(Platform::MacCatalyst, vec![Arch::Arm64]);
        assert_eq!(catalyst.slice_identifier(), "ios-arm64-maccatalyst");
    }

    #[test]
    fn parse_slice_identifier_understands_own_output() {
        for target in [
            PlatformTarget::new(Platform::MacOs, vec![Arch::Arm64, Arch::X86_64]),
            PlatformTarget::new(Platform::IosSimulator, vec![Arch::X86_64, Arch::Arm64]),
            PlatformTarget::new(Platform::VisionOs, vec![Arch::Arm64]),
        ] {
            let parsed = PlatformTarget::parse_slice_identifier(&target.slice_identifier());
            assert_eq!(parsed, Some(target));
        }
    }

    #[test]
    fn parse_slice_identifier_rejects_unknown() {
        assert_eq!(PlatformTarget::parse_slice_identifier("tvos-arm64"), None);
        assert_eq!(PlatformTarget::parse_slice_identifier("macos-riscv64"), None);
        assert_eq!(PlatformTarget::parse_slice_identifier("ios"), None);
        assert_eq!(PlatformTarget::parse_slice_identifier("ios-arm64-watch"), None);
    }

    #[test]
    fn shallow_platforms_rename_resources() {
        assert_eq!(Platform::MacOs.resources_dir(), "Resources");
        assert_eq!(Platform::IosSimulator.resources_dir(), "BundleResources");
        assert!(!Platform::VisionOs.uses_versioned_bundles());
    }
}
