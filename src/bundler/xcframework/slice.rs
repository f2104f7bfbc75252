//! Slice discovery and platform predicates.

use crate::bundler::{
    error::{ErrorExt, Result, StructuralWarning},
    settings::{PlatformFamily, PlatformTarget},
};
use std::{collections::BTreeSet, path::Path};

/// Reads the slice directories of an xcframework.
///
/// Directories whose names are not slice identifiers produce
/// [`StructuralWarning::UnknownPlatform`] and are otherwise ignored.
pub fn read_slices(unit: &Path) -> Result<(Vec<PlatformTarget>, Vec<StructuralWarning>)> {
    let mut targets = Vec::new();
    let mut warnings = Vec::new();

    let entries = std::fs::read_dir(unit).fs_context("failed to list", unit)?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.fs_context("failed to list", unit)?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    for name in names {
        match PlatformTarget::parse_slice_identifier(&name) {
            Some(target) => targets.push(target),
            None => warnings.push(
                StructuralWarning::UnknownPlatform {
                    unit: unit.to_path_buf(),
                    identifier: name,
                }
                .emit(),
            ),
        }
    }
    Ok((targets, warnings))
}

/// Platform families a unit is conditioned on.
///
/// An empty predicate means the unit applies everywhere the package is built.
/// SwiftPM conditions name platform families only, so iOS device and
/// simulator slices both map to [`PlatformFamily::Ios`]; a unit with only a
/// simulator slice is still conditioned on `.iOS`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformPredicate {
    families: BTreeSet<PlatformFamily>,
}

impl PlatformPredicate {
    /// Minimal predicate for a unit with `present` slices in a package
    /// supporting `all` families.
    pub fn minimal<'a>(
        present: impl IntoIterator<Item = &'a PlatformTarget>,
        all: &BTreeSet<PlatformFamily>,
    ) -> Self {
        let families: BTreeSet<PlatformFamily> = present
            .into_iter()
            .map(|t| t.platform().family())
            .collect();
        if all.is_subset(&families) {
            Self::default()
        } else {
            Self { families }
        }
    }

    pub fn is_unconditional(&self) -> bool {
        self.families.is_empty()
    }

    pub fn families(&self) -> impl Iterator<Item = PlatformFamily> + '_ {
        self.families.iter().copied()
    }

    /// `condition:` argument for a Swift package dependency, if any.
    pub fn swift_condition(&self) -> Option<String> {
        if self.is_unconditional() {
            return None;
        }
        let platforms: Vec<&str> = self.families().map(|f| f.swift_name()).collect();
        Some(format!(".when(platforms: [{}])", platforms.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Arch, Platform};

    fn target(platform: Platform) -> PlatformTarget {
        PlatformTarget::new(platform, vec![Arch::Arm64])
    }

    #[test]
    fn unknown_slice_directories_warn() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["macos-arm64_x86_64", "ios-arm64-simulator", "watchos-arm64_32"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("Info.plist"), "").unwrap();

        let (targets, warnings) = read_slices(dir.path()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            StructuralWarning::UnknownPlatform { identifier, .. } if identifier == "watchos-arm64_32"
        ));
    }

    #[test]
    fn unit_present_everywhere_is_unconditional() {
        let all: BTreeSet<_> = [PlatformFamily::MacOs, PlatformFamily::Ios].into();
        let present = [target(Platform::MacOs), target(Platform::IosSimulator)];
        let predicate = PlatformPredicate::minimal(&present, &all);
        assert!(predicate.is_unconditional());
        assert_eq!(predicate.swift_condition(), None);
    }

    #[test]
    fn unit_missing_a_family_is_conditioned() {
        let all: BTreeSet<_> = [PlatformFamily::MacOs, PlatformFamily::Ios].into();
        let present = [target(Platform::MacOs)];
        let predicate = PlatformPredicate::minimal(&present, &all);
        assert_eq!(
            predicate.swift_condition().as_deref(),
            Some(".when(platforms: [.macOS])")
        );
    }

    #[test]
    fn simulator_and_device_share_a_family() {
        let all: BTreeSet<_> = [PlatformFamily::MacOs, PlatformFamily::Ios].into();
        let present = [target(Platform::Ios), target(Platform::IosSimulator)];
        let predicate = PlatformPredicate::minimal(&present, &all);
        assert_eq!(predicate.families().collect::<Vec<_>>(), [PlatformFamily::Ios]);
    }

    #[test]
    fn simulator_only_unit_conditions_on_ios() {
        let all: BTreeSet<_> = [PlatformFamily::MacOs, PlatformFamily::Ios].into();
        let present = [target(Platform::IosSimulator)];
        let predicate = PlatformPredicate::minimal(&present, &all);
        assert_eq!(
            predicate.swift_condition().as_deref(),
            Some(".when(platforms: [.iOS])")
        );
    }
}
