//! Mach-O linkage inspection using goblin.

use super::{LinkageInspector, LinkageRecord, LoadCommand};
use crate::bundler::{
    Error,
    error::{ErrorExt, Result},
    settings::{Arch, Platform, PlatformTarget},
};
use goblin::mach::{Mach, MachO, SingleArch, load_command::CommandVariant};
use std::path::Path;

/// Reads linkage records directly from Mach-O load commands.
///
/// For fat binaries the dependency list of the first slice is used (all
/// slices of a library link the same dylibs) and every slice contributes
/// its architecture.
#[derive(Debug, Default, Clone, Copy)]
pub struct MachOInspector;

impl LinkageInspector for MachOInspector {
    fn inspect(&self, binary: &Path) -> Result<LinkageRecord> {
        let buffer = std::fs::read(binary).fs_context("failed to read binary", binary)?;

        match Mach::parse(&buffer)? {
            Mach::Binary(macho) => Ok(record_from(&macho, vec![macho.header.cputype])),
            Mach::Fat(multi) => {
                let mut slices = Vec::new();
                for index in 0..multi.narches {
                    if let SingleArch::MachO(macho) = multi.get(index)? {
                        slices.push(macho);
                    }
                }
                let first = slices.first().ok_or_else(|| {
                    Error::GenericError(format!(
                        "fat binary {} contains no Mach-O slices",
                        binary.display()
                    ))
                })?;
                let cputypes = slices.iter().map(|m| m.header.cputype).collect();
                Ok(record_from(first, cputypes))
            }
        }
    }
}

fn record_from(macho: &MachO<'_>, cputypes: Vec<u32>) -> LinkageRecord {
    let dependencies = macho
        .libs
        .iter()
        // goblin reports the binary itself as "self" at index 0
        .filter(|lib| **lib != "self")
        .map(|lib| LoadCommand::new(*lib))
        .collect();

    let archs: Vec<Arch> = cputypes.into_iter().filter_map(Arch::from_cputype).collect();
    let target = platform_of(macho, &archs)
        .filter(|_| !archs.is_empty())
        .map(|platform| PlatformTarget::new(platform, archs));

    LinkageRecord {
        install_id: macho.name.map(str::to_string),
        dependencies,
        rpaths: macho.rpaths.iter().map(|r| r.to_string()).collect(),
        target,
    }
}

fn platform_of(macho: &MachO<'_>, archs: &[Arch]) -> Option<Platform> {
    for lc in &macho.load_commands {
        match &lc.command {
            CommandVariant::BuildVersion(build) => {
                return Platform::from_build_version(build.platform);
            }
            CommandVariant::VersionMinMacosx(_) => return Some(Platform::MacOs),
            // Pre-LC_BUILD_VERSION simulator builds are the Intel slices.
            CommandVariant::VersionMinIphoneos(_) => {
                return Some(if archs.contains(&Arch::X86_64) {
                    Platform::IosSimulator
                } else {
                    Platform::Ios
                });
            }
            _ => {}
        }
    }
    None
}
