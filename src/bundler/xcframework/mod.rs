//! Merges same-named frameworks from every installation into one
//! `.xcframework`.

mod slice;

pub use slice::{PlatformPredicate, read_slices};

use crate::bundler::{
    error::{Result, StructuralWarning},
    framework::{Bundle, FrameworkLayout},
    settings::{PlatformFamily, PlatformTarget},
    utils::fs,
};
use serde::Serialize;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// One merged multi-platform unit.
#[derive(Clone, Debug)]
pub struct MergedUnit {
    pub name: String,
    /// The `<name>.xcframework` directory.
    pub path: PathBuf,
    pub slices: Vec<PlatformTarget>,
    pub predicate: PlatformPredicate,
    pub warnings: Vec<StructuralWarning>,
}

impl MergedUnit {
    pub fn directory_name(name: &str) -> String {
        format!("{name}.xcframework")
    }
}

#[derive(Debug, Serialize)]
struct XcFrameworkInfo {
    #[serde(rename = "AvailableLibraries")]
    available_libraries: Vec<LibraryEntry>,
    #[serde(rename = "CFBundlePackageType")]
    package_type: &'static str,
    #[serde(rename = "XCFrameworkFormatVersion")]
    format_version: &'static str,
}

#[derive(Debug, Serialize)]
struct LibraryEntry {
    #[serde(rename = "BinaryPath")]
    binary_path: String,
    #[serde(rename = "LibraryIdentifier")]
    identifier: String,
    #[serde(rename = "LibraryPath")]
    library_path: String,
    #[serde(rename = "SupportedArchitectures")]
    architectures: Vec<&'static str>,
    #[serde(rename = "SupportedPlatform")]
    platform: &'static str,
    #[serde(
        rename = "SupportedPlatformVariant",
        skip_serializing_if = "Option::is_none"
    )]
    variant: Option<&'static str>,
}

/// Builds xcframeworks into a destination directory.
#[derive(Clone, Debug)]
pub struct PlatformMerger {
    destination: PathBuf,
    families: BTreeSet<PlatformFamily>,
}

impl PlatformMerger {
    /// `families` are the platform families of the whole run, used to decide
    /// whether a unit needs a platform condition.
    pub fn new(destination: PathBuf, families: BTreeSet<PlatformFamily>) -> Self {
        Self {
            destination,
            families,
        }
    }

    /// Merges every bundle of one logical name.
    ///
    /// Any previous unit of that name is replaced.
    pub async fn merge(&self, name: &str, mut bundles: Vec<Bundle>) -> Result<MergedUnit> {
        bundles.sort_by_key(|b| b.target.slice_identifier());
        let unit = self.destination.join(MergedUnit::directory_name(name));
        fs::create_dir_all(&unit, true).await?;

        let framework_dir = FrameworkLayout::directory_name(name);
        let mut entries = Vec::new();
        for bundle in &bundles {
            let identifier = bundle.target.slice_identifier();
            fs::copy_dir(&bundle.path, &unit.join(&identifier).join(&framework_dir)).await?;

            let platform = bundle.target.platform();
            entries.push(LibraryEntry {
                binary_path: format!(
                    "{framework_dir}/{}",
                    FrameworkLayout::binary_relative_path(name, platform).to_string_lossy()
                ),
                identifier,
                library_path: framework_dir.clone(),
                architectures: bundle.target.archs().iter().map(|a| a.as_str()).collect(),
                platform: platform.xcframework_platform(),
                variant: platform.variant(),
            });
        }

        write_info(&unit, entries).await?;

        let (slices, warnings) = read_slices(&unit)?;
        let predicate = PlatformPredicate::minimal(&slices, &self.families);
        log::info!(
            "✓ Merged {} ({} slice{})",
            MergedUnit::directory_name(name),
            slices.len(),
            if slices.len() == 1 { "" } else { "s" }
        );
        Ok(MergedUnit {
            name: name.to_string(),
            path: unit,
            slices,
            predicate,
            warnings,
        })
    }
}

async fn write_info(unit: &Path, mut entries: Vec<LibraryEntry>) -> Result<()> {
    entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    let info = XcFrameworkInfo {
        available_libraries: entries,
        package_type: "XFWK",
        format_version: "1.0",
    };
    let mut buffer = Vec::new();
    plist::to_writer_xml(&mut buffer, &info)?;
    fs::write_file(&unit.join("Info.plist"), buffer).await
}
