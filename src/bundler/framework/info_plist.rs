//! Minimal framework `Info.plist`.

use crate::bundler::{error::Result, settings::Platform, utils::fs};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct FrameworkInfo {
    #[serde(rename = "CFBundleDevelopmentRegion")]
    pub development_region: String,
    #[serde(rename = "CFBundleExecutable")]
    pub executable: String,
    #[serde(rename = "CFBundleIdentifier")]
    pub identifier: String,
    #[serde(rename = "CFBundleInfoDictionaryVersion")]
    pub dictionary_version: String,
    #[serde(rename = "CFBundleName")]
    pub name: String,
    #[serde(rename = "CFBundlePackageType")]
    pub package_type: String,
    #[serde(rename = "CFBundleShortVersionString")]
    pub short_version: String,
    #[serde(rename = "CFBundleSupportedPlatforms")]
    pub supported_platforms: Vec<String>,
    #[serde(rename = "CFBundleVersion")]
    pub version: String,
}

impl FrameworkInfo {
    pub fn new(
        name: &str,
        identifier: &str,
        platform: Platform,
        short_version: &str,
        version: &str,
    ) -> Self {
        Self {
            development_region: "en".into(),
            executable: name.into(),
            identifier: identifier.into(),
            dictionary_version: "6.0".into(),
            name: name.into(),
            package_type: "FMWK".into(),
            short_version: short_version.into(),
            supported_platforms: vec![sdk_platform_name(platform).into()],
            version: version.into(),
        }
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        plist::to_writer_xml(&mut buffer, self)?;
        fs::write_file(path, buffer).await
    }
}

/// `CFBundleSupportedPlatforms` entry.
fn sdk_platform_name(platform: Platform) -> &'static str {
    match platform {
        Platform::MacOs | Platform::MacCatalyst => "MacOSX",
        Platform::Ios => "iPhoneOS",
        Platform::IosSimulator => "iPhoneSimulator",
        Platform::VisionOs => "XROS",
        Platform::VisionOsSimulator => "XRSimulator",
    }
}
