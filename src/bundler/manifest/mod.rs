//! Package manifest, flags file and feature-flag header.

mod feature_header;
mod flags;
mod template;

pub use feature_header::render_feature_header;
pub use flags::{DUPLICATE_LIBRARIES_WORKAROUND, render_flags};
pub use template::PACKAGE_TEMPLATE;

use crate::bundler::{
    error::{ErrorExt, Result},
    installation::FeatureFlags,
    settings::Settings,
    utils::fs,
    xcframework::PlatformPredicate,
};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;

pub const GENERATED_MARKER: &str = "// Generated by make_openusd_package. Do not edit.";

/// Where SwiftPM finds a binary target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetLocation {
    /// Package-relative path (path prefix not yet applied).
    Local { path: String },
    /// Hosted archive.
    Remote { url: String, checksum: String },
}

/// One merged library as referenced by the manifest.
#[derive(Clone, Debug)]
pub struct BinaryTarget {
    pub name: String,
    pub predicate: PlatformPredicate,
    pub location: TargetLocation,
}

#[derive(Serialize)]
struct TemplateData<'a> {
    generated_marker: &'a str,
    package_name: &'a str,
    path_prefix: String,
    dependency_list: String,
    binary_targets: String,
}

/// Writes `Package.swift`, the flags file and the feature-flag header.
pub struct PackageManifestWriter<'a> {
    settings: &'a Settings,
    flags: &'a FeatureFlags,
}

impl<'a> PackageManifestWriter<'a> {
    pub fn new(settings: &'a Settings, flags: &'a FeatureFlags) -> Self {
        Self { settings, flags }
    }

    /// Renders the manifest; targets are ordered by name.
    pub fn render_manifest(&self, targets: &[BinaryTarget]) -> Result<String> {
        let template = match &self.settings.config().manifest_template {
            Some(path) => std::fs::read_to_string(path).fs_context("reading manifest template", path)?,
            None => PACKAGE_TEMPLATE.to_string(),
        };

        let mut targets: Vec<&BinaryTarget> = targets.iter().collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));

        let mut dependency_list = String::new();
        let mut binary_targets = String::new();
        for target in &targets {
            match target.predicate.swift_condition() {
                Some(condition) => dependency_list.push_str(&format!(
                    "                .target(name: \"{}\", condition: {condition}),\n",
                    target.name
                )),
                None => dependency_list.push_str(&format!(
                    "                .target(name: \"{}\"),\n",
                    target.name
                )),
            }

            match &target.location {
                TargetLocation::Local { path } => binary_targets.push_str(&format!(
                    "        .binaryTarget(name: \"{}\", path: \"{}\"),\n",
                    target.name,
                    self.settings.prefixed(path)
                )),
                TargetLocation::Remote { url, checksum } => binary_targets.push_str(&format!(
                    "        .binaryTarget(\n            name: \"{}\",\n            url: \"{url}\",\n            checksum: \"{checksum}\"\n        ),\n",
                    target.name
                )),
            }
        }

        let prefix = self.settings.prefixed("");
        let data = TemplateData {
            generated_marker: GENERATED_MARKER,
            package_name: self.settings.package_name(),
            path_prefix: prefix,
            dependency_list: dependency_list.trim_end_matches('\n').to_string(),
            binary_targets: binary_targets.trim_end_matches('\n').to_string(),
        };

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string("Package.swift", template)?;
        Ok(handlebars.render("Package.swift", &data)?)
    }

    pub async fn write_manifest(&self, targets: &[BinaryTarget]) -> Result<PathBuf> {
        let path = self.settings.manifest_path();
        fs::write_file(&path, self.render_manifest(targets)?).await?;
        log::info!("✓ Wrote {} ({} binary targets)", path.display(), targets.len());
        Ok(path)
    }

    /// `raw_libraries` is set for raw install strategies.
    pub async fn write_flags(&self, raw_libraries: bool) -> Result<PathBuf> {
        let path = self.settings.flags_path();
        let libraries = self.settings.libraries_directory();
        let text = render_flags(
            &self.settings.include_directory(),
            raw_libraries.then_some(libraries.as_path()),
            self.flags,
        );
        fs::write_file(&path, text).await?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Writes the feature header into the public include root.
    pub async fn write_feature_header(&self) -> Result<PathBuf> {
        let path = self
            .settings
            .include_directory()
            .join(self.settings.feature_header_name());
        let text = render_feature_header(self.settings.package_name(), self.flags);
        fs::write_file(&path, text).await?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}
