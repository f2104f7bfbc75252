//! Public headers and glue sources of the umbrella target.
//!
//! The include directory itself is always a real directory: the module map
//! and feature-flag header are generated into it and must never land in the
//! installation. With [`SourceStrategy::Symlink`] only its top-level entries
//! point back into the installation.

use crate::bundler::{
    error::{ErrorExt, Result},
    installation::Installation,
    settings::{Settings, SourceStrategy},
    utils::fs,
};
use std::path::PathBuf;

/// Brings the primary installation's headers into the package and writes the
/// glue source. Returns the files and links created.
pub async fn install_sources(settings: &Settings, primary: &Installation) -> Result<Vec<PathBuf>> {
    let include = settings.include_directory();
    fs::create_dir_all(&include, true).await?;

    let source_include = primary.include_dir();
    let mut entries = tokio::fs::read_dir(&source_include)
        .await
        .fs_context("reading include directory", &source_include)?;
    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading include directory", &source_include)?
    {
        names.push(entry.file_name());
    }
    names.sort();

    let mut written = Vec::new();
    for name in names {
        let from = source_include.join(&name);
        let to = include.join(&name);
        match settings.source_strategy() {
            SourceStrategy::Copy => {
                if tokio::fs::metadata(&from)
                    .await
                    .fs_context("reading metadata", &from)?
                    .is_dir()
                {
                    fs::copy_dir(&from, &to).await?;
                } else {
                    fs::copy_file(&from, &to).await?;
                }
            }
            SourceStrategy::Symlink => fs::symlink(&from, &to).await?,
        }
        written.push(to);
    }

    let glue = settings
        .sources_directory()
        .join(format!("{}.cpp", settings.package_name()));
    fs::write_file(&glue, glue_source(&settings.feature_header_name())).await?;
    written.push(glue);

    log::info!(
        "✓ Installed headers from {} ({:?})",
        source_include.display(),
        settings.source_strategy()
    );
    Ok(written)
}

/// SwiftPM needs at least one source file per C-family target.
fn glue_source(feature_header: &str) -> String {
    format!("// Generated by make_openusd_package. Do not edit.\n#include \"{feature_header}\"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        installation::FeatureFlags,
        settings::{Arch, Platform, PlatformTarget, SettingsBuilder},
    };
    use std::path::Path;

    fn fixture(root: &Path) -> Installation {
        let include = root.join("include/pxr/base/tf");
        std::fs::create_dir_all(&include).unwrap();
        std::fs::write(include.join("token.h"), "#pragma once").unwrap();
        std::fs::write(root.join("include/pxr/pxr.h"), "#define PXR_VERSION 2505").unwrap();
        Installation::new(
            0,
            root.to_path_buf(),
            PlatformTarget::new(Platform::MacOs, vec![Arch::Arm64]),
            FeatureFlags::default(),
            root.join("scratch"),
        )
    }

    fn settings(root: &Path, strategy: SourceStrategy) -> Settings {
        SettingsBuilder::new()
            .installation(root.join("install"))
            .output_directory(root.join("pkg"))
            .source_strategy(strategy)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn copies_headers() {
        let dir = tempfile::tempdir().unwrap();
        let primary = fixture(&dir.path().join("install"));
        let settings = settings(dir.path(), SourceStrategy::Copy);

        install_sources(&settings, &primary).await.unwrap();
        let include = settings.include_directory();
        assert!(include.join("pxr/base/tf/token.h").is_file());
        assert!(!std::fs::symlink_metadata(include.join("pxr")).unwrap().file_type().is_symlink());
        assert!(settings.sources_directory().join("OpenUSD.cpp").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_top_level_entries() {
        let dir = tempfile::tempdir().unwrap();
        let primary = fixture(&dir.path().join("install"));
        let settings = settings(dir.path(), SourceStrategy::Symlink);

        install_sources(&settings, &primary).await.unwrap();
        let include = settings.include_directory();
        assert!(std::fs::symlink_metadata(&include).unwrap().is_dir());
        assert!(std::fs::symlink_metadata(include.join("pxr")).unwrap().file_type().is_symlink());
        assert!(include.join("pxr/pxr.h").is_file());
    }
}
