//! Output directory handling.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::Settings,
    utils::fs,
};
use std::path::Path;

/// Name of the scratch directory kept across `--force` runs.
pub const SCRATCH_DIR: &str = ".build";

/// Rejects a non-empty output directory unless `force` is set.
///
/// Only reads; safe to call during pre-flight validation.
pub fn check_output_directory(settings: &Settings) -> Result<()> {
    let output = settings.output_directory();
    if output.exists() && !output.is_dir() {
        crate::invalid!(
            "output path {} exists and is not a directory",
            output.display()
        );
    }
    if settings.force() || !output.exists() {
        return Ok(());
    }
    if !user_entries(output)?.is_empty() {
        crate::invalid!(
            "output directory {} is not empty (use --force to overwrite)",
            output.display()
        );
    }
    Ok(())
}

/// Removes everything in the output directory except the scratch tree.
pub async fn clear_output_directory(settings: &Settings) -> Result<()> {
    let output = settings.output_directory();
    if !output.exists() {
        return Ok(());
    }
    for entry in user_entries(output)? {
        log::debug!("Removing {}", entry.display());
        fs::remove_path(&entry).await?;
    }
    Ok(())
}

fn user_entries(output: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(output).fs_context("reading output directory", output)? {
        let entry = entry.fs_context("reading output directory", output)?;
        if entry.file_name() != SCRATCH_DIR {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    fn settings(output: &Path, force: bool) -> Settings {
        SettingsBuilder::new()
            .installation("/opt/usd")
            .output_directory(output)
            .force(force)
            .build()
            .unwrap()
    }

    #[test]
    fn missing_or_scratch_only_output_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("pkg");
        check_output_directory(&settings(&output, false)).unwrap();

        std::fs::create_dir_all(output.join(SCRATCH_DIR)).unwrap();
        check_output_directory(&settings(&output, false)).unwrap();
    }

    #[test]
    fn non_empty_output_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Package.swift"), "").unwrap();
        let err = check_output_directory(&settings(dir.path(), false)).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("--force"));
        check_output_directory(&settings(dir.path(), true)).unwrap();
    }

    #[tokio::test]
    async fn force_keeps_scratch_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".build/frameworks")).unwrap();
        std::fs::create_dir_all(dir.path().join("Libraries/Usd_Tf.xcframework")).unwrap();
        std::fs::write(dir.path().join("Package.swift"), "").unwrap();

        clear_output_directory(&settings(dir.path(), true)).await.unwrap();
        assert!(dir.path().join(".build/frameworks").is_dir());
        assert!(!dir.path().join("Libraries").exists());
        assert!(!dir.path().join("Package.swift").exists());
    }
}
