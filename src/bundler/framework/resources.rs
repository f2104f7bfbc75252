//! Runtime resources copied into framework bundles.

use super::{
    FrameworkLayout,
    plug_info::{self, PLUG_INFO},
};
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    installation::Installation,
    settings::Platform,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Directory the materials library searches for its shader libraries.
pub const MATERIALS_DIR: &str = "libraries";

/// Copies the installation's plugin descriptor tree (`lib/usd`) into the
/// plug library's framework and rewrites every manifest in it.
///
/// Returns the number of manifests rewritten.
pub async fn install_plugin_descriptors(
    installation: &Installation,
    layout: &FrameworkLayout,
) -> Result<usize> {
    let source = installation.plugin_descriptor_dir();
    if !source.is_dir() {
        log::warn!(
            "{} has no plugin descriptors at {}",
            installation.root().display(),
            source.display()
        );
        return Ok(0);
    }

    let destination = layout.resources_dir().join("usd");
    fs::copy_dir(&source, &destination).await?;
    normalize_resource_dirs(&destination, layout.platform()).await?;

    let bootstrap = destination.join(PLUG_INFO);
    if bootstrap.is_file() {
        let bootstrap_dir = sibling_path(layout, &destination)?;
        let includes = plug_info::bootstrap_includes(&bootstrap_dir, layout.platform());
        let text = tokio::fs::read_to_string(&bootstrap)
            .await
            .fs_context("failed to read", &bootstrap)?;
        let text = plug_info::rewrite_includes(&text, &includes)?;
        fs::write_file(&bootstrap, text).await?;
    }

    rewrite_manifests(layout, &destination).await
}

/// Copies a plugin's companion directory (`<dir>/<stem>/` next to the
/// artifact) into the framework's resources.
///
/// A `resources` child is merged straight into the resource directory, so a
/// plugin's own manifest ends up at the top of its bundle's resources.
/// Returns whether a companion directory existed.
pub async fn install_companion_resources(artifact: &Path, layout: &FrameworkLayout) -> Result<bool> {
    let Some(companion) = companion_dir(artifact) else {
        return Ok(false);
    };

    let resources = layout.resources_dir();
    let mut children = Vec::new();
    let mut entries = tokio::fs::read_dir(&companion)
        .await
        .fs_context("failed to list", &companion)?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("failed to list", &companion)?
    {
        children.push(entry.path());
    }
    children.sort();

    for child in children {
        let Some(name) = child.file_name() else {
            continue;
        };
        if child.is_dir() {
            if name.to_string_lossy().eq_ignore_ascii_case("resources") {
                fs::copy_dir(&child, &resources).await?;
            } else {
                fs::copy_dir(&child, &resources.join(name)).await?;
            }
        } else {
            fs::copy_file(&child, &resources.join(name)).await?;
        }
    }

    normalize_resource_dirs(&resources, layout.platform()).await?;
    let rewritten = rewrite_manifests(layout, &resources).await?;
    log::debug!(
        "Copied companion resources of {} ({} manifest(s))",
        artifact.display(),
        rewritten
    );
    Ok(true)
}

/// Copies the installation's MaterialX search directory into the materials
/// library's framework.
pub async fn install_materials_libraries(
    installation: &Installation,
    search_dir: &str,
    layout: &FrameworkLayout,
) -> Result<bool> {
    let source = installation.root().join(search_dir);
    if !source.is_dir() {
        log::warn!(
            "materials search directory {} not found; the materials library will lack its shader libraries",
            source.display()
        );
        return Ok(false);
    }
    fs::copy_dir(&source, &layout.resources_dir().join(MATERIALS_DIR)).await?;
    Ok(true)
}

fn companion_dir(artifact: &Path) -> Option<PathBuf> {
    let stem = artifact.file_stem()?;
    let dir = artifact.parent()?.join(stem);
    dir.is_dir().then_some(dir)
}

/// Renames lower-case `resources` directories under `dir` to the platform's
/// resource directory name.
pub async fn normalize_resource_dirs(dir: &Path, platform: Platform) -> Result<()> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || normalize_resource_dirs_blocking(&dir, platform))
        .await
        .map_err(|e| Error::GenericError(format!("resource rename task panicked: {e}")))?
}

fn normalize_resource_dirs_blocking(dir: &Path, platform: Platform) -> Result<()> {
    let target_name = platform.resources_dir();

    let mut candidates = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir()
            && entry.file_name().to_string_lossy().eq_ignore_ascii_case("resources")
            && entry.file_name() != target_name
        {
            candidates.push(entry.into_path());
        }
    }

    for source in candidates {
        let Some(parent) = source.parent() else {
            continue;
        };
        // Two steps so a case-only rename also works on case-insensitive volumes.
        let intermediate = parent.join(".resources-rename");
        std::fs::rename(&source, &intermediate).fs_context("failed to rename", &source)?;
        let target = parent.join(target_name);
        if target.exists() {
            merge_blocking(&intermediate, &target)?;
            std::fs::remove_dir_all(&intermediate)
                .fs_context("failed to remove directory", &intermediate)?;
        } else {
            std::fs::rename(&intermediate, &target).fs_context("failed to rename", &intermediate)?;
        }
        log::debug!("Renamed {} to {}", source.display(), target.display());
    }
    Ok(())
}

fn merge_blocking(from: &Path, to: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let dest = to.join(entry.path().strip_prefix(from)?);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).fs_context("failed to create directory", &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest).fs_context("failed to copy", entry.path())?;
        }
    }
    Ok(())
}

/// Rewrites every `plugInfo.json` below `dir`.
async fn rewrite_manifests(layout: &FrameworkLayout, dir: &Path) -> Result<usize> {
    let mut manifests = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == PLUG_INFO {
            manifests.push(entry.into_path());
        }
    }

    for manifest in &manifests {
        let Some(manifest_dir) = manifest.parent() else {
            continue;
        };
        let relative_dir = sibling_path(layout, manifest_dir)?;
        let text = tokio::fs::read_to_string(manifest)
            .await
            .fs_context("failed to read", manifest)?;
        let rewritten = plug_info::rewrite_manifest(&text, &relative_dir, layout.platform())
            .map_err(|e| Error::GenericError(format!("{}: {e}", manifest.display())))?;
        if rewritten != text {
            fs::write_file(manifest, rewritten).await?;
        }
    }
    Ok(manifests.len())
}

/// Path of `dir` (inside the layout's resources) as seen from the directory
/// holding all frameworks side by side.
fn sibling_path(layout: &FrameworkLayout, dir: &Path) -> Result<PathBuf> {
    let inner = dir.strip_prefix(layout.resources_dir())?;
    Ok(layout.sibling_resources_path().join(inner))
}
