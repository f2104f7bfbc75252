//! Zip archives of merged units.
//!
//! Entries are written in sorted order with a fixed timestamp, so archiving
//! unchanged content always produces the same bytes and the same checksum.
//! Framework version symlinks are stored as symlinks.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    utils::path::to_slash,
};
use std::{
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

/// Archives `directory` into `archive`; entries are prefixed with the
/// directory's own name.
pub async fn archive_directory(directory: &Path, archive: &Path) -> Result<()> {
    let directory = directory.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&directory, &archive))
        .await
        .map_err(|e| Error::GenericError(format!("archive task failed: {e}")))?
}

fn write_archive(directory: &Path, archive: &Path) -> Result<()> {
    let base = directory.parent().unwrap_or(Path::new(""));
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent).fs_context("creating archive directory", parent)?;
    }

    let file = File::create(archive).fs_context("creating archive", archive)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(directory).follow_links(false) {
        entries.push(entry?.into_path());
    }
    entries.sort();

    for path in entries {
        let name = to_slash(path.strip_prefix(base)?);
        let metadata = std::fs::symlink_metadata(&path).fs_context("reading metadata", &path)?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            let target = std::fs::read_link(&path).fs_context("reading symlink", &path)?;
            zip.add_symlink(name, to_slash(&target), options)?;
        } else if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options.unix_permissions(permissions(&metadata)))?;
            let mut source = File::open(&path).fs_context("opening file for archiving", &path)?;
            io::copy(&mut source, &mut zip).fs_context("archiving file", &path)?;
        }
    }

    zip.finish()?;
    log::debug!("Archived {} into {}", directory.display(), archive.display());
    Ok(())
}

#[cfg(unix)]
fn permissions(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Read;

    #[tokio::test]
    async fn stores_files_and_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join("Usd_Tf.xcframework");
        let versions = unit.join("macos-arm64/Usd_Tf.framework/Versions");
        std::fs::create_dir_all(versions.join("A")).unwrap();
        std::fs::write(versions.join("A/Usd_Tf"), "binary").unwrap();
        std::os::unix::fs::symlink("A", versions.join("Current")).unwrap();

        let archive = dir.path().join("out/Usd_Tf.xcframework.zip");
        archive_directory(&unit, &archive).await.unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut binary = String::new();
        zip.by_name("Usd_Tf.xcframework/macos-arm64/Usd_Tf.framework/Versions/A/Usd_Tf")
            .unwrap()
            .read_to_string(&mut binary)
            .unwrap();
        assert_eq!(binary, "binary");

        let link = zip
            .by_name("Usd_Tf.xcframework/macos-arm64/Usd_Tf.framework/Versions/Current")
            .unwrap();
        assert!(link.is_symlink());
    }

    #[tokio::test]
    async fn archives_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join("Usd_Gf.xcframework");
        std::fs::create_dir_all(unit.join("ios-arm64")).unwrap();
        std::fs::write(unit.join("Info.plist"), "plist").unwrap();
        std::fs::write(unit.join("ios-arm64/Usd_Gf"), "binary").unwrap();

        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        archive_directory(&unit, &first).await.unwrap();
        archive_directory(&unit, &second).await.unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }
}
