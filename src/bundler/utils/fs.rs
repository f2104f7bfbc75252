//! File system utilities for bundling.
//!
//! Provides idempotent directory operations, symlink-preserving copies and
//! path-annotated errors.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io::{self},
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_path(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("failed to create directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("failed to remove directory", path),
    }
}

/// Removes a file, symlink or directory tree; a missing path is not an error.
pub async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).fs_context("failed to inspect", path),
    };
    if metadata.is_dir() {
        remove_dir_all(path).await
    } else {
        fs::remove_file(path)
            .await
            .fs_context("failed to remove file", path)
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
fn make_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link.
#[cfg(windows)]
fn make_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Creates `link` pointing at `target`, replacing whatever `link` was.
pub async fn symlink(target: &Path, link: &Path) -> Result<()> {
    remove_path(link).await?;
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("failed to create directory", parent)?;
    }
    let (target_owned, link_owned) = (target.to_path_buf(), link.to_path_buf());
    tokio::task::spawn_blocking(move || make_symlink(&target_owned, &link_owned))
        .await
        .map_err(|e| Error::GenericError(format!("symlink task panicked: {e}")))?
        .fs_context("failed to create symlink", link)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Symlinked sources are followed, so the destination is always a real
/// file. Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!(
            "{} does not exist or is not a file",
            from.display()
        )));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("failed to create directory", dest_dir)?;
    }
    remove_path(to).await?;
    fs::copy(from, to).await.fs_context("failed to copy", from)?;
    Ok(())
}

/// Writes `contents` to `path`, creating parent directories.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("failed to create directory", parent)?;
    }
    fs::write(path, contents)
        .await
        .fs_context("failed to write", path)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks. Existing destination content is merged with the
/// source; files present in both are overwritten.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!(
            "{} does not exist or is not a directory",
            from.display()
        )));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || copy_dir_blocking(&from, &to))
        .await
        .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {e}")))?
}

fn copy_dir_blocking(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).fs_context("failed to create directory", to)?;

    for entry in walkdir::WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target =
                std::fs::read_link(entry.path()).fs_context("failed to read link", entry.path())?;
            if std::fs::symlink_metadata(&dest_path).is_ok() {
                remove_blocking(&dest_path)?;
            }
            make_symlink(&target, &dest_path).fs_context("failed to create symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path)
                .fs_context("failed to create directory", &dest_path)?;
        } else {
            if std::fs::symlink_metadata(&dest_path).is_ok_and(|m| m.file_type().is_symlink()) {
                std::fs::remove_file(&dest_path).fs_context("failed to remove", &dest_path)?;
            }
            std::fs::copy(entry.path(), &dest_path).fs_context("failed to copy", entry.path())?;
        }
    }

    Ok(())
}

fn remove_blocking(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).fs_context("failed to inspect", path)?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path).fs_context("failed to remove directory", path)
    } else {
        std::fs::remove_file(path).fs_context("failed to remove file", path)
    }
}

/// Whether a path exists without following a final symlink.
pub async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

/// Regular files directly inside `dir` matching `filter`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path, filter: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).fs_context("failed to list", dir),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.fs_context("failed to list", dir)?.path();
        if path.is_file() && filter(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_preserves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested/file.txt"), "hello").unwrap();
        std::os::unix::fs::symlink("nested/file.txt", src.join("link")).unwrap();

        let dst = dir.path().join("dst");
        copy_dir(&src, &dst).await.unwrap();
        // Second copy merges over the first.
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("nested/file.txt")).unwrap(), "hello");
        assert_eq!(
            std::fs::read_link(dst.join("link")).unwrap(),
            PathBuf::from("nested/file.txt")
        );
    }

    #[tokio::test]
    async fn copy_file_follows_symlinked_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("libfoo.1.0.dylib"), "binary").unwrap();
        std::os::unix::fs::symlink("libfoo.1.0.dylib", dir.path().join("libfoo.dylib")).unwrap();

        let dst = dir.path().join("out/Foo");
        copy_file(&dir.path().join("libfoo.dylib"), &dst).await.unwrap();
        assert!(!std::fs::symlink_metadata(&dst).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "binary");
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        remove_path(&missing).await.unwrap();
        create_dir_all(&missing, true).await.unwrap();
        assert!(missing.is_dir());
        remove_path(&missing).await.unwrap();
        assert!(!path_exists(&missing).await);
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.dylib", "a.dylib", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let files = list_files(dir.path(), |p| {
            p.extension().is_some_and(|e| e == "dylib")
        })
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.dylib", "b.dylib"]);
        assert!(list_files(&dir.path().join("nope"), |_| true).unwrap().is_empty());
    }
}
