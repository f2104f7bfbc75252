//! Lexical path manipulation.
//!
//! These helpers never touch the filesystem, so they work on layouts that
//! have not been written yet.

use std::path::{Component, Path, PathBuf};

/// Resolves `.` and `..` components without following symlinks.
///
/// Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Relative path leading from directory `from` to `to`.
///
/// Both paths must be either absolute or relative to the same base.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// Renders a path with forward slashes for manifests and plugInfo files.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../../lib")), PathBuf::from("../../lib"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn relative_path_between_siblings() {
        assert_eq!(
            relative_path(
                Path::new("Usd_Plug.framework/Versions/A/Resources/usd/sdf/Resources"),
                Path::new("Usd_Sdf.framework/Versions/A/Usd_Sdf"),
            ),
            PathBuf::from("../../../../../../../Usd_Sdf.framework/Versions/A/Usd_Sdf")
        );
        assert_eq!(
            relative_path(
                Path::new("HdStorm.framework/BundleResources"),
                Path::new("HdStorm.framework/HdStorm"),
            ),
            PathBuf::from("../HdStorm")
        );
        assert_eq!(relative_path(Path::new("a/b"), Path::new("a/b")), PathBuf::from("."));
    }

    #[test]
    fn to_slash_joins_components() {
        assert_eq!(to_slash(Path::new("a/b/../c")), "a/b/../c");
    }
}
