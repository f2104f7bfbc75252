//! Companion compiler/linker flags file.
//!
//! One flag per line so build scripts can splice the file into a command
//! line. Paths are absolute.

use crate::bundler::installation::FeatureFlags;
use std::path::Path;

/// Silences the duplicate `-lc++` warnings caused by the libc++ workaround
/// every OpenUSD library links with.
pub const DUPLICATE_LIBRARIES_WORKAROUND: [&str; 2] = ["-Xlinker", "-no_warn_duplicate_libraries"];

pub const PYTHON_FLAG: &str = "PXR_ENABLE_PYTHON_SUPPORT";
pub const PYTHON_INCLUDE_DIR: &str = "Python3_INCLUDE_DIR";
pub const PYTHON_LIBRARY: &str = "Python3_LIBRARY";

/// Renders the flags file.
///
/// `raw_libraries` is the libraries directory when a raw install strategy
/// places plain dylibs there; bundled packages link through binary targets
/// instead.
pub fn render_flags(
    include_dir: &Path,
    raw_libraries: Option<&Path>,
    flags: &FeatureFlags,
) -> String {
    let mut lines = vec![format!("-I{}", include_dir.display())];

    if let Some(libraries) = raw_libraries {
        lines.push(format!("-L{}", libraries.display()));
        lines.push("-Xlinker".into());
        lines.push("-rpath".into());
        lines.push("-Xlinker".into());
        lines.push(libraries.display().to_string());
    }

    lines.extend(DUPLICATE_LIBRARIES_WORKAROUND.iter().map(|s| s.to_string()));

    if flags.is_enabled(PYTHON_FLAG) {
        match flags.get(PYTHON_INCLUDE_DIR).filter(|v| !v.is_empty()) {
            Some(dir) => lines.push(format!("-I{dir}")),
            None => log::warn!("{PYTHON_FLAG} is on but {PYTHON_INCLUDE_DIR} is not set"),
        }
        match flags.get(PYTHON_LIBRARY).filter(|v| !v.is_empty()) {
            Some(library) => lines.push(library.to_string()),
            None => log::warn!("{PYTHON_FLAG} is on but {PYTHON_LIBRARY} is not set"),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
