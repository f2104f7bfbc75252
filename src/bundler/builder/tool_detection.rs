//! External tool availability checking.
//!
//! Bundling needs Apple's `install_name_tool` and `codesign`. Both are
//! looked up once per process; a missing tool is a validation failure so the
//! run stops before touching the output directory.

use crate::bundler::{
    error::{Error, Result},
    tools::{CODESIGN, INSTALL_NAME_TOOL},
};
use std::{path::PathBuf, sync::LazyLock};

/// Tools required by [`SystemToolchain`](crate::bundler::tools::SystemToolchain).
pub const REQUIRED_TOOLS: [&str; 2] = [INSTALL_NAME_TOOL, CODESIGN];

/// Cached lookup results, in [`REQUIRED_TOOLS`] order.
static TOOL_PATHS: LazyLock<Vec<(&'static str, Option<PathBuf>)>> = LazyLock::new(|| {
    REQUIRED_TOOLS
        .iter()
        .map(|tool| match which::which(tool) {
            Ok(path) => {
                log::debug!("Found {tool} at: {}", path.display());
                (*tool, Some(path))
            }
            Err(e) => {
                log::debug!("{tool} not found in PATH: {e}");
                (*tool, None)
            }
        })
        .collect()
});

/// Fails with [`Error::Validation`] naming every missing tool.
pub fn require_tools() -> Result<()> {
    let missing: Vec<&str> = TOOL_PATHS
        .iter()
        .filter(|(_, path)| path.is_none())
        .map(|(tool, _)| *tool)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "required tool(s) not found in PATH: {} (install the Xcode command line tools)",
        missing.join(", ")
    )))
}
