//! Module map generation for the package's public headers.
//!
//! Every header under the include root is filtered through [`Exclusions`]
//! and declared in a deterministic order: pinned headers first, then by
//! owning library in [`LIBRARY_ORDER`], then alphabetically. Headers of
//! unknown libraries come last with a warning.

mod exclusions;
mod features;
mod library_order;

pub use exclusions::{DEFAULT_EXCLUSIONS, Exclusions, is_header};
pub use features::{OPTIONAL_FEATURES, OptionalFeature, render_stanzas};
pub use library_order::{LIBRARY_ORDER, LibraryRank, library_of, rank};

use crate::bundler::{
    error::{Result, StructuralWarning},
    installation::FeatureFlags,
    utils::{fs, path::to_slash},
};
use std::path::Path;

/// Configuration header pinned right after the feature-flag header.
pub const CONFIG_HEADER: &str = "pxr/pxr.h";

/// File name of the generated module map.
pub const MODULE_MAP: &str = "module.modulemap";

/// One declared header.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeaderEntry {
    pub rank: LibraryRank,
    /// Include-root-relative path with forward slashes.
    pub path: String,
}

/// Result of a generation pass.
#[derive(Debug)]
pub struct ModuleDescription {
    pub headers: Vec<HeaderEntry>,
    pub text: String,
    pub warnings: Vec<StructuralWarning>,
}

pub struct ModuleDescriptionGenerator<'a> {
    module: &'a str,
    feature_header: &'a str,
    exclusions: Exclusions,
    flags: &'a FeatureFlags,
}

impl<'a> ModuleDescriptionGenerator<'a> {
    pub fn new(
        module: &'a str,
        feature_header: &'a str,
        exclusions: Exclusions,
        flags: &'a FeatureFlags,
    ) -> Self {
        Self {
            module,
            feature_header,
            exclusions,
            flags,
        }
    }

    /// Enumerates, filters and orders headers below `include_root`.
    pub fn generate(&self, include_root: &Path) -> Result<ModuleDescription> {
        let paths = collect_headers(include_root)?;
        let (headers, warnings) = self.order(paths);
        let text = self.render(&headers);
        Ok(ModuleDescription {
            headers,
            text,
            warnings,
        })
    }

    /// Writes `module.modulemap` into `include_root`.
    pub async fn write(&self, include_root: &Path) -> Result<ModuleDescription> {
        let description = self.generate(include_root)?;
        fs::write_file(&include_root.join(MODULE_MAP), &description.text).await?;
        log::info!(
            "✓ Module map declares {} headers",
            description.headers.len()
        );
        Ok(description)
    }

    /// Applies exclusions and sorts; the result does not depend on the
    /// input order.
    pub fn order(
        &self,
        paths: impl IntoIterator<Item = String>,
    ) -> (Vec<HeaderEntry>, Vec<StructuralWarning>) {
        let pinned = [self.feature_header, CONFIG_HEADER];
        let mut headers: Vec<HeaderEntry> = paths
            .into_iter()
            .filter(|p| is_header(p) && !self.exclusions.is_excluded(p))
            .map(|path| HeaderEntry {
                rank: rank(&path, &pinned),
                path,
            })
            .collect();
        headers.sort();
        headers.dedup();

        let warnings = headers
            .iter()
            .filter(|h| h.rank == LibraryRank::Unknown)
            .map(|h| {
                StructuralWarning::UnknownHeaderLibrary {
                    header: h.path.clone(),
                }
                .emit()
            })
            .collect();
        (headers, warnings)
    }

    pub fn render(&self, headers: &[HeaderEntry]) -> String {
        let mut out = String::from("// Generated by make_openusd_package. Do not edit.\n");
        out.push_str(&format!("module {} {{\n", self.module));
        for header in headers {
            out.push_str(&format!("    header \"{}\"\n", header.path));
        }
        out.push_str("    export *\n}\n");
        out.push_str(&render_stanzas(self.module, self.flags));
        out
    }
}

/// All files below `include_root` as relative forward-slash paths.
///
/// Symlinks are followed so symlinked source trees are enumerated too.
pub fn collect_headers(include_root: &Path) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(include_root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(include_root)?;
            paths.push(to_slash(relative));
        }
    }
    Ok(paths)
}
