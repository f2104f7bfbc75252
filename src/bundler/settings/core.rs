//! Core Settings struct and implementations.

use super::{InstallStrategy, PackageConfig, SourceStrategy};
use std::path::{Path, PathBuf};
use url::Url;

/// Where and under which URL archived xcframeworks are published.
#[derive(Clone, Debug)]
pub struct RemoteArtifacts {
    /// Directory receiving the `.xcframework.zip` archives.
    pub directory: PathBuf,
    /// Base URL the archives will be hosted under.
    pub hosting_url: Url,
}

impl RemoteArtifacts {
    /// Download URL for one archive file.
    pub fn url_for(&self, file_name: &str) -> String {
        let base = self.hosting_url.as_str().trim_end_matches('/');
        format!("{base}/{file_name}")
    }
}

/// Main settings for a packaging run.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder); immutable
/// once built.
#[derive(Clone, Debug)]
pub struct Settings {
    installations: Vec<PathBuf>,
    install_strategy: InstallStrategy,
    source_strategy: SourceStrategy,
    output_directory: PathBuf,
    remote: Option<RemoteArtifacts>,
    force: bool,
    config: PackageConfig,
}

impl Settings {
    /// Installation roots in the order given on the command line.
    pub fn installations(&self) -> &[PathBuf] {
        &self.installations
    }

    pub fn install_strategy(&self) -> InstallStrategy {
        self.install_strategy
    }

    pub fn source_strategy(&self) -> SourceStrategy {
        self.source_strategy
    }

    /// Directory the package is generated into (contains `Package.swift`).
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn remote(&self) -> Option<&RemoteArtifacts> {
        self.remote.as_ref()
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    pub fn package_name(&self) -> &str {
        &self.config.package_name
    }

    /// Number of concurrent bundling tasks.
    pub fn jobs(&self) -> usize {
        self.config.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Scratch tree kept between runs for incremental bundling.
    pub fn scratch_directory(&self) -> PathBuf {
        self.output_directory.join(".build")
    }

    /// Root of the generated package content (output plus path prefix).
    pub fn content_root(&self) -> PathBuf {
        self.output_directory.join(&self.config.path_prefix)
    }

    /// Directory holding one entry per merged library.
    pub fn libraries_directory(&self) -> PathBuf {
        self.content_root().join("Libraries")
    }

    /// Source directory of the umbrella target.
    pub fn sources_directory(&self) -> PathBuf {
        self.content_root()
            .join("Sources")
            .join(&self.config.package_name)
    }

    /// Public include root of the umbrella target.
    pub fn include_directory(&self) -> PathBuf {
        self.sources_directory().join("include")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_directory.join("Package.swift")
    }

    pub fn flags_path(&self) -> PathBuf {
        self.content_root().join(format!("{}.flags", self.config.package_name))
    }

    /// File name of the generated feature-flag header.
    pub fn feature_header_name(&self) -> String {
        format!("{}FeatureFlags.h", self.config.package_name)
    }

    /// Manifest-relative form of a content path (the path-prefix token applied).
    pub fn prefixed(&self, relative: &str) -> String {
        let prefix = self.config.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{prefix}/{relative}")
        }
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        installations: Vec<PathBuf>,
        install_strategy: InstallStrategy,
        source_strategy: SourceStrategy,
        output_directory: PathBuf,
        remote: Option<RemoteArtifacts>,
        force: bool,
        config: PackageConfig,
    ) -> Self {
        Self {
            installations,
            install_strategy,
            source_strategy,
            output_directory,
            remote,
            force,
            config,
        }
    }
}
