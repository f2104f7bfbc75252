//! Package configuration file and run policies.

use crate::bundler::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// How the libraries area of the package is populated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStrategy {
    /// Symlink the raw installation's `lib/` directory (single macOS install only).
    SymlinkInstall,
    /// Copy the raw installation's `lib/` directory (single macOS install only).
    CopyInstall,
    /// Wrap every library into frameworks and merge them into xcframeworks.
    #[default]
    Bundle,
}

impl InstallStrategy {
    /// Raw strategies consume the installation as-is and need a host build.
    pub fn is_raw(&self) -> bool {
        !matches!(self, InstallStrategy::Bundle)
    }
}

/// How headers and glue sources are brought into the package.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceStrategy {
    #[default]
    Copy,
    Symlink,
}

/// What to do when installations disagree on a feature flag.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagConflictPolicy {
    /// Keep the value of the later installation and warn.
    #[default]
    LastWins,
    /// Abort the run with a validation error.
    Fail,
}

/// What to do when a dependency lives outside the relocatable locations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelocationPolicy {
    #[default]
    Warn,
    Fail,
}

/// Package-level configuration, optionally loaded from a TOML file.
///
/// Every field has a default, so an empty file is valid:
///
/// ```toml
/// package-name = "OpenUSD"
/// identifier-prefix = "org.openusd"
/// flag-conflicts = "fail"
/// non-relocatable = "warn"
/// header-exclusions = ["pxr/imaging/hgiVulkan/"]
/// ```
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageConfig {
    /// Swift package, product and umbrella target name.
    pub package_name: String,

    /// Reverse-DNS prefix for framework bundle identifiers.
    pub identifier_prefix: String,

    /// `CFBundleShortVersionString` written into every framework.
    pub short_version: String,

    /// `CFBundleVersion` written into every framework.
    pub bundle_version: String,

    /// Code signing identity; `-` signs ad-hoc.
    ///
    /// Default: None (falls back to `CODESIGN_IDENTITY`, then ad-hoc)
    pub signing_identity: Option<String>,

    /// Prefix prepended to every path generated into the manifest.
    pub path_prefix: String,

    /// File name of the library that must exist in every installation.
    pub core_library: String,

    /// File name of the plugin registry library.
    pub plug_library: String,

    /// File name of the materials library.
    pub materials_library: String,

    /// Installation-relative search directory shipped with the materials library.
    pub materials_search_dir: String,

    /// Installation-relative glob patterns of artifacts added when present.
    pub ancillary_artifacts: Vec<String>,

    /// Header path prefixes excluded in addition to the built-in rules.
    pub header_exclusions: Vec<String>,

    pub flag_conflicts: FlagConflictPolicy,

    pub non_relocatable: RelocationPolicy,

    /// Maximum number of concurrent bundling tasks.
    ///
    /// Default: None (number of CPUs)
    pub jobs: Option<usize>,

    /// Replacement for the built-in `Package.swift` template.
    pub manifest_template: Option<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            package_name: "OpenUSD".into(),
            identifier_prefix: "org.openusd".into(),
            short_version: "1.0".into(),
            bundle_version: "1".into(),
            signing_identity: None,
            path_prefix: String::new(),
            core_library: "libusd_usd.dylib".into(),
            plug_library: "libusd_plug.dylib".into(),
            materials_library: "libusd_usdMtlx.dylib".into(),
            materials_search_dir: "libraries".into(),
            ancillary_artifacts: vec!["lib/libtbbmalloc*.dylib".into()],
            header_exclusions: Vec::new(),
            flag_conflicts: FlagConflictPolicy::default(),
            non_relocatable: RelocationPolicy::default(),
            jobs: None,
            manifest_template: None,
        }
    }
}

impl PackageConfig {
    /// Loads the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).fs_context("reading config file", path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Signing identity after applying the environment override.
    pub fn resolved_signing_identity(&self) -> String {
        self.signing_identity
            .clone()
            .or_else(|| std::env::var("CODESIGN_IDENTITY").ok())
            .filter(|identity| !identity.trim().is_empty())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: PackageConfig = toml::from_str("").unwrap();
        assert_eq!(config.package_name, "OpenUSD");
        assert_eq!(config.flag_conflicts, FlagConflictPolicy::LastWins);
        assert_eq!(config.non_relocatable, RelocationPolicy::Warn);
    }

    #[test]
    fn policies_parse_kebab_case() {
        let config: PackageConfig = toml::from_str(
            r#"
            package-name = "MyUSD"
            flag-conflicts = "fail"
            non-relocatable = "fail"
            header-exclusions = ["pxr/imaging/hgiVulkan/"]
            jobs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.package_name, "MyUSD");
        assert_eq!(config.flag_conflicts, FlagConflictPolicy::Fail);
        assert_eq!(config.non_relocatable, RelocationPolicy::Fail);
        assert_eq!(config.header_exclusions, vec!["pxr/imaging/hgiVulkan/"]);
        assert_eq!(config.jobs, Some(3));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<PackageConfig>("colour = \"blue\"").is_err());
    }

    #[test]
    fn explicit_identity_wins() {
        let config = PackageConfig {
            signing_identity: Some("Developer ID Application: Example".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_signing_identity(),
            "Developer ID Application: Example"
        );
    }
}
