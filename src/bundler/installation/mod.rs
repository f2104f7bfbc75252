//! Validated set of platform installations.
//!
//! An installation is one platform's already-built OpenUSD install tree.
//! Validation only reads from disk, so a failing run leaves no partial
//! output behind.

mod features;

pub use features::{CMAKE_CONFIG, CONFIG_HEADER, FeatureFlags, coerce_bool};

use crate::bundler::{
    error::{Error, Result, StructuralWarning},
    linkage::LinkageInspector,
    settings::{FlagConflictPolicy, PlatformTarget, Settings},
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One platform's installation tree.
#[derive(Clone, Debug)]
pub struct Installation {
    index: usize,
    root: PathBuf,
    target: PlatformTarget,
    flags: FeatureFlags,
    scratch: PathBuf,
}

impl Installation {
    pub fn new(
        index: usize,
        root: PathBuf,
        target: PlatformTarget,
        flags: FeatureFlags,
        scratch: PathBuf,
    ) -> Self {
        Self {
            index,
            root,
            target,
            flags,
            scratch,
        }
    }

    /// Position on the command line.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target(&self) -> &PlatformTarget {
        &self.target
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Scratch directory owned by this installation's bundling tasks.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// Directory holding the `plugInfo.json` tree of the core libraries.
    pub fn plugin_descriptor_dir(&self) -> PathBuf {
        self.lib_dir().join("usd")
    }

    /// Directory holding loadable plugin artifacts.
    pub fn plugin_dir(&self) -> PathBuf {
        self.root.join("plugin").join("usd")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }
}

/// All installations of a run plus their merged feature flags.
#[derive(Clone, Debug)]
pub struct InstallationSet {
    installations: Vec<Installation>,
    flags: FeatureFlags,
}

impl InstallationSet {
    /// Validates every installation root named in `settings`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] naming the offending path when:
    /// - a root is not a directory
    /// - the core library is missing
    /// - the core library's platform cannot be determined
    /// - a raw install strategy is used with a non-host platform
    /// - two installations target the same platform slice
    /// - feature flags conflict and the policy is [`FlagConflictPolicy::Fail`]
    pub fn validate(
        settings: &Settings,
        inspector: &dyn LinkageInspector,
    ) -> Result<(Self, Vec<StructuralWarning>)> {
        let config = settings.config();
        let mut installations: Vec<Installation> = Vec::new();

        for (index, root) in settings.installations().iter().enumerate() {
            if !root.is_dir() {
                return Err(Error::Validation(format!(
                    "installation {} does not exist or is not a directory",
                    root.display()
                )));
            }

            let core = root.join("lib").join(&config.core_library);
            if !core.is_file() {
                return Err(Error::Validation(format!(
                    "installation {} is missing its core library {}",
                    root.display(),
                    core.display()
                )));
            }

            let record = inspector.inspect(&core)?;
            let target = record.target.ok_or_else(|| {
                Error::Validation(format!(
                    "cannot determine the target platform of {}",
                    core.display()
                ))
            })?;

            if settings.install_strategy().is_raw() && !target.platform().is_host() {
                return Err(Error::Validation(format!(
                    "installation {} targets {}, but {:?} only supports host (macOS) builds",
                    root.display(),
                    target.platform(),
                    settings.install_strategy()
                )));
            }

            if let Some(other) = installations
                .iter()
                .find(|i| i.target.slice_identifier() == target.slice_identifier())
            {
                return Err(Error::Validation(format!(
                    "installations {} and {} both target {}",
                    other.root.display(),
                    root.display(),
                    target.slice_identifier()
                )));
            }

            let flags = FeatureFlags::load(root)?;
            let scratch = settings
                .scratch_directory()
                .join("installations")
                .join(format!("{}-{}", index, target.slice_identifier()));

            log::info!("Validated installation {} ({})", root.display(), target);
            installations.push(Installation::new(
                index,
                root.clone(),
                target,
                flags,
                scratch,
            ));
        }

        let (flags, warnings) = merge_flags(&installations, config.flag_conflicts)?;
        Ok((
            Self {
                installations,
                flags,
            },
            warnings,
        ))
    }

    pub fn installations(&self) -> &[Installation] {
        &self.installations
    }

    /// Feature flags merged across all installations.
    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// First installation; its headers are the package's public headers.
    pub fn primary(&self) -> Option<&Installation> {
        self.installations.first()
    }

    pub fn targets(&self) -> Vec<&PlatformTarget> {
        self.installations.iter().map(|i| &i.target).collect()
    }
}

const UNSET: &str = "<unset>";

/// Merges per-installation flags; the later installation wins on conflict.
fn merge_flags(
    installations: &[Installation],
    policy: FlagConflictPolicy,
) -> Result<(FeatureFlags, Vec<StructuralWarning>)> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    let mut warnings = Vec::new();

    let all_names: std::collections::BTreeSet<&str> = installations
        .iter()
        .flat_map(|i| i.flags.iter().map(|(k, _)| k))
        .collect();

    for (position, installation) in installations.iter().enumerate() {
        for name in &all_names {
            let current = installation.flags.get(name);
            if let Some(previous) = merged.get(*name) {
                let current_str = current.unwrap_or(UNSET);
                if previous != current_str {
                    let conflict = StructuralWarning::FeatureFlagConflict {
                        flag: name.to_string(),
                        previous: previous.clone(),
                        current: current_str.to_string(),
                    };
                    if policy == FlagConflictPolicy::Fail {
                        return Err(Error::Validation(conflict.to_string()));
                    }
                    warnings.push(conflict.emit());
                }
            } else if position > 0 && current.is_some() {
                // Present here but absent in an earlier installation.
                let conflict = StructuralWarning::FeatureFlagConflict {
                    flag: name.to_string(),
                    previous: UNSET.to_string(),
                    current: current.unwrap_or_default().to_string(),
                };
                if policy == FlagConflictPolicy::Fail {
                    return Err(Error::Validation(conflict.to_string()));
                }
                warnings.push(conflict.emit());
            }
            if let Some(current) = current {
                merged.insert(name.to_string(), current.to_string());
            }
        }
    }

    let mut flags = FeatureFlags::default();
    for (k, v) in merged {
        flags.insert(k, v);
    }
    Ok((flags, warnings))
}
