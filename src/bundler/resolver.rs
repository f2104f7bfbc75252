//! Transitive shared-library closure of one installation.
//!
//! Seeds are every library in `lib/` and every plugin in `plugin/usd/`.
//! Each artifact's `@rpath` dependencies are expanded breadth-first until a
//! pass adds nothing new. Installations are resolved independently, so one
//! platform's libraries never leak into another's closure.

use crate::bundler::{
    error::{Error, ErrorExt, Result, StructuralWarning},
    installation::Installation,
    linkage::{LinkageInspector, LinkageRecord, Reference},
    settings::RelocationPolicy,
    utils::{fs::list_files, path::normalize},
};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// Artifacts that must ship together plus the warnings found on the way.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Canonical (symlink-resolved) paths, sorted and unique.
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<StructuralWarning>,
}

/// Computes dependency closures with a [`LinkageInspector`].
pub struct DependencyResolver<'a> {
    inspector: &'a dyn LinkageInspector,
    ancillary: &'a [String],
    policy: RelocationPolicy,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        inspector: &'a dyn LinkageInspector,
        ancillary: &'a [String],
        policy: RelocationPolicy,
    ) -> Self {
        Self {
            inspector,
            ancillary,
            policy,
        }
    }

    /// Resolves the full closure of `installation`.
    pub fn resolve(&self, installation: &Installation) -> Result<Resolution> {
        let seeds = self.seeds(installation)?;
        log::debug!(
            "{} seed artifacts in {}",
            seeds.len(),
            installation.root().display()
        );
        self.expand(installation, seeds)
    }

    /// Libraries and plugins found directly in the installation, plus any
    /// files matching the ancillary glob patterns.
    pub fn seeds(&self, installation: &Installation) -> Result<Vec<PathBuf>> {
        let mut seeds = list_files(&installation.lib_dir(), is_shared_library)?;
        seeds.extend(list_files(&installation.plugin_dir(), is_shared_library)?);

        let root = glob::Pattern::escape(&installation.root().to_string_lossy());
        for pattern in self.ancillary {
            let matches = glob::glob(&format!("{root}/{pattern}")).map_err(|e| {
                Error::Validation(format!("invalid ancillary artifact pattern '{pattern}': {e}"))
            })?;
            let before = seeds.len();
            for entry in matches {
                let path = entry.map_err(|e| Error::IoError(e.into()))?;
                if path.is_file() {
                    seeds.push(path);
                }
            }
            if seeds.len() == before {
                log::debug!("no ancillary artifact matches {pattern}");
            }
        }
        Ok(seeds)
    }

    /// Expands `seeds` to a fixed point.
    ///
    /// Feeding the result back in returns the same set.
    pub fn expand(&self, installation: &Installation, seeds: Vec<PathBuf>) -> Result<Resolution> {
        let root = canonical(installation.root())?;
        let mut visited: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut warnings = Vec::new();

        for seed in seeds {
            let seed = canonical(&seed)?;
            if visited.insert(seed.clone()) {
                queue.push_back(seed);
            }
        }

        while let Some(artifact) = queue.pop_front() {
            let record = self.inspector.inspect(&artifact)?;
            for dependency in &record.dependencies {
                match self.locate(installation, &root, &artifact, &record, &dependency.reference)? {
                    Located::Found(path) => {
                        if visited.insert(path.clone()) {
                            log::debug!(
                                "{} pulls in {}",
                                artifact.display(),
                                path.display()
                            );
                            queue.push_back(path);
                        }
                    }
                    Located::Ignored => {}
                    Located::Missing => {
                        if record.is_self_reference(&dependency.raw) {
                            continue;
                        }
                        warnings.push(
                            StructuralWarning::MissingDependency {
                                artifact: artifact.clone(),
                                reference: dependency.raw.clone(),
                            }
                            .emit(),
                        );
                    }
                    Located::NonRelocatable => {
                        self.non_relocatable(&artifact, &dependency.raw, &mut warnings)?;
                    }
                    Located::LoaderRelative(path) => {
                        if record.is_self_reference(&dependency.raw) {
                            continue;
                        }
                        self.non_relocatable(&artifact, &dependency.raw, &mut warnings)?;
                        if visited.insert(path.clone()) {
                            queue.push_back(path);
                        }
                    }
                }
            }
        }

        Ok(Resolution {
            artifacts: visited.into_iter().collect(),
            warnings,
        })
    }

    /// Records a reference outside the relocatable locations, or fails under
    /// [`RelocationPolicy::Fail`].
    fn non_relocatable(
        &self,
        artifact: &Path,
        reference: &str,
        warnings: &mut Vec<StructuralWarning>,
    ) -> Result<()> {
        let warning = StructuralWarning::NonRelocatableDependency {
            artifact: artifact.to_path_buf(),
            reference: reference.to_string(),
        };
        if self.policy == RelocationPolicy::Fail {
            crate::bail!("{}", warning);
        }
        warnings.push(warning.emit());
        Ok(())
    }

    fn locate(
        &self,
        installation: &Installation,
        root: &Path,
        artifact: &Path,
        record: &LinkageRecord,
        reference: &Reference,
    ) -> Result<Located> {
        let loader_dir = artifact.parent().unwrap_or(root);
        match reference {
            Reference::System(_) => Ok(Located::Ignored),
            Reference::Rpath(relative) => {
                let mut candidates: Vec<PathBuf> = record
                    .rpaths
                    .iter()
                    .filter_map(|rpath| expand_search_path(rpath, loader_dir))
                    .map(|dir| dir.join(relative))
                    .collect();
                candidates.push(installation.lib_dir().join(relative));
                candidates.push(loader_dir.join(relative));
                let mut outside = false;
                for candidate in candidates {
                    let candidate = normalize(&candidate);
                    if candidate.is_file() {
                        let path = canonical(&candidate)?;
                        if path.starts_with(root) {
                            return Ok(Located::Found(path));
                        }
                        outside = true;
                    }
                }
                Ok(if outside {
                    Located::NonRelocatable
                } else {
                    Located::Missing
                })
            }
            Reference::LoaderPath(relative) => {
                let candidate = normalize(&loader_dir.join(relative));
                if !candidate.is_file() {
                    return Ok(Located::Missing);
                }
                let path = canonical(&candidate)?;
                if path.starts_with(root) {
                    Ok(Located::LoaderRelative(path))
                } else {
                    Ok(Located::NonRelocatable)
                }
            }
            Reference::ExecutablePath(_) => Ok(Located::NonRelocatable),
            Reference::Path(_) => Ok(Located::NonRelocatable),
        }
    }
}

enum Located {
    Found(PathBuf),
    Ignored,
    Missing,
    NonRelocatable,
    /// Inside the installation but addressed relative to the loader; ships
    /// with the closure and is still reported.
    LoaderRelative(PathBuf),
}

/// Shared libraries and loadable plugins.
pub fn is_shared_library(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "dylib" || ext == "so")
}

/// Turns an `LC_RPATH` entry into a directory, if it is one we can follow.
fn expand_search_path(rpath: &str, loader_dir: &Path) -> Option<PathBuf> {
    if let Some(rest) = rpath.strip_prefix("@loader_path") {
        Some(loader_dir.join(rest.trim_start_matches('/')))
    } else if rpath.starts_with('@') {
        None
    } else {
        Some(PathBuf::from(rpath))
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).fs_context("failed to resolve", path)
}
