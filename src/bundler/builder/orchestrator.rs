//! Main bundler orchestration and coordination.

use super::{check_output_directory, clear_output_directory, require_tools};
use crate::bundler::{
    error::{Error, Result, StructuralWarning},
    framework::{Bundle, LibraryBundler},
    headers::{Exclusions, ModuleDescriptionGenerator},
    installation::{Installation, InstallationSet},
    linkage::{LinkageInspector, MachOInspector},
    manifest::{BinaryTarget, PackageManifestWriter, TargetLocation},
    publish::{ArtifactPublisher, ChecksummedArtifact},
    resolver::DependencyResolver,
    settings::{InstallStrategy, PackageConfig, PlatformFamily, Settings},
    sources::install_sources,
    tools::{ProcessRegistry, SystemToolchain, Toolchain},
    utils::fs,
    xcframework::{MergedUnit, PlatformMerger},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Every bundle, sorted by name then slice.
    pub bundles: Vec<Bundle>,
    /// Merged units sorted by name.
    pub units: Vec<MergedUnit>,
    /// Published archives, when remote publishing was requested.
    pub artifacts: Vec<ChecksummedArtifact>,
    /// Headers declared in the module map.
    pub header_count: usize,
    pub warnings: Vec<StructuralWarning>,
    /// Generated files, in the order they were written.
    pub written: Vec<PathBuf>,
}

impl RunReport {
    /// Bundles newly created by this run (the rest were already present).
    pub fn created_bundles(&self) -> usize {
        self.bundles.iter().filter(|b| b.created).count()
    }
}

/// Main bundler orchestrator.
///
/// # Examples
///
/// ```no_run
/// use openusd_package_bundler::bundler::{Bundler, SettingsBuilder};
/// use openusd_package_bundler::bundler::tools::ProcessRegistry;
///
/// # async fn example() -> openusd_package_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .installation("/opt/usd/macos")
///     .installation("/opt/usd/ios-simulator")
///     .output_directory("build/OpenUSD")
///     .build()?;
///
/// let report = Bundler::new(settings, ProcessRegistry::default()).run().await?;
/// println!("{} xcframeworks", report.units.len());
/// # Ok(())
/// # }
/// ```
pub struct Bundler<T: Toolchain = SystemToolchain> {
    settings: Settings,
    config: Arc<PackageConfig>,
    toolchain: Arc<T>,
    inspector: Arc<dyn LinkageInspector>,
    token: CancellationToken,
    check_tools: bool,
}

impl<T: Toolchain> std::fmt::Debug for Bundler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("settings", &self.settings)
            .field("check_tools", &self.check_tools)
            .finish_non_exhaustive()
    }
}

impl Bundler<SystemToolchain> {
    /// Bundler using the system tools and the Mach-O inspector.
    ///
    /// Cancelling `registry` terminates every running tool.
    pub fn new(settings: Settings, registry: ProcessRegistry) -> Self {
        let token = registry.token().clone();
        let mut bundler = Self::with_toolchain(
            settings,
            SystemToolchain::new(registry),
            Arc::new(MachOInspector),
            token,
        );
        bundler.check_tools = true;
        bundler
    }
}

impl<T: Toolchain> Bundler<T> {
    /// Bundler with an injected toolchain and inspector.
    pub fn with_toolchain(
        settings: Settings,
        toolchain: T,
        inspector: Arc<dyn LinkageInspector>,
        token: CancellationToken,
    ) -> Self {
        let config = Arc::new(settings.config().clone());
        Self {
            settings,
            config,
            toolchain: Arc::new(toolchain),
            inspector,
            token,
            check_tools: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every stage.
    ///
    /// Validation happens before the first write; any later failure aborts
    /// the run, leaving completed bundles for the next run to reuse.
    pub async fn run(&self) -> Result<RunReport> {
        let strategy = self.settings.install_strategy();
        if self.check_tools && strategy == InstallStrategy::Bundle {
            require_tools()?;
        }
        let (installations, warnings) =
            InstallationSet::validate(&self.settings, self.inspector.as_ref())?;
        check_output_directory(&self.settings)?;

        let mut report = RunReport {
            warnings,
            ..Default::default()
        };

        if self.settings.force() {
            clear_output_directory(&self.settings).await?;
        }
        fs::create_dir_all(&self.settings.content_root(), false).await?;

        let targets = match strategy {
            InstallStrategy::SymlinkInstall | InstallStrategy::CopyInstall => {
                self.install_raw(&installations, &mut report).await?;
                Vec::new()
            }
            InstallStrategy::Bundle => self.bundle_all(&installations, &mut report).await?,
        };
        self.check_cancelled()?;

        let primary = installations
            .primary()
            .ok_or_else(|| Error::Validation("no installation to take headers from".into()))?;
        report
            .written
            .extend(install_sources(&self.settings, primary).await?);

        let writer = PackageManifestWriter::new(&self.settings, installations.flags());
        report.written.push(writer.write_feature_header().await?);

        let feature_header = self.settings.feature_header_name();
        let generator = ModuleDescriptionGenerator::new(
            self.settings.package_name(),
            &feature_header,
            Exclusions::new(self.config.header_exclusions.iter().cloned()),
            installations.flags(),
        );
        let include = self.settings.include_directory();
        let description = generator.write(&include).await?;
        report.header_count = description.headers.len();
        report.warnings.extend(description.warnings);
        report
            .written
            .push(include.join(crate::bundler::headers::MODULE_MAP));

        report
            .written
            .push(writer.write_flags(strategy.is_raw()).await?);
        report.written.push(writer.write_manifest(&targets).await?);

        log::info!(
            "✓ Package {} written to {} ({} warning{})",
            self.settings.package_name(),
            self.settings.output_directory().display(),
            report.warnings.len(),
            if report.warnings.len() == 1 { "" } else { "s" }
        );
        Ok(report)
    }

    /// Places the single installation's `lib/` into the libraries area.
    async fn install_raw(
        &self,
        installations: &InstallationSet,
        report: &mut RunReport,
    ) -> Result<()> {
        let installation = installations
            .primary()
            .ok_or_else(|| Error::Validation("no installation to install".into()))?;
        let from = installation.lib_dir();
        let to = self.settings.libraries_directory();
        fs::remove_path(&to).await?;
        match self.settings.install_strategy() {
            InstallStrategy::SymlinkInstall => fs::symlink(&from, &to).await?,
            _ => fs::copy_dir(&from, &to).await?,
        }
        log::info!("✓ Installed {} into {}", from.display(), to.display());
        report.written.push(to);
        Ok(())
    }

    /// Resolves, bundles, merges and places every library.
    async fn bundle_all(
        &self,
        installations: &InstallationSet,
        report: &mut RunReport,
    ) -> Result<Vec<BinaryTarget>> {
        let work = self.resolve(installations, report).await?;
        self.check_cancelled()?;

        let mut bundles = self.bundle(work).await?;
        bundles.sort_by(|a, b| {
            (&a.name, a.target.slice_identifier()).cmp(&(&b.name, b.target.slice_identifier()))
        });
        log::info!(
            "✓ {} bundles ready ({} created)",
            bundles.len(),
            bundles.iter().filter(|b| b.created).count()
        );
        self.check_cancelled()?;

        let families: BTreeSet<PlatformFamily> = installations
            .targets()
            .iter()
            .map(|t| t.platform().family())
            .collect();
        let mut units = self.merge(&bundles, families).await?;
        units.sort_by(|a, b| a.name.cmp(&b.name));
        for unit in &units {
            report.warnings.extend(unit.warnings.iter().cloned());
        }
        self.check_cancelled()?;

        let targets = match self.settings.remote() {
            Some(remote) => {
                let publisher = ArtifactPublisher::new(remote.clone());
                let artifacts = self.publish(&publisher, &units).await?;
                report.written.push(publisher.write_manifest(&artifacts).await?);
                let targets = units
                    .iter()
                    .zip(&artifacts)
                    .map(|(unit, artifact)| BinaryTarget {
                        name: unit.name.clone(),
                        predicate: unit.predicate.clone(),
                        location: TargetLocation::Remote {
                            url: artifact.url.clone(),
                            checksum: artifact.checksum.clone(),
                        },
                    })
                    .collect();
                report.artifacts = artifacts;
                targets
            }
            None => self.copy_units(&units, report).await?,
        };

        report.bundles = bundles;
        report.units = units;
        Ok(targets)
    }

    /// Dependency closures, one blocking task per installation.
    async fn resolve(
        &self,
        installations: &InstallationSet,
        report: &mut RunReport,
    ) -> Result<Vec<(Arc<Installation>, PathBuf)>> {
        let mut set = JoinSet::new();
        for installation in installations.installations() {
            let installation = Arc::new(installation.clone());
            let inspector = Arc::clone(&self.inspector);
            let config = Arc::clone(&self.config);
            set.spawn_blocking(move || {
                let resolution = DependencyResolver::new(
                    inspector.as_ref(),
                    &config.ancillary_artifacts,
                    config.non_relocatable,
                )
                .resolve(&installation)?;
                Ok::<_, Error>((installation, resolution))
            });
        }

        let mut resolved = join_all(set).await?;
        resolved.sort_by_key(|(installation, _)| installation.index());

        let mut work = Vec::new();
        for (installation, resolution) in resolved {
            log::info!(
                "✓ Resolved {} artifacts for {}",
                resolution.artifacts.len(),
                installation.target()
            );
            report.warnings.extend(resolution.warnings);

            // Two files normalizing to one name would race for the same bundle.
            let mut names: BTreeMap<String, PathBuf> = BTreeMap::new();
            for artifact in resolution.artifacts {
                let file_name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = crate::bundler::naming::bundle_name(&file_name);
                if let Some(previous) = names.get(&name) {
                    log::warn!(
                        "Skipping {}: bundle name {name} already taken by {}",
                        artifact.display(),
                        previous.display()
                    );
                    continue;
                }
                names.insert(name, artifact.clone());
                work.push((Arc::clone(&installation), artifact));
            }
        }
        Ok(work)
    }

    /// One task per artifact across all installations, at most `jobs` at once.
    async fn bundle(&self, work: Vec<(Arc<Installation>, PathBuf)>) -> Result<Vec<Bundle>> {
        let bundler = LibraryBundler::new(
            Arc::clone(&self.toolchain),
            Arc::clone(&self.inspector),
            Arc::clone(&self.config),
        );
        let permits = Arc::new(Semaphore::new(self.settings.jobs()));
        log::info!(
            "Bundling {} artifacts with {} parallel job(s)",
            work.len(),
            self.settings.jobs()
        );

        let mut set = JoinSet::new();
        for (installation, artifact) in work {
            let bundler = bundler.clone();
            let permits = Arc::clone(&permits);
            let token = self.token.clone();
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::GenericError(format!("bundling pool closed: {e}")))?;
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                bundler.bundle(&installation, &artifact).await
            });
        }
        join_all(set).await
    }

    /// One task per logical name; runs only after all bundling joined.
    async fn merge(
        &self,
        bundles: &[Bundle],
        families: BTreeSet<PlatformFamily>,
    ) -> Result<Vec<MergedUnit>> {
        let mut by_name: BTreeMap<String, Vec<Bundle>> = BTreeMap::new();
        for bundle in bundles {
            by_name
                .entry(bundle.name.clone())
                .or_default()
                .push(bundle.clone());
        }

        let merger = PlatformMerger::new(
            self.settings.scratch_directory().join("xcframeworks"),
            families,
        );
        let permits = Arc::new(Semaphore::new(self.settings.jobs()));
        let mut set = JoinSet::new();
        for (name, group) in by_name {
            let merger = merger.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::GenericError(format!("merge pool closed: {e}")))?;
                merger.merge(&name, group).await
            });
        }
        join_all(set).await
    }

    /// Archives every unit; the result follows the order of `units`.
    async fn publish(
        &self,
        publisher: &ArtifactPublisher,
        units: &[MergedUnit],
    ) -> Result<Vec<ChecksummedArtifact>> {
        let permits = Arc::new(Semaphore::new(self.settings.jobs()));
        let mut set = JoinSet::new();
        for (position, unit) in units.iter().cloned().enumerate() {
            let publisher = publisher.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::GenericError(format!("publish pool closed: {e}")))?;
                Ok::<_, Error>((position, publisher.publish(&unit).await?))
            });
        }
        let mut published = join_all(set).await?;
        published.sort_by_key(|(position, _)| *position);
        Ok(published.into_iter().map(|(_, artifact)| artifact).collect())
    }

    /// Copies the merged units into the package's libraries area.
    async fn copy_units(
        &self,
        units: &[MergedUnit],
        report: &mut RunReport,
    ) -> Result<Vec<BinaryTarget>> {
        let libraries = self.settings.libraries_directory();
        fs::create_dir_all(&libraries, true).await?;

        let mut targets = Vec::with_capacity(units.len());
        for unit in units {
            let directory = MergedUnit::directory_name(&unit.name);
            let destination = libraries.join(&directory);
            fs::copy_dir(&unit.path, &destination).await?;
            report.written.push(destination);
            targets.push(BinaryTarget {
                name: unit.name.clone(),
                predicate: unit.predicate.clone(),
                location: TargetLocation::Local {
                    path: format!("Libraries/{directory}"),
                },
            });
        }
        log::info!("✓ Copied {} xcframeworks into {}", units.len(), libraries.display());
        Ok(targets)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Joins every task; the first failure aborts the rest.
async fn join_all<R: Send + 'static>(mut set: JoinSet<Result<R>>) -> Result<Vec<R>> {
    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(error)) => {
                set.abort_all();
                return Err(error);
            }
            Err(error) => {
                set.abort_all();
                return Err(Error::GenericError(format!("task failed: {error}")));
            }
        }
    }
    Ok(results)
}
