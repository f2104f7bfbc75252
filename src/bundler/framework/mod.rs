//! Wraps individual shared libraries into relocatable `.framework` bundles.
//!
//! A bundle is assembled in a `.partial` staging directory and moved into
//! place once complete, so an existing destination always holds a finished
//! bundle. Re-running against it performs no writes.

mod info_plist;
mod layout;
pub mod plug_info;
mod resources;

pub use info_plist::FrameworkInfo;
pub use layout::FrameworkLayout;
pub use resources::{
    MATERIALS_DIR, install_companion_resources, install_materials_libraries,
    install_plugin_descriptors, normalize_resource_dirs,
};

use crate::bundler::{
    error::{Context, ErrorExt, Result},
    installation::Installation,
    linkage::{LinkageInspector, plan_rewrite},
    naming,
    settings::{PackageConfig, PlatformTarget},
    tools::Toolchain,
    utils::fs,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// A framework produced for one artifact of one installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub target: PlatformTarget,
    /// The `<name>.framework` directory.
    pub path: PathBuf,
    /// Index of the owning installation.
    pub installation: usize,
    /// False when an earlier run had already produced the bundle.
    pub created: bool,
}

/// Builds framework bundles. Cheap to clone into concurrent tasks.
pub struct LibraryBundler<T> {
    toolchain: Arc<T>,
    inspector: Arc<dyn LinkageInspector>,
    config: Arc<PackageConfig>,
    signing_identity: String,
}

impl<T> Clone for LibraryBundler<T> {
    fn clone(&self) -> Self {
        Self {
            toolchain: Arc::clone(&self.toolchain),
            inspector: Arc::clone(&self.inspector),
            config: Arc::clone(&self.config),
            signing_identity: self.signing_identity.clone(),
        }
    }
}

impl<T: Toolchain> LibraryBundler<T> {
    pub fn new(
        toolchain: Arc<T>,
        inspector: Arc<dyn LinkageInspector>,
        config: Arc<PackageConfig>,
    ) -> Self {
        let signing_identity = config.resolved_signing_identity();
        Self {
            toolchain,
            inspector,
            config,
            signing_identity,
        }
    }

    /// Directory receiving an installation's frameworks.
    pub fn frameworks_dir(installation: &Installation) -> PathBuf {
        installation.scratch().join("frameworks")
    }

    /// Wraps `artifact` into `<scratch>/frameworks/<Name>.framework`.
    pub async fn bundle(&self, installation: &Installation, artifact: &Path) -> Result<Bundle> {
        let file_name = artifact
            .file_name()
            .with_context(|| format!("artifact {} has no file name", artifact.display()))?
            .to_string_lossy()
            .into_owned();
        let name = naming::bundle_name(&file_name);
        let target = installation.target().clone();
        let platform = target.platform();

        let parent = Self::frameworks_dir(installation);
        let destination = parent.join(FrameworkLayout::directory_name(&name));
        let mut bundle = Bundle {
            name: name.clone(),
            target,
            path: destination.clone(),
            installation: installation.index(),
            created: false,
        };

        if fs::path_exists(&destination).await {
            log::debug!("{} already bundled, skipping", destination.display());
            return Ok(bundle);
        }

        let layout = FrameworkLayout::new(&parent.join(".partial"), &name, platform);
        let staging = layout.root().to_path_buf();
        fs::remove_path(&staging).await?;
        layout.create().await?;

        fs::copy_file(artifact, &layout.binary_path()).await?;

        // Artifacts are symlink-resolved, so match on the normalized name to
        // catch versioned files such as libusd_plug.0.dylib.
        if name == naming::bundle_name(&self.config.plug_library) {
            let count = install_plugin_descriptors(installation, &layout).await?;
            log::debug!("Installed {count} plugin descriptor(s) into {name}");
        }
        if name == naming::bundle_name(&self.config.materials_library) {
            install_materials_libraries(installation, &self.config.materials_search_dir, &layout)
                .await?;
        }
        install_companion_resources(artifact, &layout).await?;

        let identifier = naming::bundle_identifier(&self.config.identifier_prefix, &name);
        FrameworkInfo::new(
            &name,
            &identifier,
            platform,
            &self.config.short_version,
            &self.config.bundle_version,
        )
        .write(&layout.info_plist_path())
        .await?;

        let record = self.inspector.inspect(artifact)?;
        let plan = plan_rewrite(&record, &name, platform);
        self.toolchain
            .rewrite_linkage(&layout.binary_path(), &plan)
            .await?;
        self.toolchain
            .sign(layout.root(), &self.signing_identity, &identifier)
            .await?;

        tokio::fs::rename(&staging, &destination)
            .await
            .fs_context("failed to move bundle into place", &destination)?;

        log::info!("✓ Bundled {} ({})", name, bundle.target.slice_identifier());
        bundle.created = true;
        Ok(bundle)
    }
}
