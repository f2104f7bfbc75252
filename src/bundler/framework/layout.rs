//! On-disk layout of a `.framework` bundle.
//!
//! macOS and Mac Catalyst use versioned bundles:
//!
//! ```text
//! Name.framework/
//!   Name -> Versions/Current/Name
//!   Resources -> Versions/Current/Resources
//!   Versions/
//!     Current -> A
//!     A/
//!       Name
//!       Resources/Info.plist
//! ```
//!
//! Every other platform uses shallow bundles with the binary and `Info.plist`
//! at the top level and resources in `BundleResources/`.

use crate::bundler::{error::Result, settings::Platform, utils::fs};
use std::path::{Path, PathBuf};

const VERSION: &str = "A";

#[derive(Clone, Debug)]
pub struct FrameworkLayout {
    root: PathBuf,
    name: String,
    platform: Platform,
}

impl FrameworkLayout {
    /// Layout of `<parent>/<name>.framework`.
    pub fn new(parent: &Path, name: &str, platform: Platform) -> Self {
        Self {
            root: parent.join(Self::directory_name(name)),
            name: name.to_string(),
            platform,
        }
    }

    pub fn directory_name(name: &str) -> String {
        format!("{name}.framework")
    }

    /// Binary location relative to the framework root.
    pub fn binary_relative_path(name: &str, platform: Platform) -> PathBuf {
        if platform.uses_versioned_bundles() {
            Path::new("Versions").join(VERSION).join(name)
        } else {
            PathBuf::from(name)
        }
    }

    /// Real (non-symlink) resource directory relative to the framework root.
    pub fn resources_relative_path(platform: Platform) -> PathBuf {
        if platform.uses_versioned_bundles() {
            Path::new("Versions")
                .join(VERSION)
                .join(platform.resources_dir())
        } else {
            PathBuf::from(platform.resources_dir())
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root
            .join(Self::binary_relative_path(&self.name, self.platform))
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join(Self::resources_relative_path(self.platform))
    }

    /// Resource directory as seen from the directory containing all
    /// frameworks, e.g. `Usd_Plug.framework/Versions/A/Resources`.
    pub fn sibling_resources_path(&self) -> PathBuf {
        PathBuf::from(Self::directory_name(&self.name))
            .join(Self::resources_relative_path(self.platform))
    }

    pub fn info_plist_path(&self) -> PathBuf {
        if self.platform.uses_versioned_bundles() {
            self.resources_dir().join("Info.plist")
        } else {
            self.root.join("Info.plist")
        }
    }

    /// Creates the directory skeleton and, for versioned bundles, the
    /// `Current` and top-level symlinks.
    pub async fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.resources_dir(), false).await?;

        if self.platform.uses_versioned_bundles() {
            let resources = self.platform.resources_dir();
            fs::symlink(Path::new(VERSION), &self.root.join("Versions").join("Current")).await?;
            fs::symlink(
                &Path::new("Versions").join("Current").join(&self.name),
                &self.root.join(&self.name),
            )
            .await?;
            fs::symlink(
                &Path::new("Versions").join("Current").join(resources),
                &self.root.join(resources),
            )
            .await?;
        }
        Ok(())
    }
}
