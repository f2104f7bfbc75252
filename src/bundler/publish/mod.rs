//! Remote artifact publishing.
//!
//! Each merged unit is zipped into the remote directory, checksummed, and
//! listed in `artifacts.json` so the archives can be uploaded and referenced
//! by URL and checksum.

mod archive;
mod checksum;

pub use archive::archive_directory;
pub use checksum::calculate_sha256;

use crate::bundler::{
    error::Result,
    settings::RemoteArtifacts,
    utils::fs,
    xcframework::MergedUnit,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the remote artifact manifest.
pub const ARTIFACTS_MANIFEST: &str = "artifacts.json";

/// An archived unit with its content hash and download URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksummedArtifact {
    pub name: String,
    pub file: String,
    pub url: String,
    pub checksum: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactsManifest {
    artifacts: Vec<ChecksummedArtifact>,
}

#[derive(Clone, Debug)]
pub struct ArtifactPublisher {
    remote: RemoteArtifacts,
}

impl ArtifactPublisher {
    pub fn new(remote: RemoteArtifacts) -> Self {
        Self { remote }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.remote.directory.join(ARTIFACTS_MANIFEST)
    }

    /// Archives and checksums one unit.
    pub async fn publish(&self, unit: &MergedUnit) -> Result<ChecksummedArtifact> {
        let file = format!("{}.zip", MergedUnit::directory_name(&unit.name));
        let archive = self.remote.directory.join(&file);
        fs::remove_path(&archive).await?;
        archive_directory(&unit.path, &archive).await?;

        let checksum = calculate_sha256(&archive).await?;
        log::info!("✓ Published {file} ({checksum})");
        Ok(ChecksummedArtifact {
            name: unit.name.clone(),
            url: self.remote.url_for(&file),
            file,
            checksum,
        })
    }

    /// Writes `artifacts.json`, sorted by name.
    pub async fn write_manifest(&self, artifacts: &[ChecksummedArtifact]) -> Result<PathBuf> {
        let mut artifacts = artifacts.to_vec();
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        let manifest = ArtifactsManifest { artifacts };

        let path = self.manifest_path();
        let mut text = serde_json::to_string_pretty(&manifest)?;
        text.push('\n');
        fs::write_file(&path, text).await?;
        log::info!(
            "✓ Wrote {} ({} artifacts)",
            path.display(),
            manifest.artifacts.len()
        );
        Ok(path)
    }
}
