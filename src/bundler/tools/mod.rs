//! External binary tools.
//!
//! Linkage rewriting and code signing are the only operations that need
//! Apple's command line tools. They sit behind [`Toolchain`] so the pipeline
//! can run against a recording fake on any host.

mod process;

pub use process::ProcessRegistry;

use crate::bundler::{error::Result, linkage::RewritePlan};
use std::{future::Future, path::Path};

/// Tool used to rewrite install names.
pub const INSTALL_NAME_TOOL: &str = "install_name_tool";

/// Tool used to re-sign bundles.
pub const CODESIGN: &str = "codesign";

/// Binary rewrite and signing operations.
pub trait Toolchain: Send + Sync + 'static {
    /// Sets the binary's identity and rewrites its dependency references.
    fn rewrite_linkage(
        &self,
        binary: &Path,
        plan: &RewritePlan,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Re-signs `bundle` so its code identity matches `identifier`.
    fn sign(
        &self,
        bundle: &Path,
        identity: &str,
        identifier: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// `install_name_tool` and `codesign` spawned through a [`ProcessRegistry`].
#[derive(Clone, Debug)]
pub struct SystemToolchain {
    registry: ProcessRegistry,
}

impl SystemToolchain {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }
}

impl Toolchain for SystemToolchain {
    async fn rewrite_linkage(&self, binary: &Path, plan: &RewritePlan) -> Result<()> {
        let mut args: Vec<String> = vec!["-id".into(), plan.install_id.clone()];
        for (old, new) in &plan.changes {
            args.push("-change".into());
            args.push(old.clone());
            args.push(new.clone());
        }
        args.push(binary.to_string_lossy().into_owned());

        self.registry.run(INSTALL_NAME_TOOL, &args).await?;
        log::debug!(
            "Rewrote {} reference(s) in {}",
            plan.changes.len(),
            binary.display()
        );
        Ok(())
    }

    async fn sign(&self, bundle: &Path, identity: &str, identifier: &str) -> Result<()> {
        let bundle_arg = bundle.to_string_lossy();
        self.registry
            .run(
                CODESIGN,
                [
                    "--force",
                    "--sign",
                    identity,
                    "--identifier",
                    identifier,
                    bundle_arg.as_ref(),
                ],
            )
            .await?;
        log::debug!("Signed {} as {identifier}", bundle.display());
        Ok(())
    }
}
