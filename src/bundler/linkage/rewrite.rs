//! Translation of `@rpath` and `@loader_path` library references into
//! framework references.

use super::{LinkageRecord, Reference};
use crate::bundler::{framework::FrameworkLayout, naming, settings::Platform};

/// Install-name changes for one framework binary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewritePlan {
    /// New `LC_ID_DYLIB` value.
    pub install_id: String,
    /// `(old, new)` pairs for every rewritten dependency.
    pub changes: Vec<(String, String)>,
}

impl RewritePlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// `@rpath` install name of a framework's binary on `platform`.
///
/// Consumers embed every framework side by side, so one run-time search
/// path entry pointing at the frameworks directory resolves all of them.
pub fn framework_install_name(bundle_name: &str, platform: Platform) -> String {
    let binary = FrameworkLayout::binary_relative_path(bundle_name, platform);
    format!(
        "@rpath/{}.framework/{}",
        bundle_name,
        binary.to_string_lossy()
    )
}

/// Computes the install-name changes for a library wrapped as `bundle_name`.
///
/// `@rpath` and `@loader_path` references are translated, since the resolver
/// ships both kinds of target as sibling frameworks. System, absolute and
/// `@executable_path` references are left untouched.
pub fn plan_rewrite(record: &LinkageRecord, bundle_name: &str, platform: Platform) -> RewritePlan {
    let install_id = framework_install_name(bundle_name, platform);

    let mut changes = Vec::new();
    for dependency in &record.dependencies {
        if !matches!(
            dependency.reference,
            Reference::Rpath(_) | Reference::LoaderPath(_)
        ) {
            continue;
        }
        let new = if record.is_self_reference(&dependency.raw) {
            install_id.clone()
        } else {
            match dependency.reference.file_name() {
                Some(file_name) => {
                    framework_install_name(&naming::bundle_name(file_name), platform)
                }
                None => continue,
            }
        };
        if new != dependency.raw && !changes.iter().any(|(old, _)| *old == dependency.raw) {
            changes.push((dependency.raw.clone(), new));
        }
    }

    RewritePlan {
        install_id,
        changes,
    }
}
