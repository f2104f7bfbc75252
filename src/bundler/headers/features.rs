//! Per-feature marker modules.
//!
//! Each optional build feature gets an empty module `<Package>_<Feature>`.
//! Disabled features have their stanza commented out, so consumers can test
//! availability at compile time with `__has_include`/`@import` checks.

use crate::bundler::{installation::FeatureFlags, settings::PlatformFamily};

/// An optional build feature.
#[derive(Clone, Copy, Debug)]
pub struct OptionalFeature {
    /// Module name suffix.
    pub module: &'static str,
    /// Feature flag that enables it.
    pub flag: &'static str,
    /// Families on which the feature never exists.
    pub unavailable_on: &'static [PlatformFamily],
}

const DESKTOP_ONLY: &[PlatformFamily] = &[PlatformFamily::Ios, PlatformFamily::VisionOs];

pub const OPTIONAL_FEATURES: &[OptionalFeature] = &[
    OptionalFeature {
        module: "Python",
        flag: "PXR_ENABLE_PYTHON_SUPPORT",
        unavailable_on: DESKTOP_ONLY,
    },
    OptionalFeature {
        module: "Imaging",
        flag: "PXR_BUILD_IMAGING",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "UsdImaging",
        flag: "PXR_BUILD_USD_IMAGING",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "MaterialX",
        flag: "PXR_ENABLE_MATERIALX_SUPPORT",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "OpenVDB",
        flag: "PXR_ENABLE_OPENVDB_SUPPORT",
        unavailable_on: DESKTOP_ONLY,
    },
    OptionalFeature {
        module: "Ptex",
        flag: "PXR_ENABLE_PTEX_SUPPORT",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "GL",
        flag: "PXR_ENABLE_GL_SUPPORT",
        unavailable_on: DESKTOP_ONLY,
    },
    OptionalFeature {
        module: "Vulkan",
        flag: "PXR_ENABLE_VULKAN_SUPPORT",
        unavailable_on: DESKTOP_ONLY,
    },
    OptionalFeature {
        module: "Alembic",
        flag: "PXR_BUILD_ALEMBIC_PLUGIN",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "Draco",
        flag: "PXR_BUILD_DRACO_PLUGIN",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "Embree",
        flag: "PXR_BUILD_EMBREE_PLUGIN",
        unavailable_on: DESKTOP_ONLY,
    },
    OptionalFeature {
        module: "OpenImageIO",
        flag: "PXR_BUILD_OPENIMAGEIO_PLUGIN",
        unavailable_on: &[],
    },
    OptionalFeature {
        module: "OpenColorIO",
        flag: "PXR_BUILD_OPENCOLORIO_PLUGIN",
        unavailable_on: &[],
    },
];

/// Renders the marker modules for `package`.
pub fn render_stanzas(package: &str, flags: &FeatureFlags) -> String {
    let mut out = String::new();
    for feature in OPTIONAL_FEATURES {
        let enabled = flags.is_enabled(feature.flag);
        let prefix = if enabled { "" } else { "// " };

        out.push('\n');
        out.push_str(&format!("{prefix}module {package}_{} {{\n", feature.module));
        if !feature.unavailable_on.is_empty() {
            let requires: Vec<String> = feature
                .unavailable_on
                .iter()
                .map(|f| format!("!{}", f.module_feature()))
                .collect();
            out.push_str(&format!("{prefix}    requires {}\n", requires.join(", ")));
        }
        out.push_str(&format!("{prefix}}}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_features_are_live_modules() {
        let mut flags = FeatureFlags::default();
        flags.insert("PXR_ENABLE_PYTHON_SUPPORT", "ON");
        flags.insert("PXR_BUILD_IMAGING", "OFF");

        let text = render_stanzas("OpenUSD", &flags);
        assert!(text.contains("\nmodule OpenUSD_Python {\n    requires !ios, !xros\n}\n"));
        assert!(text.contains("\n// module OpenUSD_Imaging {\n// }\n"));
        // Unset flags count as disabled.
        assert!(text.contains("// module OpenUSD_Draco {"));
    }
}
