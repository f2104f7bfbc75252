//! Headers kept out of the module description.

/// Built-in exclusion prefixes, relative to the include root.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    // vendored third-party internals
    "pxr/base/js/rapidjson/",
    "pxr/base/pegtl/",
    "pxr/base/tf/pxrCLI11/",
    "pxr/base/tf/pxrDoubleConversion/",
    "pxr/base/tf/pxrLZ4/",
    "pxr/base/tf/pxrTslRobinMap/",
    // must only be included from a single translation unit
    "pxr/base/tf/instantiateSingleton.h",
    "pxr/base/tf/instantiateStacked.h",
    "pxr/base/tf/instantiateType.h",
    "pxr/base/tf/pySafePython.h",
    "pxr/base/tf/pyModule.h",
    "pxr/base/arch/pragmas.h",
    // optional validation framework
    "pxr/usdValidation/",
    "pxr/usd/usdUtils/validatorTokens.h",
    // X11 and Win32 headers defining Bool, None, Status and friends
    "pxr/imaging/garch/glPlatformContextGLX.h",
    "pxr/imaging/garch/glPlatformContextWindows.h",
    "pxr/imaging/garch/glPlatformDebugWindowGLX.h",
    "pxr/imaging/garch/glPlatformDebugWindowWindows.h",
    "pxr/imaging/glf/glRawContext.h",
    // installed under a path that differs from their own #include lines
    "pxr/imaging/hio/OpenEXR/",
    "pxr/imaging/plugin/hioAvif/aom/",
];

/// Header file extensions considered for the module.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh"];

/// Prefix-based exclusion rules.
#[derive(Clone, Debug)]
pub struct Exclusions {
    prefixes: Vec<String>,
}

impl Default for Exclusions {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl Exclusions {
    /// Built-in rules plus `extra` prefixes.
    pub fn new(extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut prefixes: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
        prefixes.extend(extra.into_iter().map(Into::into));
        prefixes.sort();
        prefixes.dedup();
        Self { prefixes }
    }

    pub fn is_excluded(&self, header: &str) -> bool {
        self.prefixes.iter().any(|p| header.starts_with(p.as_str()))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Whether `path` has a header extension.
pub fn is_header(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| HEADER_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_by_prefix() {
        let exclusions = Exclusions::new(["pxr/imaging/hgiVulkan/"]);
        assert!(exclusions.is_excluded("pxr/base/js/rapidjson/document.h"));
        assert!(exclusions.is_excluded("pxr/usdValidation/usdValidation/validator.h"));
        assert!(exclusions.is_excluded("pxr/imaging/hgiVulkan/device.h"));
        assert!(!exclusions.is_excluded("pxr/base/js/json.h"));
    }

    #[test]
    fn header_extensions() {
        assert!(is_header("pxr/base/tf/token.h"));
        assert!(is_header("pxr/base/tf/pxrTslRobinMap/robin_map.hpp"));
        assert!(!is_header("pxr/usd/usd/generatedSchema.usda"));
        assert!(!is_header("pxr/base/gf/vec.template.h.j2"));
    }
}
