//! Load-time linkage records for shared libraries.
//!
//! Binary introspection is behind the [`LinkageInspector`] trait so the
//! resolver and the rewrite rules work on typed records rather than on the
//! output format of any particular tool. [`MachOInspector`] reads the
//! records straight from Mach-O load commands.

mod macho;
mod rewrite;

pub use macho::MachOInspector;
pub use rewrite::{RewritePlan, framework_install_name, plan_rewrite};

use crate::bundler::{Result, settings::PlatformTarget};
use std::path::{Path, PathBuf};

/// Run-time search path token.
pub const RPATH_TOKEN: &str = "@rpath/";

/// Locations whose libraries are provided by the operating system.
pub const SYSTEM_LOCATIONS: &[&str] = &["/usr/lib/", "/System/Library/", "/System/iOSSupport/"];

/// How a load command names the library it loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// `@rpath/<relative>`
    Rpath(String),
    /// `@loader_path/<relative>`
    LoaderPath(String),
    /// `@executable_path/<relative>`
    ExecutablePath(String),
    /// An absolute path inside an operating-system location.
    System(PathBuf),
    /// Any other absolute or relative path.
    Path(PathBuf),
}

impl Reference {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix(RPATH_TOKEN) {
            Reference::Rpath(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("@loader_path/") {
            Reference::LoaderPath(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("@executable_path/") {
            Reference::ExecutablePath(rest.to_string())
        } else if SYSTEM_LOCATIONS.iter().any(|loc| raw.starts_with(loc)) {
            Reference::System(PathBuf::from(raw))
        } else {
            Reference::Path(PathBuf::from(raw))
        }
    }

    /// File name of the referenced library.
    pub fn file_name(&self) -> Option<&str> {
        let raw = match self {
            Reference::Rpath(rest) | Reference::LoaderPath(rest) | Reference::ExecutablePath(rest) => {
                rest.as_str()
            }
            Reference::System(path) | Reference::Path(path) => path.to_str()?,
        };
        raw.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

/// One `LC_LOAD_DYLIB`-family command: the raw string plus its parsed form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadCommand {
    pub raw: String,
    pub reference: Reference,
}

impl LoadCommand {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let reference = Reference::parse(&raw);
        Self { raw, reference }
    }
}

/// Linkage information of one binary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkageRecord {
    /// Declared identity (`LC_ID_DYLIB`), absent for executables and bundles.
    pub install_id: Option<String>,
    /// Libraries loaded at run time.
    pub dependencies: Vec<LoadCommand>,
    /// `LC_RPATH` entries.
    pub rpaths: Vec<String>,
    /// Platform and architectures the binary was built for.
    pub target: Option<PlatformTarget>,
}

impl LinkageRecord {
    /// Whether `raw` is this binary's own declared identity.
    pub fn is_self_reference(&self, raw: &str) -> bool {
        self.install_id.as_deref() == Some(raw)
    }
}

/// Reads linkage records from binaries.
pub trait LinkageInspector: Send + Sync {
    fn inspect(&self, binary: &Path) -> Result<LinkageRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_kinds() {
        assert_eq!(
            Reference::parse("@rpath/libusd_tf.dylib"),
            Reference::Rpath("libusd_tf.dylib".into())
        );
        assert_eq!(
            Reference::parse("/usr/lib/libc++.1.dylib"),
            Reference::System(PathBuf::from("/usr/lib/libc++.1.dylib"))
        );
        assert_eq!(
            Reference::parse("/opt/homebrew/lib/libpng.dylib"),
            Reference::Path(PathBuf::from("/opt/homebrew/lib/libpng.dylib"))
        );
        assert!(matches!(
            Reference::parse("@loader_path/../lib/libtbb.dylib"),
            Reference::LoaderPath(_)
        ));
    }

    #[test]
    fn file_name_of_reference() {
        assert_eq!(
            Reference::parse("@rpath/libusd_tf.dylib").file_name(),
            Some("libusd_tf.dylib")
        );
        assert_eq!(
            Reference::parse("/System/Library/Frameworks/Metal.framework/Metal").file_name(),
            Some("Metal")
        );
    }
}
