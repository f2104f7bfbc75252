//! Canonical order of OpenUSD sub-libraries.
//!
//! Headers are declared library by library in dependency order so that a
//! header never appears before the headers it includes from lower layers.

/// Libraries in declaration order: base, core object model, domain schemas,
/// imaging, then the scene-delegate layer. Plugin libraries follow their
/// layer.
pub const LIBRARY_ORDER: &[&str] = &[
    // base
    "arch",
    "tf",
    "gf",
    "js",
    "trace",
    "work",
    "plug",
    "vt",
    "ts",
    // core object model
    "ar",
    "kind",
    "sdf",
    "ndr",
    "sdr",
    "pcp",
    "usd",
    // domain schemas and utilities
    "usdGeom",
    "usdVol",
    "usdMedia",
    "usdShade",
    "usdLux",
    "usdProc",
    "usdRender",
    "usdHydra",
    "usdRi",
    "usdSemantics",
    "usdSkel",
    "usdUI",
    "usdUtils",
    "usdPhysics",
    "usdMtlx",
    "usdAbc",
    "usdDraco",
    // imaging
    "garch",
    "hf",
    "hio",
    "cameraUtil",
    "pxOsd",
    "geomUtil",
    "glf",
    "hgi",
    "hgiGL",
    "hgiMetal",
    "hgiVulkan",
    "hgiInterop",
    "hd",
    "hdar",
    "hdGp",
    "hdsi",
    "hdMtlx",
    "hdSt",
    "hdx",
    "hdStorm",
    "hdEmbree",
    "hioAvif",
    "hioOpenVDB",
    "hioOiio",
    // scene delegates and applications
    "usdImaging",
    "usdImagingGL",
    "usdProcImaging",
    "usdRiPxrImaging",
    "usdSkelImaging",
    "usdVolImaging",
    "usdAppUtils",
];

/// Sort bucket of a header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LibraryRank {
    /// Hard-coded headers declared before everything else.
    Pinned(usize),
    /// Index into [`LIBRARY_ORDER`].
    Known(usize),
    /// Library missing from [`LIBRARY_ORDER`]; sorted last.
    Unknown,
}

/// Owning library of an include-root-relative header path.
///
/// `pxr/<layer>/<library>/...` and `pxr/<layer>/plugin/<library>/...` map to
/// `<library>`.
pub fn library_of(header: &str) -> Option<&str> {
    let mut parts = header.split('/');
    if parts.next()? != "pxr" {
        return None;
    }
    let _layer = parts.next()?;
    let library = parts.next()?;
    if library == "plugin" {
        let plugin = parts.next()?;
        // Must still be a directory.
        parts.next()?;
        return Some(plugin);
    }
    // The header itself must not be the third component.
    parts.next()?;
    Some(library)
}

/// Rank of a header among `pinned` headers and the canonical library order.
pub fn rank(header: &str, pinned: &[&str]) -> LibraryRank {
    if let Some(position) = pinned.iter().position(|p| *p == header) {
        return LibraryRank::Pinned(position);
    }
    library_of(header)
        .and_then(|library| LIBRARY_ORDER.iter().position(|l| *l == library))
        .map_or(LibraryRank::Unknown, LibraryRank::Known)
}
