//! Bundle name normalization.
//!
//! Maps raw shared library file names onto framework names:
//!
//! | Input | Bundle name |
//! |---|---|
//! | `libusd_sdf.dylib` | `Usd_Sdf` |
//! | `libtbb.12.dylib` | `TBB` |
//! | `libfoo.3.6.0.dylib` | `Foo` |
//! | `libosdCPU.3.6.0.dylib` | `OsdCPU` |
//! | `libIex-3_1.30.13.1.dylib` | `Iex` |
//!
//! Normalization is total and idempotent: feeding a bundle name back in
//! yields the same bundle name.

use regex::Regex;
use std::sync::LazyLock;

/// File extensions stripped before any other rule applies.
const EXTENSIONS: &[&str] = &[".dylib", ".so", ".framework", ".bundle", ".a"];

/// Exact renames applied after prefix and version stripping.
const SPECIAL_NAMES: &[(&str, &str)] = &[
    ("tbb", "TBB"),
    ("tbbmalloc", "TBBMalloc"),
    ("tbbmalloc_proxy", "TBBMalloc_Proxy"),
    ("tbbbind", "TBBBind"),
    ("boost_python", "Boost_Python"),
];

/// Legacy subdivision-surface libraries carry a lower-case one-letter
/// prefix that becomes upper-case.
const PREFIX_REMAPS: &[(&str, &str)] = &[("osd", "O")];

/// `.3.6.0` style symlink version suffix.
static DOTTED_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.\d+)+$").expect("static regex"));

/// `-3_1.30.13.1` style version suffix used by OpenEXR/Imath.
static UNDERSCORE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+_\d+(\.\d+)*$").expect("static regex"));

/// Normalizes a raw library file name (or path component) into a bundle name.
pub fn bundle_name(raw: &str) -> String {
    let mut name = raw.to_string();

    for ext in EXTENSIONS {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped.to_string();
            break;
        }
    }

    name = UNDERSCORE_VERSION.replace(&name, "").into_owned();
    name = DOTTED_VERSION.replace(&name, "").into_owned();

    if let Some(stripped) = name.strip_prefix("lib") {
        if !stripped.is_empty() {
            name = stripped.to_string();
        }
    }

    if let Some((_, special)) = SPECIAL_NAMES.iter().find(|(raw, _)| *raw == name) {
        return special.to_string();
    }

    for (prefix, replacement) in PREFIX_REMAPS {
        if let Some(rest) = name.strip_prefix(prefix) {
            return format!("{replacement}{}{rest}", &prefix[1..]);
        }
    }

    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty()) {
        return format!("{}_{}", capitalize(parts[0]), capitalize(parts[1]));
    }

    capitalize(&name)
}

/// Reverse-DNS bundle identifier for a bundle name.
///
/// Bundle identifiers only allow alphanumerics, `-` and `.`.
pub fn bundle_identifier(prefix: &str, bundle_name: &str) -> String {
    let suffix: String = bundle_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}.{}", prefix.trim_end_matches('.'), suffix)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
