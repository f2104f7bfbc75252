//! C preprocessor mirror of the merged feature flags.

use crate::bundler::installation::{FeatureFlags, coerce_bool};
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("static regex"));

/// Renders `<Package>FeatureFlags.h`.
///
/// Booleans become `1`/`0`, integers are kept, anything else is emitted as
/// a string literal.
pub fn render_feature_header(package: &str, flags: &FeatureFlags) -> String {
    let guard = format!("{}_FEATURE_FLAGS_H", package.to_ascii_uppercase());
    let mut out = format!(
        "// Generated by make_openusd_package. Do not edit.\n#ifndef {guard}\n#define {guard}\n\n"
    );
    for (name, raw) in flags.iter() {
        if !IDENTIFIER.is_match(name) {
            log::debug!("Skipping feature flag {name:?}: not a C identifier");
            continue;
        }
        let value = match coerce_bool(raw) {
            Some(true) => "1".to_string(),
            Some(false) => "0".to_string(),
            None if NUMBER.is_match(raw) => raw.to_string(),
            None => format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\"")),
        };
        out.push_str(&format!("#define {name} {value}\n"));
    }
    out.push_str(&format!("\n#endif // {guard}\n"));
    out
}
