//! In-place patching of `plugInfo.json` manifests.
//!
//! Plugin manifests are JSON with `#` line comments. They are parsed once to
//! learn each plugin's `Root`, then only the string values of `LibraryPath`,
//! `ResourcePath` (and the bootstrap `Includes` array) are replaced by byte
//! span. Everything else, including whitespace and comments, is preserved.

use crate::bundler::{
    error::{Error, Result},
    framework::FrameworkLayout,
    naming,
    settings::Platform,
    utils::path::{normalize, relative_path, to_slash},
};
use regex::Regex;
use std::{
    ops::Range,
    path::{Path, PathBuf},
    sync::LazyLock,
};

pub const PLUG_INFO: &str = "plugInfo.json";

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(LibraryPath|ResourcePath)"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static regex")
});

static INCLUDES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Includes"\s*:\s*\[([^\]]*)\]"#).expect("static regex"));

/// A rewritable string field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    LibraryPath,
    ResourcePath,
}

/// One occurrence of a field: its value and the byte range of that value
/// (without quotes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpan {
    pub field: Field,
    pub value: String,
    pub range: Range<usize>,
}

/// Finds every `LibraryPath` / `ResourcePath` value in document order.
pub fn scan(text: &str) -> Vec<FieldSpan> {
    FIELD
        .captures_iter(text)
        .filter_map(|c| {
            let field = match &c[1] {
                "LibraryPath" => Field::LibraryPath,
                _ => Field::ResourcePath,
            };
            let value = c.get(2)?;
            Some(FieldSpan {
                field,
                value: value.as_str().to_string(),
                range: value.range(),
            })
        })
        .collect()
}

/// Replaces byte ranges in `text`; ranges must not overlap.
fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Strips `#` comment lines, keeping line numbers stable.
fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Default, serde::Deserialize)]
struct Document {
    #[serde(rename = "Plugins", default)]
    plugins: Vec<PluginEntry>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct PluginEntry {
    #[serde(rename = "Root")]
    root: Option<String>,
    #[serde(rename = "LibraryPath")]
    library_path: Option<String>,
}

/// Rewrites a plugin manifest for its new place in a framework.
///
/// `manifest_dir` is the manifest's directory relative to the directory that
/// holds all frameworks side by side. `LibraryPath` is re-pointed at the
/// binary of the framework its file name normalizes to; resource path
/// components named `resources` become the platform's resource directory.
pub fn rewrite_manifest(text: &str, manifest_dir: &Path, platform: Platform) -> Result<String> {
    let spans = scan(text);
    if spans.is_empty() {
        return Ok(text.to_string());
    }

    let document: Document = serde_json::from_str(&strip_comments(text))?;
    let roots: Vec<Option<&str>> = document
        .plugins
        .iter()
        .filter(|p| p.library_path.is_some())
        .map(|p| p.root.as_deref())
        .collect();

    let library_spans = spans
        .iter()
        .filter(|s| s.field == Field::LibraryPath)
        .count();
    if library_spans != roots.len() {
        return Err(Error::GenericError(format!(
            "plugInfo manifest in {} declares {} LibraryPath fields but {} plugins with libraries",
            manifest_dir.display(),
            library_spans,
            roots.len()
        )));
    }

    let mut edits = Vec::new();
    let mut library_index = 0;
    for span in &spans {
        let replacement = match span.field {
            Field::LibraryPath => {
                let root = roots[library_index];
                library_index += 1;
                library_path(&span.value, manifest_dir, root, platform)
            }
            Field::ResourcePath => resource_path(&span.value, platform),
        };
        if let Some(replacement) = replacement
            && replacement != span.value
        {
            edits.push((span.range.clone(), replacement));
        }
    }
    Ok(splice(text, edits))
}

/// New `LibraryPath` value, `None` to leave the field as-is.
pub fn library_path(
    value: &str,
    manifest_dir: &Path,
    root: Option<&str>,
    platform: Platform,
) -> Option<String> {
    let file_name = value.rsplit('/').next().filter(|s| !s.is_empty())?;
    let bundle = naming::bundle_name(file_name);
    let binary = PathBuf::from(FrameworkLayout::directory_name(&bundle))
        .join(FrameworkLayout::binary_relative_path(&bundle, platform));
    let root_dir = normalize(&manifest_dir.join(root.unwrap_or(".")));
    Some(to_slash(&relative_path(&root_dir, &binary)))
}

/// New `ResourcePath` value, `None` to leave the field as-is.
pub fn resource_path(value: &str, platform: Platform) -> Option<String> {
    let mut changed = false;
    let parts: Vec<&str> = value
        .split('/')
        .map(|part| {
            if part.eq_ignore_ascii_case("resources") {
                changed = true;
                platform.resources_dir()
            } else {
                part
            }
        })
        .collect();
    changed.then(|| parts.join("/"))
}

/// Replaces the bootstrap manifest's `Includes` array.
///
/// A multi-line array keeps one entry per line at the original indentation.
pub fn rewrite_includes(text: &str, includes: &[String]) -> Result<String> {
    let Some(captures) = INCLUDES.captures(text) else {
        return Err(Error::GenericError(
            "bootstrap plugInfo manifest has no Includes array".into(),
        ));
    };
    let Some(body) = captures.get(1) else {
        return Ok(text.to_string());
    };

    let quoted: Vec<String> = includes.iter().map(|i| format!("\"{i}\"")).collect();
    let inner = body.as_str();
    let replacement = if inner.contains('\n') {
        let indent: String = inner
            .trim_start_matches(['\r', '\n'])
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let closing = inner
            .rsplit('\n')
            .next()
            .filter(|tail| tail.trim().is_empty())
            .unwrap_or("");
        let lines: Vec<String> = quoted.iter().map(|q| format!("{indent}{q}")).collect();
        format!("\n{}\n{closing}", lines.join(",\n"))
    } else {
        let lead = if inner.starts_with(' ') { " " } else { "" };
        let trail = if inner.ends_with(' ') { " " } else { "" };
        format!("{lead}{}{trail}", quoted.join(", "))
    };

    Ok(splice(text, vec![(body.range(), replacement)]))
}

/// Search roots written into the plug library's bootstrap manifest.
///
/// The first finds descriptors copied next to the bootstrap file; the second
/// finds plugin frameworks installed beside the plug library's framework.
pub fn bootstrap_includes(bootstrap_dir: &Path, platform: Platform) -> Vec<String> {
    let resources = platform.resources_dir();
    let ups = relative_path(bootstrap_dir, Path::new(""));
    let ups = if ups == Path::new(".") {
        String::new()
    } else {
        format!("{}/", to_slash(&ups))
    };
    vec![
        format!("*/{resources}/"),
        format!("{ups}*.framework/{resources}/"),
    ]
}
