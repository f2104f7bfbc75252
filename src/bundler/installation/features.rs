//! Build feature flags of an installation.

use crate::bundler::error::{ErrorExt, Result};
use regex::Regex;
use std::{collections::BTreeMap, path::Path, sync::LazyLock};

/// CMake package config written by the OpenUSD install step.
pub const CMAKE_CONFIG: &str = "pxrConfig.cmake";

/// Public configuration header.
pub const CONFIG_HEADER: &str = "include/pxr/pxr.h";

static CMAKE_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*set\(\s*([A-Za-z_][A-Za-z0-9_]*)\s+"?([^")]*?)"?\s*\)"#)
        .expect("static regex")
});

static C_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*#[ \t]*define[ \t]+([A-Za-z_][A-Za-z0-9_]*)(?:[ \t]+([^\r\n]*?))?[ \t]*\r?$")
        .expect("static regex")
});

/// Flat map of feature-flag name to raw string value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    values: BTreeMap<String, String>,
}

impl FeatureFlags {
    /// Reads flags from the installation's CMake config and config header.
    ///
    /// Both files are optional; header defines override CMake values.
    pub fn load(root: &Path) -> Result<Self> {
        let mut flags = FeatureFlags::default();

        let cmake = root.join(CMAKE_CONFIG);
        if cmake.is_file() {
            let text = std::fs::read_to_string(&cmake).fs_context("reading feature flags", &cmake)?;
            flags.extend(FeatureFlags::parse_cmake(&text));
        }

        let header = root.join(CONFIG_HEADER);
        if header.is_file() {
            let text =
                std::fs::read_to_string(&header).fs_context("reading feature flags", &header)?;
            flags.extend(FeatureFlags::parse_header(&text));
        }

        Ok(flags)
    }

    /// Parses `set(NAME "VALUE")` lines.
    pub fn parse_cmake(text: &str) -> Self {
        let values = CMAKE_SET
            .captures_iter(text)
            .map(|c| (c[1].to_string(), c[2].trim().to_string()))
            .collect();
        Self { values }
    }

    /// Parses `#define NAME VALUE` lines; a bare define counts as `1`.
    pub fn parse_header(text: &str) -> Self {
        let values = C_DEFINE
            .captures_iter(text)
            .map(|c| {
                let value = c
                    .get(2)
                    .map(|m| m.as_str().trim())
                    .filter(|v| !v.is_empty())
                    .unwrap_or("1");
                (c[1].to_string(), value.to_string())
            })
            .collect();
        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn extend(&mut self, other: FeatureFlags) {
        self.values.extend(other.values);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Boolean coercion of a flag; `None` when unset or not boolean-like.
    pub fn as_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(coerce_bool)
    }

    /// Whether a flag is set to a true-like value.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.as_bool(name).unwrap_or(false)
    }

    /// Flags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// CMake truthiness.
pub fn coerce_bool(raw: &str) -> Option<bool> {
    let value = raw.trim().to_ascii_uppercase();
    match value.as_str() {
        "ON" | "TRUE" | "YES" | "Y" | "1" => Some(true),
        "OFF" | "FALSE" | "NO" | "N" | "0" | "" | "IGNORE" => Some(false),
        v if v.ends_with("-NOTFOUND") || v == "NOTFOUND" => Some(false),
        _ => None,
    }
}
