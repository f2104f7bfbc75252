//! Packaging pipeline for multi-platform OpenUSD Swift packages.
//!
//! The pipeline turns one or more platform-specific OpenUSD installations into
//! a single Swift package:
//!
//! 1. [`installation`] - validates the installations and merges their feature flags
//! 2. [`resolver`] - computes the shared libraries that must ship per installation
//! 3. [`framework`] - wraps each library into a relocatable `.framework`
//! 4. [`xcframework`] - merges same-named frameworks into one `.xcframework`
//! 5. [`publish`] - optionally zips and checksums the xcframeworks for remote hosting
//! 6. [`headers`] + [`manifest`] - module map, `Package.swift`, flags and feature header
//!
//! [`Bundler`] drives all stages.

pub mod builder;
pub mod error;
pub mod framework;
pub mod headers;
pub mod installation;
pub mod linkage;
pub mod manifest;
pub mod naming;
pub mod publish;
pub mod resolver;
pub mod settings;
pub mod sources;
pub mod tools;
pub mod utils;
pub mod xcframework;

pub use builder::{Bundler, RunReport};
pub use error::{Error, Result, StructuralWarning};
pub use installation::{FeatureFlags, Installation, InstallationSet};
pub use settings::{
    Arch, FlagConflictPolicy, InstallStrategy, PackageConfig, Platform, PlatformTarget,
    RelocationPolicy, Settings, SettingsBuilder, SourceStrategy,
};
