//! Configuration structures for packaging runs.
//!
//! [`Settings`] is assembled by [`SettingsBuilder`] from command line values
//! and an optional [`PackageConfig`] TOML file.

mod arch;
mod builder;
mod config;
mod core;

pub use arch::{Arch, Platform, PlatformFamily, PlatformTarget};
pub use builder::SettingsBuilder;
pub use config::{
    FlagConflictPolicy, InstallStrategy, PackageConfig, RelocationPolicy, SourceStrategy,
};
pub use core::{RemoteArtifacts, Settings};
