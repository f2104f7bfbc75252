//! Packages platform-specific OpenUSD installations into one Swift package.
//!
//! Every shared library of every installation is wrapped into a relocatable
//! framework, same-named frameworks are merged into xcframeworks, and the
//! package manifest, module map, flags file and feature-flag header are
//! generated next to them.
//!
//! It can be used both as a CLI tool (`make_openusd_package`) and as a
//! library dependency through [`bundler::Bundler`].

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
