//! Run orchestration.
//!
//! [`Bundler`] validates everything up front, then drives the stages:
//!
//! 1. resolve each installation's dependency closure
//! 2. bundle every artifact of every installation (bounded fan-out)
//! 3. merge same-named bundles once all bundling has joined
//! 4. copy the merged units into the package or publish them
//! 5. headers, module map, manifest, flags and feature header
//!
//! Task results are sorted before anything deterministic is written.
//!
//! # Module Organization
//!
//! - [`orchestrator`] - the [`Bundler`] and its [`RunReport`]
//! - [`output`] - output directory validation and `--force` cleanup
//! - [`tool_detection`] - external tool availability checking

mod orchestrator;
mod output;
mod tool_detection;

pub use orchestrator::{Bundler, RunReport};
pub use output::{check_output_directory, clear_output_directory};
pub use tool_detection::{REQUIRED_TOOLS, require_tools};
