//! Filesystem and path helpers shared by the pipeline stages.

pub mod fs;
pub mod path;
