//! Top-level error types for the command line tool.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type of the binary
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("{0}")]
    Cli(#[from] CliError),

    /// Pipeline errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Whether the run was stopped by an interrupt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BundlerError::Bundler(crate::bundler::Error::Cancelled))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() { 130 } else { 1 }
    }
}
