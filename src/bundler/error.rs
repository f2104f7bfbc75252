//! Pipeline error types.
//!
//! Three kinds of problems can come out of a packaging run:
//!
//! - [`Error::Validation`] - pre-flight configuration problems, raised before
//!   any file is touched
//! - [`Error::ToolFailed`] - an external tool exited non-zero; never retried
//! - everything else - filesystem, serialization and template failures
//!
//! Non-fatal structural problems are not errors at all, see
//! [`StructuralWarning`].

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    process::ExitStatus,
};
use thiserror::Error as DeriveError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the packaging pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Pre-flight configuration problem (missing installation, disallowed
    /// platform/strategy combination, missing paired flags).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An external tool ran and exited unsuccessfully.
    #[error("`{tool} {args}` failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        args: String,
        status: ExitStatus,
        stderr: String,
    },

    /// An external tool could not be spawned at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        command: String,
        error: std::io::Error,
    },

    /// The run was interrupted and in-flight tools were terminated.
    #[error("run cancelled")]
    Cancelled,

    /// Filesystem failure with the path that caused it.
    #[error("{context} {path}: {error}")]
    Fs {
        context: &'static str,
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    GenericError(String),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Plist(#[from] plist::Error),

    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("{0}")]
    Render(#[from] handlebars::RenderError),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("{0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("failed to parse Mach-O: {0}")]
    Goblin(#[from] goblin::error::Error),

    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Whether the error is a pre-flight validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Attaches a context message and offending path to I/O results.
pub trait ErrorExt<T> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Converts results and options into [`Error::GenericError`] with a message.
pub trait Context<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::GenericError(format!("{}: {e}", f())))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Returns early with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

/// Returns early with a [`Error::Validation`].
#[macro_export]
macro_rules! invalid {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        return Err($crate::bundler::Error::Validation(format!($fmt $(, $arg)*)))
    };
}

/// A problem that does not stop the run but may produce a package that
/// fails on another machine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StructuralWarning {
    /// A slice directory inside an xcframework could not be interpreted.
    UnknownPlatform { unit: PathBuf, identifier: String },
    /// A `@rpath` reference did not resolve inside the installation.
    MissingDependency { artifact: PathBuf, reference: String },
    /// A dependency lives outside the relocatable locations.
    NonRelocatableDependency { artifact: PathBuf, reference: String },
    /// Installations disagree on a feature flag.
    FeatureFlagConflict {
        flag: String,
        previous: String,
        current: String,
    },
    /// A header belongs to no library in the canonical order.
    UnknownHeaderLibrary { header: String },
}

impl Display for StructuralWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralWarning::UnknownPlatform { unit, identifier } => write!(
                f,
                "unrecognized platform slice '{identifier}' in {}",
                unit.display()
            ),
            StructuralWarning::MissingDependency {
                artifact,
                reference,
            } => write!(
                f,
                "{} references {reference}, which is not part of the installation (non-relocatable build?)",
                artifact.display()
            ),
            StructuralWarning::NonRelocatableDependency {
                artifact,
                reference,
            } => write!(
                f,
                "{} depends on {reference} outside the relocatable locations; the package may not work on other machines",
                artifact.display()
            ),
            StructuralWarning::FeatureFlagConflict {
                flag,
                previous,
                current,
            } => write!(
                f,
                "feature flag {flag} differs between installations ('{previous}' vs '{current}')"
            ),
            StructuralWarning::UnknownHeaderLibrary { header } => {
                write!(f, "header {header} belongs to an unknown library, ordering it last")
            }
        }
    }
}

impl StructuralWarning {
    /// Logs the warning and hands it back for collection.
    pub fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}
