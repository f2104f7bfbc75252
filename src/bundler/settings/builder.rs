//! Builder for constructing Settings.

use super::{InstallStrategy, PackageConfig, RemoteArtifacts, Settings, SourceStrategy};
use crate::bundler::error::{Error, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use openusd_package_bundler::bundler::{InstallStrategy, SettingsBuilder};
///
/// # fn example() -> openusd_package_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .installation("/opt/usd/macos")
///     .installation("/opt/usd/ios-simulator")
///     .install_strategy(InstallStrategy::Bundle)
///     .output_directory("build/OpenUSD")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    installations: Vec<PathBuf>,
    install_strategy: InstallStrategy,
    source_strategy: SourceStrategy,
    output_directory: Option<PathBuf>,
    remote_directory: Option<PathBuf>,
    remote_url: Option<String>,
    force: bool,
    config: PackageConfig,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds an installation root.
    ///
    /// # Required
    ///
    /// At least one installation is required for building.
    pub fn installation<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.installations.push(path.as_ref().to_path_buf());
        self
    }

    pub fn installations<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.installations
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Default: [`InstallStrategy::Bundle`]
    pub fn install_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.install_strategy = strategy;
        self
    }

    /// Default: [`SourceStrategy::Copy`]
    pub fn source_strategy(mut self, strategy: SourceStrategy) -> Self {
        self.source_strategy = strategy;
        self
    }

    /// Sets the package output directory.
    ///
    /// Default: `./<package name>`
    pub fn output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Directory for archived xcframeworks; requires [`Self::remote_url`].
    pub fn remote_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.remote_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Hosting URL for archived xcframeworks; requires [`Self::remote_directory`].
    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Allows generating into a non-empty output directory.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Default: [`PackageConfig::default`]
    pub fn config(mut self, config: PackageConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if:
    /// - no installation was given
    /// - only one of the remote directory / hosting URL was given
    /// - the hosting URL does not parse
    /// - a raw install strategy is combined with several installations or
    ///   with remote publishing
    pub fn build(self) -> Result<Settings> {
        if self.installations.is_empty() {
            return Err(Error::Validation(
                "at least one installation path is required".into(),
            ));
        }

        let remote = match (self.remote_directory, self.remote_url) {
            (Some(directory), Some(url)) => Some(RemoteArtifacts {
                directory: absolute(&directory)?,
                hosting_url: url::Url::parse(&url).map_err(|e| {
                    Error::Validation(format!("invalid remote artifact url '{}': {}", url, e))
                })?,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Validation(
                    "remote artifact directory requires a remote artifact url".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::Validation(
                    "remote artifact url requires a remote artifact directory".into(),
                ));
            }
        };

        if self.install_strategy.is_raw() {
            if self.installations.len() != 1 {
                return Err(Error::Validation(format!(
                    "{:?} packages exactly one installation, got {}",
                    self.install_strategy,
                    self.installations.len()
                )));
            }
            if remote.is_some() {
                return Err(Error::Validation(format!(
                    "{:?} cannot publish remote artifacts",
                    self.install_strategy
                )));
            }
        }

        let output_directory = match self.output_directory {
            Some(dir) => absolute(&dir)?,
            None => absolute(Path::new(&self.config.package_name))?,
        };

        let installations = self
            .installations
            .iter()
            .map(|p| absolute(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Settings::new(
            installations,
            self.install_strategy,
            self.source_strategy,
            output_directory,
            remote,
            self.force,
            self.config,
        ))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}
