//! Command line argument parsing and validation.

use crate::{
    bundler::{InstallStrategy, PackageConfig, Settings, SettingsBuilder, SourceStrategy},
    error::{CliError, Result},
};
use clap::Parser;
use std::{collections::BTreeSet, path::PathBuf};

/// Packages OpenUSD installations into a multi-platform Swift package
#[derive(Parser, Debug)]
#[command(
    name = "make_openusd_package",
    version,
    about = "Packages OpenUSD installations into a multi-platform Swift package",
    long_about = "Packages one or more already-built OpenUSD installations (one per Apple platform) into a single Swift package.

With the default `bundle` strategy every shared library is wrapped into a relocatable framework, same-named frameworks are merged into xcframeworks, and Package.swift, a module map, a flags file and a feature-flag header are generated.

Usage:
  make_openusd_package /opt/usd/macos /opt/usd/ios-simulator -o OpenUSD
  make_openusd_package /opt/usd/macos --strategy symlink-install --source-strategy symlink
  make_openusd_package /opt/usd/macos /opt/usd/ios \\
      --remote-artifacts-dir dist --remote-artifacts-url https://example.com/openusd/v25.05

Exit code 0 = the package is complete at the output path."
)]
pub struct Args {
    /// OpenUSD installation roots, one per target platform
    #[arg(value_name = "INSTALL", required = true, num_args = 1..)]
    pub installs: Vec<PathBuf>,

    /// How the libraries area is populated
    #[arg(long, value_enum, default_value_t = InstallStrategy::Bundle)]
    pub strategy: InstallStrategy,

    /// How headers are brought into the package
    #[arg(long, value_enum, default_value_t = SourceStrategy::Copy)]
    pub source_strategy: SourceStrategy,

    /// Package output directory (default: ./<package name>)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory receiving zipped xcframeworks for remote hosting
    #[arg(long, value_name = "DIR", requires = "remote_artifacts_url")]
    pub remote_artifacts_dir: Option<PathBuf>,

    /// URL the zipped xcframeworks will be hosted under
    #[arg(long, value_name = "URL", requires = "remote_artifacts_dir")]
    pub remote_artifacts_url: Option<String>,

    /// Generate into a non-empty output directory
    #[arg(short, long)]
    pub force: bool,

    /// Package configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "OPENUSD_PACKAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of parallel bundling jobs (default: number of CPUs)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Rejects installations given more than once.
    pub fn validate(&self) -> std::result::Result<(), CliError> {
        let mut seen = BTreeSet::new();
        for install in &self.installs {
            if !seen.insert(install) {
                return Err(CliError::InvalidArguments {
                    reason: format!("installation {} given more than once", install.display()),
                });
            }
        }
        Ok(())
    }

    /// Builds validated [`Settings`]; the config file is read here.
    pub fn to_settings(&self) -> Result<Settings> {
        self.validate()?;
        let mut config = match &self.config {
            Some(path) => PackageConfig::load(path)?,
            None => PackageConfig::default(),
        };
        if let Some(jobs) = self.jobs {
            config.jobs = Some(usize::from(jobs));
        }

        let mut builder = SettingsBuilder::new()
            .installations(&self.installs)
            .install_strategy(self.strategy)
            .source_strategy(self.source_strategy)
            .force(self.force)
            .config(config);
        if let Some(output) = &self.output {
            builder = builder.output_directory(output);
        }
        if let Some(directory) = &self.remote_artifacts_dir {
            builder = builder.remote_directory(directory);
        }
        if let Some(url) = &self.remote_artifacts_url {
            builder = builder.remote_url(url.clone());
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("make_openusd_package").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let args = parse(&["/opt/usd/macos", "/opt/usd/ios"]).unwrap();
        assert_eq!(args.installs.len(), 2);
        assert_eq!(args.strategy, InstallStrategy::Bundle);
        assert_eq!(args.source_strategy, SourceStrategy::Copy);
        assert!(!args.force);
    }

    #[test]
    fn strategies_are_kebab_case() {
        let args = parse(&[
            "/opt/usd",
            "--strategy",
            "symlink-install",
            "--source-strategy",
            "symlink",
        ])
        .unwrap();
        assert_eq!(args.strategy, InstallStrategy::SymlinkInstall);
        assert_eq!(args.source_strategy, SourceStrategy::Symlink);
    }

    #[test]
    fn remote_flags_are_co_required() {
        assert!(parse(&["/opt/usd", "--remote-artifacts-dir", "dist"]).is_err());
        assert!(parse(&["/opt/usd", "--remote-artifacts-url", "https://example.com"]).is_err());
        assert!(
            parse(&[
                "/opt/usd",
                "--remote-artifacts-dir",
                "dist",
                "--remote-artifacts-url",
                "https://example.com"
            ])
            .is_ok()
        );
    }

    #[test]
    fn duplicate_installations_are_rejected() {
        let args = parse(&["/opt/usd", "/opt/usd"]).unwrap();
        let err = args.to_settings().unwrap_err();
        assert!(err.to_string().contains("given more than once"));
    }

    #[test]
    fn requires_an_installation() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn jobs_override_config() {
        let args = parse(&["/opt/usd", "-j", "3", "-o", "/tmp/pkg"]).unwrap();
        let settings = args.to_settings().unwrap();
        assert_eq!(settings.jobs(), 3);
        assert!(parse(&["/opt/usd", "-j", "0"]).is_err());
    }
}
