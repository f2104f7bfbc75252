//! Command line interface for make_openusd_package.
//!
//! Parses arguments into [`Settings`](crate::bundler::Settings), runs the
//! [`Bundler`] and prints a summary. Ctrl-C cancels the run and terminates
//! every running tool.

mod args;

pub use args::Args;

use crate::{
    bundler::{Bundler, RunReport, tools::ProcessRegistry},
    error::Result,
};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    let settings = args.to_settings()?;

    let registry = ProcessRegistry::default();
    let interrupt = {
        let registry = registry.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling run");
                registry.cancel();
            }
        })
    };

    let result = Bundler::new(settings, registry).run().await;
    interrupt.abort();

    let report = result?;
    print_summary(&report);
    Ok(0)
}

fn print_summary(report: &RunReport) {
    println!(
        "Packaged {} xcframework(s) from {} bundle(s) ({} new), {} header(s)",
        report.units.len(),
        report.bundles.len(),
        report.created_bundles(),
        report.header_count
    );
    for artifact in &report.artifacts {
        println!("  {} {}", artifact.checksum, artifact.url);
    }
    if !report.warnings.is_empty() {
        println!("{} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
}
