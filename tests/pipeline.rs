//! End-to-end packaging runs against generated installations.

mod common;

use common::{Fixture, RecordingToolchain, write};
use openusd_package_bundler::bundler::{
    Bundler, Error, InstallStrategy, StructuralWarning, publish::ARTIFACTS_MANIFEST,
};
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;

const MACOS_SLICE: &str = "macos-arm64";
const SIMULATOR_SLICE: &str = "ios-arm64-simulator";

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn bundler(
    fixture: &Fixture,
    settings: openusd_package_bundler::bundler::Settings,
    toolchain: RecordingToolchain,
) -> Bundler<RecordingToolchain> {
    Bundler::with_toolchain(
        settings,
        toolchain,
        Arc::new(fixture.inspector()),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn packages_macos_and_simulator_installations() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    write(&fixture.macos, "lib/libusd_mac.dylib", "mac only");

    let toolchain = RecordingToolchain::default();
    let report = bundler(&fixture, fixture.build(false), toolchain.clone())
        .run()
        .await
        .unwrap();

    let names: Vec<&str> = report.units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["Plugin", "Usd_Mac", "Usd_Plug", "Usd_Tf", "Usd_Usd"]);
    assert_eq!(report.bundles.len(), 9);
    assert_eq!(report.created_bundles(), 9);
    assert!(report.artifacts.is_empty());

    let calls = toolchain.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("sign ")).count(), 9);
    assert!(calls.contains(&"rewrite Usd_Tf @rpath/Usd_Tf.framework/Usd_Tf".to_string()));
    assert!(calls.contains(
        &"rewrite Usd_Tf @rpath/Usd_Tf.framework/Versions/A/Usd_Tf".to_string()
    ));

    let libraries = fixture.output.join("Libraries");
    let tf = libraries.join("Usd_Tf.xcframework");
    assert!(tf.join("Info.plist").is_file());
    assert!(tf.join(MACOS_SLICE).join("Usd_Tf.framework/Versions/A/Usd_Tf").is_file());
    assert!(tf.join(SIMULATOR_SLICE).join("Usd_Tf.framework/Usd_Tf").is_file());
    assert!(!libraries.join("Usd_Mac.xcframework").join(SIMULATOR_SLICE).exists());

    // Plugin manifests point at the framework binary and the platform's
    // resource directory.
    let plugin = libraries.join("Plugin.xcframework");
    let mac_manifest = read(
        &plugin
            .join(MACOS_SLICE)
            .join("Plugin.framework/Versions/A/Resources/plugInfo.json"),
    );
    assert!(mac_manifest.contains(r#""ResourcePath": "Resources""#));
    let sim_manifest = read(
        &plugin
            .join(SIMULATOR_SLICE)
            .join("Plugin.framework/BundleResources/plugInfo.json"),
    );
    assert!(sim_manifest.contains(r#""ResourcePath": "BundleResources""#));
    assert!(sim_manifest.contains(r#""LibraryPath": "../Plugin""#));
    assert!(sim_manifest.contains("Plugin_Delegate"));

    // The registry library carries the bootstrap descriptors.
    assert!(
        libraries
            .join("Usd_Plug.xcframework")
            .join(MACOS_SLICE)
            .join("Usd_Plug.framework/Versions/A/Resources/usd/plugInfo.json")
            .is_file()
    );

    let include = fixture.output.join("Sources/OpenUSD/include");
    assert!(include.join("pxr/usd/usd/stage.h").is_file());
    assert!(include.join("OpenUSDFeatureFlags.h").is_file());
    let module_map = read(&include.join("module.modulemap"));
    assert!(module_map.starts_with("// Generated by make_openusd_package. Do not edit."));
    assert!(module_map.contains("module OpenUSD {"));
    assert!(module_map.contains("\"pxr/usd/usd/stage.h\""));
    assert!(!module_map.contains("rapidjson"));
    assert!(!module_map.contains("usdValidation"));
    assert!(
        module_map.find("OpenUSDFeatureFlags.h").unwrap() < module_map.find("pxr/pxr.h").unwrap()
    );
    assert!(report.header_count >= 4);

    let manifest = read(&fixture.output.join("Package.swift"));
    assert!(manifest.contains(r#".binaryTarget(name: "Usd_Tf", path: "Libraries/Usd_Tf.xcframework")"#));
    assert!(manifest.contains(r#".target(name: "Usd_Tf"),"#));
    assert!(manifest.contains(r#".target(name: "Usd_Mac", condition: .when(platforms: [.macOS])),"#));
    assert!(manifest.find("\"Plugin\"").unwrap() < manifest.find("\"Usd_Usd\"").unwrap());

    let flags = read(&fixture.output.join("OpenUSD.flags"));
    assert!(flags.lines().any(|l| l.starts_with("-I")));
    assert!(flags.contains("-no_warn_duplicate_libraries"));
    assert!(!flags.lines().any(|l| l.starts_with("-L")));
}

#[tokio::test]
async fn forced_rerun_reuses_bundles() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());

    bundler(&fixture, fixture.build(false), RecordingToolchain::default())
        .run()
        .await
        .unwrap();
    let module_map_path = fixture.output.join("Sources/OpenUSD/include/module.modulemap");
    let manifest_path = fixture.output.join("Package.swift");
    let module_map = read(&module_map_path);
    let manifest = read(&manifest_path);

    let toolchain = RecordingToolchain::default();
    let report = bundler(&fixture, fixture.build(true), toolchain.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.created_bundles(), 0);
    assert!(report.bundles.iter().all(|b| !b.created));
    assert!(toolchain.calls().is_empty());
    assert_eq!(read(&module_map_path), module_map);
    assert_eq!(read(&manifest_path), manifest);
}

#[tokio::test]
async fn non_empty_output_requires_force() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    write(&fixture.output, "notes.txt", "keep me");

    let err = bundler(&fixture, fixture.build(false), RecordingToolchain::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("--force"));
    assert!(fixture.output.join("notes.txt").is_file());
    assert!(!fixture.output.join("Package.swift").exists());
}

#[tokio::test]
async fn missing_core_library_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    std::fs::remove_file(fixture.simulator.join("lib/libusd_usd.dylib")).unwrap();

    let err = bundler(&fixture, fixture.build(false), RecordingToolchain::default())
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("core library"));
    assert!(!fixture.output.exists());
}

#[tokio::test]
async fn dependency_cycles_terminate() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    write(&fixture.macos, "lib/libcycle_a.dylib", "a");
    write(&fixture.macos, "lib/libcycle_b.dylib", "b");
    let inspector = fixture
        .inspector()
        .library("libcycle_a.dylib", &["@rpath/libcycle_b.dylib"])
        .library("libcycle_b.dylib", &["@rpath/libcycle_a.dylib"]);

    let report = Bundler::with_toolchain(
        fixture.build(false),
        RecordingToolchain::default(),
        Arc::new(inspector),
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap();

    let names: Vec<&str> = report.units.iter().map(|u| u.name.as_str()).collect();
    assert!(names.contains(&"Cycle_A"));
    assert!(names.contains(&"Cycle_B"));
    assert!(
        !report
            .warnings
            .iter()
            .any(|w| matches!(w, StructuralWarning::MissingDependency { .. }))
    );
}

#[tokio::test]
async fn unresolved_rpath_dependency_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let inspector = fixture
        .inspector()
        .library("libusd_tf.dylib", &["@rpath/libboost_missing.dylib"]);

    let report = Bundler::with_toolchain(
        fixture.build(false),
        RecordingToolchain::default(),
        Arc::new(inspector),
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap();

    assert!(report.warnings.iter().any(|w| matches!(
        w,
        StructuralWarning::MissingDependency { reference, .. } if reference == "@rpath/libboost_missing.dylib"
    )));
}

#[tokio::test]
async fn remote_publishing_writes_archives_and_checksums() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let dist = dir.path().join("dist");
    let settings = fixture
        .settings()
        .remote_directory(&dist)
        .remote_url("https://example.com/openusd/v25.05/")
        .build()
        .unwrap();

    let report = bundler(&fixture, settings, RecordingToolchain::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.artifacts.len(), report.units.len());
    assert!(dist.join("Usd_Tf.xcframework.zip").is_file());
    assert!(!fixture.output.join("Libraries").exists());

    let tf = report.artifacts.iter().find(|a| a.name == "Usd_Tf").unwrap();
    assert_eq!(tf.url, "https://example.com/openusd/v25.05/Usd_Tf.xcframework.zip");
    assert_eq!(tf.checksum.len(), 64);

    let artifacts: serde_json::Value =
        serde_json::from_str(&read(&dist.join(ARTIFACTS_MANIFEST))).unwrap();
    assert_eq!(
        artifacts["artifacts"].as_array().unwrap().len(),
        report.units.len()
    );

    let manifest = read(&fixture.output.join("Package.swift"));
    assert!(manifest.contains("url: \"https://example.com/openusd/v25.05/Usd_Tf.xcframework.zip\""));
    assert!(manifest.contains(&format!("checksum: \"{}\"", tf.checksum)));
}

#[tokio::test]
async fn symlink_install_links_libraries() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let settings = openusd_package_bundler::bundler::SettingsBuilder::new()
        .installation(&fixture.macos)
        .output_directory(&fixture.output)
        .install_strategy(InstallStrategy::SymlinkInstall)
        .build()
        .unwrap();

    let toolchain = RecordingToolchain::default();
    let report = bundler(&fixture, settings, toolchain.clone())
        .run()
        .await
        .unwrap();

    assert!(report.units.is_empty());
    assert!(toolchain.calls().is_empty());
    let libraries = fixture.output.join("Libraries");
    assert!(
        std::fs::symlink_metadata(&libraries)
            .unwrap()
            .file_type()
            .is_symlink()
    );
    assert!(libraries.join("libusd_usd.dylib").is_file());

    let flags = read(&fixture.output.join("OpenUSD.flags"));
    assert!(flags.lines().any(|l| l.starts_with("-L")));
    assert!(flags.contains("-rpath"));
    let manifest = read(&fixture.output.join("Package.swift"));
    assert!(!manifest.contains(".binaryTarget"));
}

#[tokio::test]
async fn cancelled_run_stops() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let token = CancellationToken::new();
    token.cancel();

    let err = Bundler::with_toolchain(
        fixture.build(false),
        RecordingToolchain::default(),
        Arc::new(fixture.inspector()),
        token,
    )
    .run()
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn strict_relocation_policy_aborts_on_outside_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let inspector = fixture
        .inspector()
        .library("libusd_tf.dylib", &["/opt/homebrew/lib/libpng16.dylib"]);

    let config = openusd_package_bundler::bundler::PackageConfig {
        non_relocatable: openusd_package_bundler::bundler::RelocationPolicy::Fail,
        ..Default::default()
    };
    let settings = fixture.settings().config(config).build().unwrap();
    let err = Bundler::with_toolchain(
        settings,
        RecordingToolchain::default(),
        Arc::new(inspector),
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap_err();
    assert!(err.to_string().contains("libpng16"));
    assert!(!fixture.output.join("Package.swift").exists());
}
