//! Shared fixtures for the integration tests.
//!
//! Installations are generated on the fly: every "binary" is a small text
//! file, and [`FakeInspector`] answers linkage queries from a table so the
//! pipeline runs on any host.

#![allow(dead_code)]

use openusd_package_bundler::bundler::{
    Result, Settings, SettingsBuilder,
    linkage::{LinkageInspector, LinkageRecord, LoadCommand, RewritePlan},
    settings::{Arch, Platform, PlatformTarget},
    tools::Toolchain,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Linkage by file name; platform by installation root.
#[derive(Default)]
pub struct FakeInspector {
    roots: Vec<(PathBuf, PlatformTarget)>,
    dependencies: HashMap<String, Vec<String>>,
}

impl FakeInspector {
    pub fn root(mut self, root: &Path, platform: Platform) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        self.roots
            .push((root, PlatformTarget::new(platform, vec![Arch::Arm64])));
        self
    }

    pub fn library(mut self, file: &str, dependencies: &[&str]) -> Self {
        self.dependencies.insert(
            file.to_string(),
            dependencies.iter().map(|d| d.to_string()).collect(),
        );
        self
    }
}

impl LinkageInspector for FakeInspector {
    fn inspect(&self, binary: &Path) -> Result<LinkageRecord> {
        let binary = binary
            .canonicalize()
            .unwrap_or_else(|_| binary.to_path_buf());
        let file = binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = self
            .roots
            .iter()
            .find(|(root, _)| binary.starts_with(root))
            .map(|(_, target)| target.clone());
        let dependencies = self
            .dependencies
            .get(&file)
            .map(|deps| deps.iter().map(|d| LoadCommand::new(d.as_str())).collect())
            .unwrap_or_default();
        Ok(LinkageRecord {
            install_id: Some(format!("@rpath/{file}")),
            dependencies,
            rpaths: vec!["@loader_path/../lib".into()],
            target,
        })
    }
}

/// Toolchain that only records what it was asked to do.
#[derive(Clone, Default)]
pub struct RecordingToolchain {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingToolchain {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Toolchain for RecordingToolchain {
    async fn rewrite_linkage(&self, binary: &Path, plan: &RewritePlan) -> Result<()> {
        self.calls.lock().unwrap().push(format!(
            "rewrite {} {}",
            binary.file_name().unwrap().to_string_lossy(),
            plan.install_id
        ));
        Ok(())
    }

    async fn sign(&self, bundle: &Path, _identity: &str, identifier: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!(
            "sign {} {identifier}",
            bundle.file_name().unwrap().to_string_lossy()
        ));
        Ok(())
    }
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

pub const BOOTSTRAP_PLUG_INFO: &str = r#"{
    "Includes": [ "*/resources/" ]
}
"#;

pub const USD_PLUG_INFO: &str = r#"{
    "Plugins": [
        {
            "Info": {
                "Types": {}
            },
            "LibraryPath": "../../../libusd_usd.dylib",
            "Name": "usd",
            "ResourcePath": "resources",
            "Root": "..",
            "Type": "library"
        }
    ]
}
"#;

pub const PLUGIN_PLUG_INFO: &str = r#"{
    "Plugins": [
        {
            "Info": {
                "Types": {
                    "Plugin_Delegate": { "bases": ["HdRendererPlugin"] }
                }
            },
            "LibraryPath": "../../libplugin.dylib",
            "Name": "plugin",
            "ResourcePath": "resources",
            "Type": "library"
        }
    ]
}
"#;

/// A minimal OpenUSD installation.
pub fn installation(root: &Path) {
    for lib in ["libusd_usd.dylib", "libusd_tf.dylib", "libusd_plug.dylib"] {
        write(root, &format!("lib/{lib}"), lib);
    }
    write(root, "lib/usd/plugInfo.json", BOOTSTRAP_PLUG_INFO);
    write(root, "lib/usd/usd/resources/plugInfo.json", USD_PLUG_INFO);
    write(root, "plugin/usd/libplugin.dylib", "plugin");
    write(root, "plugin/usd/libplugin/resources/plugInfo.json", PLUGIN_PLUG_INFO);

    write(root, "include/pxr/pxr.h", "#define PXR_VERSION 2505\n");
    write(root, "include/pxr/base/tf/token.h", "#pragma once\n");
    write(root, "include/pxr/base/arch/defines.h", "#pragma once\n");
    write(root, "include/pxr/usd/sdf/path.h", "#pragma once\n");
    write(root, "include/pxr/usd/usd/stage.h", "#pragma once\n");
    write(root, "include/pxr/base/js/rapidjson/document.h", "#pragma once\n");
    write(root, "include/pxr/usdValidation/usdValidation/validator.h", "#pragma once\n");
    write(
        root,
        "pxrConfig.cmake",
        "set(PXR_BUILD_IMAGING \"ON\")\nset(PXR_ENABLE_PYTHON_SUPPORT \"OFF\")\n",
    );
}

/// Linkage table matching [`installation`].
pub fn inspector() -> FakeInspector {
    FakeInspector::default()
        .library(
            "libusd_usd.dylib",
            &[
                "@rpath/libusd_tf.dylib",
                "@rpath/libusd_plug.dylib",
                "/usr/lib/libc++.1.dylib",
            ],
        )
        .library("libusd_plug.dylib", &["@rpath/libusd_tf.dylib"])
        .library("libusd_tf.dylib", &["/usr/lib/libSystem.B.dylib"])
        .library(
            "libplugin.dylib",
            &["@rpath/libusd_usd.dylib", "@rpath/libplugin.dylib"],
        )
}

/// macOS and iOS-simulator installations under `dir`.
pub struct Fixture {
    pub macos: PathBuf,
    pub simulator: PathBuf,
    pub output: PathBuf,
}

impl Fixture {
    pub fn new(dir: &Path) -> Self {
        let macos = dir.join("install-macos");
        let simulator = dir.join("install-ios-simulator");
        installation(&macos);
        installation(&simulator);
        Self {
            macos,
            simulator,
            output: dir.join("OpenUSD"),
        }
    }

    pub fn inspector(&self) -> FakeInspector {
        inspector()
            .root(&self.macos, Platform::MacOs)
            .root(&self.simulator, Platform::IosSimulator)
    }

    pub fn settings(&self) -> SettingsBuilder {
        SettingsBuilder::new()
            .installation(&self.macos)
            .installation(&self.simulator)
            .output_directory(&self.output)
    }

    pub fn build(&self, force: bool) -> Settings {
        self.settings().force(force).build().unwrap()
    }
}
