//! Built-in `Package.swift` template.
//!
//! Tokens:
//! - `generated_marker` - the "generated file" comment line
//! - `package_name` - package, product and umbrella target name
//! - `path_prefix` - prefix of every generated path, empty or ending in `/`
//! - `dependency_list` - `.target(name:condition:)` entries of the umbrella target
//! - `binary_targets` - one `.binaryTarget` per merged library

pub const PACKAGE_TEMPLATE: &str = r#"// swift-tools-version: 5.9
{{generated_marker}}

import PackageDescription

let package = Package(
    name: "{{package_name}}",
    platforms: [
        .macOS(.v12),
        .iOS(.v15),
        .macCatalyst(.v15),
        .visionOS(.v1),
    ],
    products: [
        .library(name: "{{package_name}}", targets: ["{{package_name}}"]),
    ],
    targets: [
        .target(
            name: "{{package_name}}",
            dependencies: [
{{dependency_list}}
            ],
            path: "{{path_prefix}}Sources/{{package_name}}",
            publicHeadersPath: "include",
            cxxSettings: [
                .headerSearchPath("include"),
            ]
        ),
{{binary_targets}}
    ],
    cxxLanguageStandard: .gnucxx17
)
"#;
