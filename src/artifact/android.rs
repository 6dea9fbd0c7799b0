//! Projection of a parsed Android manifest and the archive entry list into
//! the normalized Android record.

use log::{debug, info};

use super::element::Element;
use super::models::{ActivityInfo, AndroidInfo, FeatureInfo, Platform, SigningInfo};

const ACTION_MAIN: &str = "android.intent.action.MAIN";
const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

/// Reduce a manifest element tree plus the entry list to the Android record.
pub fn project(root: &Element, entries: &[String], platform: Platform) -> AndroidInfo {
    let mut info = scan_archive(entries, platform);
    let manifest = match find_manifest(root) {
        Some(m) => m,
        None => return info,
    };

    info.package = manifest.attr("package").map(|v| v.to_string());
    info.version_code = manifest.attr("versionCode").map(|v| v.to_string());
    info.version_name = manifest.attr("versionName").map(|v| v.to_string());
    info.compile_sdk = manifest.attr("compileSdkVersion").map(|v| v.to_string());
    info.platform_build_version_name = manifest
        .attr("platformBuildVersionName")
        .map(|v| v.to_string());

    if let Some(uses_sdk) = manifest.child("uses-sdk") {
        // SDK levels may be unresolved references; the `@0x…` surface is kept.
        info.min_sdk = uses_sdk.attr("minSdkVersion").map(|v| v.to_string());
        info.target_sdk = uses_sdk.attr("targetSdkVersion").map(|v| v.to_string());
    }

    for permission in manifest.children_named("uses-permission") {
        if let Some(name) = permission.attr("name") {
            info.permissions.push(name.to_string());
        }
    }

    for feature in manifest.children_named("uses-feature") {
        if let Some(name) = feature.attr("name") {
            info.features.push(FeatureInfo {
                name: name.to_string(),
                required: feature
                    .attr("required")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true),
            });
        }
    }

    if let Some(application) = manifest.child("application") {
        info.label = application.attr("label").map(|v| v.to_string());
        info.debuggable = application
            .attr("debuggable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        for component in &application.children {
            let name = match component.attr("name") {
                Some(n) => n.to_string(),
                None => continue,
            };
            match component.tag.as_str() {
                "activity" => info.activities.push(ActivityInfo {
                    is_launcher: is_launcher(component),
                    name,
                }),
                "service" => info.services.push(name),
                "receiver" => info.receivers.push(name),
                _ => {}
            }
        }
    }

    info!(
        "Manifest projected: package={:?}, {} permissions, {} activities",
        info.package,
        info.permissions.len(),
        info.activities.len()
    );
    info
}

/// The manifest's literal icon attribute, when usable for direct lookup.
///
/// References (`@0x…`) cannot be resolved without the resource table; the
/// caller falls back to the density-bucket scan for those.
pub fn icon_attr(root: &Element) -> Option<String> {
    let manifest = find_manifest(root)?;
    let application = manifest.child("application")?;
    let icon = application.attr("icon")?.to_string();
    if icon.is_empty() {
        None
    } else {
        Some(icon)
    }
}

fn find_manifest(root: &Element) -> Option<&Element> {
    if root.tag == "manifest" {
        return Some(root);
    }
    root.children.iter().find(|c| c.tag == "manifest")
}

/// An activity is the launcher iff one intent filter declares both the MAIN
/// action and the LAUNCHER category.
fn is_launcher(activity: &Element) -> bool {
    activity.children_named("intent-filter").any(|filter| {
        let has_main = filter
            .children_named("action")
            .any(|a| a.attr("name").map(|v| v.to_string()).as_deref() == Some(ACTION_MAIN));
        let has_launcher = filter
            .children_named("category")
            .any(|c| c.attr("name").map(|v| v.to_string()).as_deref() == Some(CATEGORY_LAUNCHER));
        has_main && has_launcher
    })
}

/// Archive-level facts that survive even a failed manifest parse:
/// native architectures, dex count, AAB modules, and signing entries.
pub fn scan_archive(entries: &[String], platform: Platform) -> AndroidInfo {
    let lib_prefix = match platform {
        Platform::Aab => "base/lib/",
        _ => "lib/",
    };

    let mut architectures: Vec<String> = Vec::new();
    for entry in entries {
        if let Some(rest) = entry.strip_prefix(lib_prefix) {
            if let Some((arch, file)) = rest.split_once('/') {
                if file.ends_with(".so") && !architectures.iter().any(|a| a == arch) {
                    architectures.push(arch.to_string());
                }
            }
        }
    }

    let dex_count = entries.iter().filter(|e| e.ends_with(".dex")).count();

    let mut modules: Vec<String> = Vec::new();
    if platform == Platform::Aab {
        for entry in entries {
            if let Some((module, rest)) = entry.split_once('/') {
                if rest == "manifest/AndroidManifest.xml"
                    && !modules.iter().any(|m| m == module)
                {
                    modules.push(module.to_string());
                }
            }
        }
        // The base module leads; the rest keep discovery order.
        modules.sort_by_key(|m| m != "base");
    }

    let signing = scan_signing(entries);
    debug!(
        "Archive scan: {} architectures, {} dex files, signed={}",
        architectures.len(),
        dex_count,
        signing.signed
    );

    AndroidInfo {
        architectures,
        dex_count,
        modules,
        signing,
        ..AndroidInfo::default()
    }
}

fn scan_signing(entries: &[String]) -> SigningInfo {
    let mut signing = SigningInfo::default();
    for entry in entries {
        let Some(name) = entry.strip_prefix("META-INF/") else {
            continue;
        };
        let suffix = name.rsplit('.').next().unwrap_or("").to_ascii_uppercase();
        match suffix.as_str() {
            "RSA" | "DSA" | "EC" => {
                signing.signed = true;
                signing.entries.push(entry.clone());
            }
            "SF" | "MF" => signing.entries.push(entry.clone()),
            _ => {}
        }
    }
    signing
}
