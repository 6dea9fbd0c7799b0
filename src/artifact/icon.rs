//! Launcher icon resolution.
//!
//! Android: the manifest's literal icon path when present, then a priority
//! scan over density buckets, then a regex sweep. iOS: `Info.plist` icon
//! name hints matched against the app directory, restored through the CgBI
//! path.

use log::{debug, warn};
use regex::Regex;

use super::cgbi;
use super::models::{IconData, Platform};
use super::store::EntryStore;

/// Density buckets, best first.
const DENSITIES: [&str; 5] = ["xxxhdpi", "xxhdpi", "xhdpi", "hdpi", "mdpi"];
const NAMES: [&str; 2] = ["ic_launcher.png", "ic_launcher_round.png"];
const BUCKETS: [&str; 2] = ["mipmap", "drawable"];
const SUFFIXES: [&str; 2] = ["-v4", ""];

/// Resolve the Android launcher icon.
///
/// `icon_attr` is the manifest's `android:icon` surface; values starting
/// with `@` are resource references this inspector does not resolve, so the
/// density scan runs for those.
pub fn resolve_android(
    store: &mut dyn EntryStore,
    entries: &[String],
    icon_attr: Option<&str>,
    platform: Platform,
) -> Option<(String, IconData)> {
    let prefix = match platform {
        Platform::Aab => "base/",
        _ => "",
    };

    if let Some(path) = icon_attr.filter(|p| !p.starts_with('@') && !p.starts_with('?')) {
        let full = format!("{}{}", prefix, path);
        if let Some(found) = open_icon(store, &full) {
            return Some(found);
        }
        warn!("Manifest icon {:?} not present in archive", full);
    }

    for density in DENSITIES {
        for name in NAMES {
            for bucket in BUCKETS {
                for suffix in SUFFIXES {
                    let candidate =
                        format!("{}res/{}-{}{}/{}", prefix, bucket, density, suffix, name);
                    if entries.iter().any(|e| e == &candidate) {
                        if let Some(found) = open_icon(store, &candidate) {
                            return Some(found);
                        }
                    }
                }
            }
        }
    }

    // Last resort: any launcher-named PNG, best density first.
    let pattern = match Regex::new(r"ic_launcher[^/]*\.png$") {
        Ok(p) => p,
        Err(_) => return None,
    };
    let mut candidates: Vec<&String> = entries
        .iter()
        .filter(|e| e.starts_with(prefix) && pattern.is_match(e))
        .collect();
    candidates.sort_by_key(|e| density_rank(e));
    for candidate in candidates {
        if let Some(found) = open_icon(store, candidate) {
            return Some(found);
        }
    }
    None
}

fn density_rank(path: &str) -> usize {
    DENSITIES
        .iter()
        .position(|d| path.contains(d))
        .unwrap_or(DENSITIES.len())
}

/// Resolve the iOS app icon from `Info.plist` name hints.
///
/// Prefers the highest-scale asset among the matches and runs the result
/// through the CgBI restorer.
pub fn resolve_ios(
    store: &mut dyn EntryStore,
    entries: &[String],
    hints: &[String],
) -> Option<(String, IconData)> {
    let mut candidates: Vec<&String> = entries
        .iter()
        .filter(|e| {
            let Some((dir, file)) = e.rsplit_once('/') else {
                return false;
            };
            dir.starts_with("Payload/")
                && dir.ends_with(".app")
                && file.ends_with(".png")
                && hints.iter().any(|h| file.starts_with(h.as_str()))
        })
        .collect();
    candidates.sort_by_key(|e| scale_rank(e));

    for candidate in candidates {
        if let Some(found) = open_icon(store, candidate) {
            return Some(found);
        }
    }
    None
}

fn scale_rank(path: &str) -> usize {
    if path.contains("@3x") {
        0
    } else if path.contains("@2x") {
        1
    } else {
        2
    }
}

/// Read one entry and run it through the CgBI restorer. Failures degrade to
/// `None`; icon extraction never fails the inspection.
fn open_icon(store: &mut dyn EntryStore, path: &str) -> Option<(String, IconData)> {
    let bytes = match store.open(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Icon entry {:?} unreadable: {}", path, e);
            return None;
        }
    };
    match cgbi::restore(&bytes) {
        Ok(icon) => {
            debug!("Icon resolved from {:?}", path);
            Some((path.to_string(), icon))
        }
        Err(e) => {
            warn!("Icon {:?} failed restoration: {}", path, e);
            None
        }
    }
}
