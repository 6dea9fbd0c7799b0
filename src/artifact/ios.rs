//! Projection of an IPA's `Info.plist` and provisioning profile into the
//! normalized iOS record.

use log::{debug, info, warn};

use super::error::{ArtifactError, Result};
use super::models::{DeviceFamily, IosInfo, PlistValue, ProvisioningInfo};
use super::xml_tree;

/// Reduce a parsed `Info.plist` plus the entry list to the iOS record.
pub fn project(plist: &PlistValue, entries: &[String]) -> IosInfo {
    let mut ios = IosInfo {
        bundle_id: string_key(plist, "CFBundleIdentifier"),
        app_name: string_key(plist, "CFBundleName"),
        display_name: string_key(plist, "CFBundleDisplayName"),
        executable: string_key(plist, "CFBundleExecutable"),
        version: string_key(plist, "CFBundleShortVersionString"),
        build_number: string_key(plist, "CFBundleVersion"),
        min_os_version: string_key(plist, "MinimumOSVersion"),
        supported_platforms: string_array(plist, "CFBundleSupportedPlatforms"),
        required_capabilities: string_array(plist, "UIRequiredDeviceCapabilities"),
        background_modes: string_array(plist, "UIBackgroundModes"),
        xcode_version: string_key(plist, "DTXcode"),
        sdk_name: string_key(plist, "DTSDKName"),
        ..IosInfo::default()
    };

    if let Some(families) = plist.get("UIDeviceFamily").and_then(PlistValue::as_array) {
        ios.device_families = families
            .iter()
            .filter_map(PlistValue::as_int)
            .map(DeviceFamily::from)
            .collect();
    }

    ios.frameworks = scan_frameworks(entries);
    info!(
        "Info.plist projected: bundle={:?}, version={:?}, {} frameworks",
        ios.bundle_id,
        ios.version,
        ios.frameworks.len()
    );
    ios
}

/// Icon file-name hints, from the primary icon record and the legacy
/// top-level key.
pub fn icon_hints(plist: &PlistValue) -> Vec<String> {
    let mut hints = Vec::new();
    let primary = plist
        .get("CFBundleIcons")
        .and_then(|v| v.get("CFBundlePrimaryIcon"))
        .and_then(|v| v.get("CFBundleIconFiles"));
    for source in [primary, plist.get("CFBundleIconFiles")] {
        if let Some(files) = source.and_then(PlistValue::as_array) {
            for name in files.iter().filter_map(PlistValue::as_str) {
                if !hints.iter().any(|h| h == name) {
                    hints.push(name.to_string());
                }
            }
        }
    }
    hints
}

/// Framework bundle names under `Payload/<App>.app/Frameworks/`.
fn scan_frameworks(entries: &[String]) -> Vec<String> {
    let mut frameworks: Vec<String> = Vec::new();
    for entry in entries {
        let Some((_, rest)) = entry.split_once(".app/Frameworks/") else {
            continue;
        };
        if !entry.starts_with("Payload/") {
            continue;
        }
        if let Some(name) = rest.split('/').next() {
            if let Some(stem) = name.strip_suffix(".framework") {
                if !stem.is_empty() && !frameworks.iter().any(|f| f == stem) {
                    frameworks.push(stem.to_string());
                }
            }
        }
    }
    frameworks
}

/// Parse an `embedded.mobileprovision` CMS envelope into the provisioning
/// record, best effort.
pub fn provisioning(envelope: &[u8]) -> Result<ProvisioningInfo> {
    let region = slice_plist_region(envelope)?;
    let xml = String::from_utf8_lossy(region);
    let tree = xml_tree::parse(&xml)?;
    let plist = xml_tree::plist_value(&tree)?;

    let mut prov = ProvisioningInfo {
        name: string_key(&plist, "Name"),
        team_name: string_key(&plist, "TeamName"),
        app_id_name: string_key(&plist, "AppIDName"),
        xcode_managed: plist.get("IsXcodeManaged").and_then(PlistValue::as_bool),
        ..ProvisioningInfo::default()
    };
    prov.team_identifier = plist
        .get("TeamIdentifier")
        .and_then(PlistValue::as_array)
        .and_then(|ids| ids.first())
        .and_then(PlistValue::as_str)
        .map(str::to_string);
    prov.provisioned_device_count = plist
        .get("ProvisionedDevices")
        .and_then(PlistValue::as_array)
        .map(|devices| devices.len());
    prov.creation_date = date_key(&plist, "CreationDate");
    prov.expiration_date = date_key(&plist, "ExpirationDate");
    if let Some(entitlements) = plist.get("Entitlements").and_then(PlistValue::as_dict) {
        prov.entitlement_keys = entitlements.keys().cloned().collect();
    }

    debug!(
        "Provisioning profile: name={:?}, team={:?}, {} entitlement keys",
        prov.name,
        prov.team_name,
        prov.entitlement_keys.len()
    );
    Ok(prov)
}

/// Slice the XML plist region out of the CMS envelope by locating the
/// `<?xml` prologue and the matching `</plist>` close.
///
/// Substring slicing is deliberate for now; a stricter ASN.1 walk of the
/// signed content would slot in here without touching callers.
pub fn slice_plist_region(envelope: &[u8]) -> Result<&[u8]> {
    let start = find(envelope, b"<?xml").ok_or(ArtifactError::PlistRegionNotFound)?;
    let close = b"</plist>";
    let end = find(&envelope[start..], close)
        .map(|at| start + at + close.len())
        .ok_or(ArtifactError::PlistRegionNotFound)?;
    Ok(&envelope[start..end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn string_key(plist: &PlistValue, key: &str) -> Option<String> {
    plist.get(key).and_then(PlistValue::as_str).map(str::to_string)
}

fn date_key(plist: &PlistValue, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    match plist.get(key) {
        Some(PlistValue::Date(d)) => Some(*d),
        _ => None,
    }
}

/// A string array, tolerating a lone string in place of an array (seen in
/// hand-edited plists).
fn string_array(plist: &PlistValue, key: &str) -> Vec<String> {
    match plist.get(key) {
        Some(PlistValue::Array(items)) => items
            .iter()
            .filter_map(PlistValue::as_str)
            .map(str::to_string)
            .collect(),
        Some(other) => match other.as_str() {
            Some(s) => vec![s.to_string()],
            None => {
                warn!("Expected string array for {}, found {:?}", key, other);
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}
