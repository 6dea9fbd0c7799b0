//! Core artifact inspection module.
//!
//! One inspection is a strictly sequential pipeline over an opened archive:
//!
//! ```text
//! ┌──────────────┐
//! │  EntryStore  │ ← store::ZipEntryStore (or any EntryStore impl)
//! ├──────────────┤
//! │  Manifest    │ ← axml::parse / proto::xml::parse / bplist::parse
//! ├──────────────┤
//! │  Projection  │ ← android::project / ios::project
//! ├──────────────┤
//! │  Icon        │ ← icon::resolve_* → cgbi::restore (best effort)
//! └──────────────┘
//! ```
//!
//! Manifest, icon and provisioning failures degrade independently; only an
//! unsupported extension or a non-archive input is fatal.

pub mod android;
pub mod axml;
pub mod bplist;
pub mod cgbi;
pub mod element;
pub mod error;
pub mod icon;
pub mod ios;
pub mod models;
pub mod proto;
pub mod store;
pub mod utils;
pub mod xml_tree;

use std::fs::File;
use std::path::Path;

use log::{info, warn};

use element::Element;
use error::{ArtifactError, Result};
use models::{BuildInfo, Platform, PlistValue};
use store::{EntryStore, ZipEntryStore};

/// The entry point for inspecting mobile build artifacts.
///
/// Parses APK, AAB and IPA archives into a normalized [`BuildInfo`] record
/// without executing or unpacking their code. All state is scoped to one
/// call; nothing is shared between inspections.
pub struct ArtifactReader;

impl ArtifactReader {
    /// Inspect an artifact on disk. The platform comes from the extension.
    ///
    /// # Errors
    /// Fails fast only for an unsupported extension or a file that is not a
    /// ZIP archive. Manifest, icon and provisioning problems are recorded on
    /// the returned record instead.
    pub fn inspect_path(path: impl AsRef<Path>) -> Result<BuildInfo> {
        let path = path.as_ref();
        let platform = platform_for(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        info!("Inspecting {} ({}, {} bytes)", file_name, platform, file_size);

        let mut store = ZipEntryStore::new(file)?;
        Self::inspect(&mut store, platform, &file_name, file_size)
    }

    /// Inspect an already-opened entry store.
    pub fn inspect(
        store: &mut dyn EntryStore,
        platform: Platform,
        file_name: &str,
        file_size: u64,
    ) -> Result<BuildInfo> {
        let entries = store.list()?;
        let mut build = BuildInfo::new(platform, file_name, file_size);
        build.entry_count = entries.len();

        match platform {
            Platform::Apk | Platform::Aab => {
                inspect_android(store, &entries, platform, &mut build)
            }
            Platform::Ipa => inspect_ios(store, &entries, &mut build),
        }

        Ok(build)
    }
}

/// Map the file extension to a platform, ASCII case-insensitively.
fn platform_for(path: &Path) -> Result<Platform> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "apk" => Ok(Platform::Apk),
        "aab" => Ok(Platform::Aab),
        "ipa" => Ok(Platform::Ipa),
        other => Err(ArtifactError::UnsupportedExtension(other.to_string())),
    }
}

fn inspect_android(
    store: &mut dyn EntryStore,
    entries: &[String],
    platform: Platform,
    build: &mut BuildInfo,
) {
    let manifest_path = match platform {
        Platform::Aab => "base/manifest/AndroidManifest.xml",
        _ => "AndroidManifest.xml",
    };

    let mut icon_attr = None;
    match load_android_manifest(store, manifest_path, platform) {
        Ok(root) => {
            icon_attr = android::icon_attr(&root);
            build.android = Some(android::project(&root, entries, platform));
        }
        Err(e) => {
            // Archive-level facts survive a broken manifest.
            warn!("Manifest projection failed: {}", e);
            build.manifest_error = Some(e.to_string());
            build.android = Some(android::scan_archive(entries, platform));
        }
    }

    if let Some((path, data)) =
        icon::resolve_android(store, entries, icon_attr.as_deref(), platform)
    {
        build.icon_path = Some(path);
        build.icon = Some(data);
    }
}

/// Read and decode the Android manifest entry.
///
/// APK manifests are always binary XML. AAB manifests are sniffed: a
/// leading 0x0003 chunk type means binary XML, anything else is tried as
/// proto-XML first with binary XML as the fallback.
fn load_android_manifest(
    store: &mut dyn EntryStore,
    path: &str,
    platform: Platform,
) -> Result<Element> {
    let bytes = store.open(path).map_err(|e| match e {
        ArtifactError::EntryNotFound(p) => ArtifactError::MissingManifest(p),
        other => other,
    })?;

    if platform == Platform::Apk || axml::sniff(&bytes) {
        return axml::parse(&bytes);
    }
    match proto::xml::parse(&bytes) {
        Ok(Some(root)) => Ok(root),
        Ok(None) => axml::parse(&bytes),
        Err(e) => {
            warn!("Proto manifest walk failed ({}), retrying as binary XML", e);
            axml::parse(&bytes)
        }
    }
}

fn inspect_ios(store: &mut dyn EntryStore, entries: &[String], build: &mut BuildInfo) {
    let plist = match load_info_plist(store, entries) {
        Ok(plist) => plist,
        Err(e) => {
            warn!("Info.plist projection failed: {}", e);
            build.manifest_error = Some(e.to_string());
            // Frameworks are scanned from the entry list alone.
            build.ios = Some(ios::project(&PlistValue::Dict(Default::default()), entries));
            return;
        }
    };

    let mut info = ios::project(&plist, entries);
    info.provisioning = load_provisioning(store, entries);
    build.ios = Some(info);

    let hints = ios::icon_hints(&plist);
    if let Some((path, data)) = icon::resolve_ios(store, entries, &hints) {
        build.icon_path = Some(path);
        build.icon = Some(data);
    }
}

/// Locate and decode `Payload/<App>.app/Info.plist`, binary or textual.
fn load_info_plist(store: &mut dyn EntryStore, entries: &[String]) -> Result<PlistValue> {
    let path = entries
        .iter()
        .find(|e| {
            e.starts_with("Payload/")
                && e.ends_with(".app/Info.plist")
                && e.matches('/').count() == 2
        })
        .cloned()
        .ok_or_else(|| ArtifactError::MissingManifest("Payload/*.app/Info.plist".into()))?;
    let bytes = store.open(&path)?;

    if bplist::sniff(&bytes) {
        return bplist::parse(&bytes);
    }
    let text = String::from_utf8_lossy(&bytes);
    if text.contains("<plist") {
        let tree = xml_tree::parse(&text)?;
        return xml_tree::plist_value(&tree);
    }
    Err(ArtifactError::InvalidFormat(format!(
        "{} is neither a binary nor an XML plist",
        path
    )))
}

/// Best-effort read of the embedded provisioning profile.
fn load_provisioning(
    store: &mut dyn EntryStore,
    entries: &[String],
) -> Option<models::ProvisioningInfo> {
    let path = entries
        .iter()
        .find(|e| e.starts_with("Payload/") && e.ends_with(".app/embedded.mobileprovision"))?;
    let envelope = match store.open(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Provisioning profile unreadable: {}", e);
            return None;
        }
    };
    match ios::provisioning(&envelope) {
        Ok(prov) => Some(prov),
        Err(e) => {
            warn!("Provisioning profile unparsable: {}", e);
            None
        }
    }
}
