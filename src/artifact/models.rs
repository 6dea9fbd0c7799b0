//! Data structures for the normalized build record and the plist value tree.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// The artifact platform, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Apk,
    Aab,
    Ipa,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Apk => f.write_str("APK"),
            Platform::Aab => f.write_str("AAB"),
            Platform::Ipa => f.write_str("IPA"),
        }
    }
}

/// A dynamically typed property-list value.
///
/// Produced by the binary plist decoder and by the textual plist reader.
/// Dict keys are stored as strings; in practice they are always the
/// `Ascii`/`Unicode` variants in the source data.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Data(Vec<u8>),
    Ascii(String),
    Unicode(String),
    Date(DateTime<Utc>),
    Uid(u64),
    Array(Vec<PlistValue>),
    Set(Vec<PlistValue>),
    Dict(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    /// The text payload of either string variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::Ascii(s) | PlistValue::Unicode(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PlistValue::Int(v) => Some(*v),
            PlistValue::Real(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, PlistValue>> {
        match self {
            PlistValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Dict lookup that tolerates a non-dict receiver.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dict().and_then(|d| d.get(key))
    }
}

/// An Apple device family from `UIDeviceFamily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    IPhone,
    IPad,
    AppleTv,
    AppleWatch,
    Unknown(i64),
}

impl From<i64> for DeviceFamily {
    fn from(n: i64) -> Self {
        match n {
            1 => DeviceFamily::IPhone,
            2 => DeviceFamily::IPad,
            3 => DeviceFamily::AppleTv,
            4 => DeviceFamily::AppleWatch,
            other => DeviceFamily::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::IPhone => f.write_str("iPhone"),
            DeviceFamily::IPad => f.write_str("iPad"),
            DeviceFamily::AppleTv => f.write_str("Apple TV"),
            DeviceFamily::AppleWatch => f.write_str("Apple Watch"),
            DeviceFamily::Unknown(n) => write!(f, "Unknown({})", n),
        }
    }
}

/// One declared activity, with the launcher flag from its intent filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityInfo {
    pub name: String,
    pub is_launcher: bool,
}

/// One declared `uses-feature` requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub name: String,
    pub required: bool,
}

/// JAR-signing entries found under `META-INF/`.
#[derive(Debug, Clone, Default)]
pub struct SigningInfo {
    /// True when a `*.RSA`/`*.DSA`/`*.EC` signature block is present.
    pub signed: bool,
    /// The signature-related entry names (`.RSA`, `.DSA`, `.EC`, `.SF`, `.MF`).
    pub entries: Vec<String>,
}

/// Fields projected from an Android manifest plus archive-level scans.
#[derive(Debug, Clone, Default)]
pub struct AndroidInfo {
    pub package: Option<String>,
    pub version_name: Option<String>,
    pub version_code: Option<String>,
    pub min_sdk: Option<String>,
    pub target_sdk: Option<String>,
    pub compile_sdk: Option<String>,
    pub platform_build_version_name: Option<String>,
    pub label: Option<String>,
    pub debuggable: bool,
    pub permissions: Vec<String>,
    pub activities: Vec<ActivityInfo>,
    pub services: Vec<String>,
    pub receivers: Vec<String>,
    pub features: Vec<FeatureInfo>,
    pub architectures: Vec<String>,
    pub dex_count: usize,
    /// AAB module directory names; `base` sorts first.
    pub modules: Vec<String>,
    pub signing: SigningInfo,
}

/// Fields projected from an embedded provisioning profile.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningInfo {
    pub name: Option<String>,
    pub team_name: Option<String>,
    pub team_identifier: Option<String>,
    pub app_id_name: Option<String>,
    pub xcode_managed: Option<bool>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub provisioned_device_count: Option<usize>,
    pub entitlement_keys: Vec<String>,
}

/// Fields projected from an IPA's `Info.plist` plus archive-level scans.
#[derive(Debug, Clone, Default)]
pub struct IosInfo {
    pub bundle_id: Option<String>,
    pub app_name: Option<String>,
    pub display_name: Option<String>,
    pub executable: Option<String>,
    pub version: Option<String>,
    pub build_number: Option<String>,
    pub min_os_version: Option<String>,
    pub device_families: Vec<DeviceFamily>,
    pub supported_platforms: Vec<String>,
    pub required_capabilities: Vec<String>,
    pub background_modes: Vec<String>,
    pub frameworks: Vec<String>,
    pub xcode_version: Option<String>,
    pub sdk_name: Option<String>,
    pub provisioning: Option<ProvisioningInfo>,
}

/// The launcher icon, either as a displayable container or as the raw RGBA
/// plane recovered from a CgBI-crushed PNG. Turning the RGBA plane back into
/// an image container is the presentation layer's job.
#[derive(Debug, Clone, PartialEq)]
pub enum IconData {
    /// Standard PNG bytes, passed through unchanged.
    Png(Vec<u8>),
    /// Restored pixels: `width * height * 4` RGBA bytes, alpha not
    /// premultiplied.
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// The normalized record emitted for any supported artifact.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub platform: Platform,
    pub file_name: String,
    pub file_size: u64,
    pub entry_count: usize,
    pub android: Option<AndroidInfo>,
    pub ios: Option<IosInfo>,
    pub icon_path: Option<String>,
    pub icon: Option<IconData>,
    /// Set when manifest projection failed; archive-level fields are still
    /// populated.
    pub manifest_error: Option<String>,
}

impl BuildInfo {
    pub fn new(platform: Platform, file_name: impl Into<String>, file_size: u64) -> Self {
        BuildInfo {
            platform,
            file_name: file_name.into(),
            file_size,
            entry_count: 0,
            android: None,
            ios: None,
            icon_path: None,
            icon: None,
            manifest_error: None,
        }
    }
}
