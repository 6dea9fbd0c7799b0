//! Inspection of mobile application build artifacts.
//!
//! Reads Android APK and App Bundle (AAB) archives and iOS IPA archives,
//! decoding their compiled manifests without executing or unpacking any
//! code, and emits one normalized [`BuildInfo`] record per artifact.
//!
//! The format decoders are usable on their own:
//! - [`artifact::axml`]: Android chunked binary XML
//! - [`artifact::proto`]: protobuf wire reader and the AAPT2 proto-XML walker
//! - [`artifact::bplist`]: Apple binary property lists
//! - [`artifact::cgbi`]: Xcode-crushed PNG restoration
//!
//! ```no_run
//! use artifact_reader::ArtifactReader;
//!
//! let info = ArtifactReader::inspect_path("app-release.apk")?;
//! println!("{:?} {:?}", info.platform, info.android.map(|a| a.package));
//! # Ok::<(), artifact_reader::ArtifactError>(())
//! ```

pub mod artifact;

pub use artifact::error::{ArtifactError, Result};
pub use artifact::models::{
    ActivityInfo, AndroidInfo, BuildInfo, DeviceFamily, FeatureInfo, IconData, IosInfo, Platform,
    PlistValue, ProvisioningInfo, SigningInfo,
};
pub use artifact::store::{EntryStore, ZipEntryStore};
pub use artifact::ArtifactReader;
