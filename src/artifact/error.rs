//! Custom error types for the artifact-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file extension is not one of .apk, .aab or .ipa.
    #[error("Unsupported file extension: {0:?}. Expected .apk, .aab or .ipa.")]
    UnsupportedExtension(String),

    /// The file could not be opened as a ZIP archive.
    #[error("Not a ZIP archive: {0}")]
    NotAnArchive(String),

    /// The archive has no manifest entry at the expected path.
    #[error("Missing manifest entry: {0}")]
    MissingManifest(String),

    /// A named entry exists but its payload could not be decompressed.
    #[error("Failed to decompress archive entry {path:?}: {reason}")]
    EntryDecompression { path: String, reason: String },

    /// A requested entry is not present in the archive.
    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),

    /// The buffer does not start with the binary-XML chunk type.
    #[error("Not a binary XML document: leading chunk type {found:#06x}, expected 0x0003")]
    NotAxml { found: u16 },

    /// The AXML string pool chunk ends before its declared contents.
    #[error("Binary XML string pool truncated at offset {offset}")]
    StringPoolTruncated { offset: usize },

    /// The buffer does not start with the "bplist" magic.
    #[error("Not a binary property list (missing bplist magic)")]
    NotBplist,

    /// The bplist is too short to hold its 32-byte trailer.
    #[error("Binary plist trailer truncated: file is {len} bytes")]
    TrailerTruncated { len: usize },

    /// An offset-table entry or object reference points outside the file.
    #[error("Binary plist offset out of range: object {index} at offset {offset} (file is {len} bytes)")]
    OffsetOutOfRange { index: u64, offset: u64, len: usize },

    /// The PNG uses a bit depth or color type the restorer does not handle.
    #[error("Unsupported PNG format: {0}")]
    UnsupportedImage(String),

    /// The raw-deflate stream inside the CgBI PNG failed to inflate.
    #[error("IDAT inflate failed: {0}")]
    InflateFailure(String),

    /// The PNG ends before a required chunk or payload.
    #[error("Truncated PNG: {0}")]
    PngTruncated(&'static str),

    /// No XML plist region was found inside the provisioning envelope.
    #[error("No <?xml ... </plist> region found in provisioning profile")]
    PlistRegionNotFound,

    /// An object or element graph exceeded the recursion cap.
    #[error("Recursion limit ({0}) exceeded while decoding")]
    RecursionLimit(usize),

    /// The file is structurally invalid for its declared format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// A convenience `Result` type alias using the crate's `ArtifactError` type.
pub type Result<T> = std::result::Result<T, ArtifactError>;
