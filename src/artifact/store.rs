//! Archive entry access behind a trait, with a ZIP-backed implementation.

use std::io::{Read, Seek};

use log::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::{ArtifactError, Result};

/// Read access to the entries of an opened artifact.
///
/// Paths use forward slashes and match case-sensitively unless a caller
/// states otherwise. Implementations own whatever handle is needed to
/// decompress entries on demand.
pub trait EntryStore {
    /// All entry paths, in archive order.
    fn list(&mut self) -> Result<Vec<String>>;

    /// The fully decompressed payload of one entry.
    fn open(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// An `EntryStore` over any seekable ZIP source.
pub struct ZipEntryStore<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipEntryStore<R> {
    /// Open the source as a ZIP archive.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| ArtifactError::NotAnArchive(e.to_string()))?;
        debug!("Opened archive with {} entries", archive.len());
        Ok(ZipEntryStore { archive })
    }

    /// The number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }
}

impl<R: Read + Seek> EntryStore for ZipEntryStore<R> {
    fn list(&mut self) -> Result<Vec<String>> {
        // Walk by index: `file_names()` iterates a hash map, and callers
        // depend on central-directory order (architecture and module lists
        // preserve discovery order).
        let mut names = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index).map_err(|e| {
                ArtifactError::NotAnArchive(format!("entry {}: {}", index, e))
            })?;
            names.push(entry.name().to_string());
        }
        Ok(names)
    }

    fn open(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut entry = match self.archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ArtifactError::EntryNotFound(path.to_string()))
            }
            Err(e) => {
                return Err(ArtifactError::EntryDecompression {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArtifactError::EntryDecompression {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(data)
    }
}
