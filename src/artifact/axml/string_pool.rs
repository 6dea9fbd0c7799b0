//! The AXML string pool: an indexed array of UTF-8 or UTF-16LE strings.

use encoding_rs::UTF_16LE;
use log::{trace, warn};

use crate::artifact::error::{ArtifactError, Result};
use crate::artifact::utils;

/// Flag bit selecting UTF-8 string encoding (UTF-16LE otherwise).
const FLAG_UTF8: u32 = 1 << 8;

/// The decoded string pool of a binary XML document.
///
/// Indices out of range resolve to `None`; callers degrade rather than fail.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    /// Parse a `STRING_POOL` chunk spanning `chunk[..chunk_size]`.
    ///
    /// Chunk layout after the 8-byte chunk header:
    /// ```text
    /// [u32] string count
    /// [u32] style count
    /// [u32] flags          (bit 8: UTF-8)
    /// [u32] strings start  (relative to chunk start)
    /// [u32] styles start
    /// [u32 * count] string offsets (relative to strings start)
    /// ```
    pub fn parse(chunk: &[u8], chunk_size: usize) -> Result<Self> {
        let string_count = utils::read_u32_le(chunk, 8)? as usize;
        let flags = utils::read_u32_le(chunk, 16)?;
        let strings_start = utils::read_u32_le(chunk, 20)? as usize;
        let is_utf8 = flags & FLAG_UTF8 != 0;
        trace!(
            "String pool: {} strings, {} encoding, data at {}",
            string_count,
            if is_utf8 { "UTF-8" } else { "UTF-16LE" },
            strings_start
        );

        if strings_start > chunk_size || strings_start > chunk.len() {
            return Err(ArtifactError::StringPoolTruncated {
                offset: strings_start,
            });
        }

        let mut strings = Vec::with_capacity(string_count);
        for i in 0..string_count {
            let offset = utils::read_u32_le(chunk, 28 + i * 4).map_err(|_| {
                ArtifactError::StringPoolTruncated { offset: 28 + i * 4 }
            })? as usize;
            let pos = strings_start + offset;
            match decode_string(chunk, pos, is_utf8) {
                Ok(s) => strings.push(s),
                Err(_) => {
                    // Tolerate individual bad offsets; an empty slot keeps
                    // later indices aligned.
                    warn!("String pool entry {} unreadable at offset {}", i, pos);
                    strings.push(String::new());
                }
            }
        }

        Ok(StringPool { strings })
    }

    /// The string at `index`, or `None` when out of range.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Decode one pooled string at `pos`.
///
/// Both encodings prefix the payload with an idiosyncratic length encoding
/// whose high bit selects a wide two-unit form.
fn decode_string(chunk: &[u8], pos: usize, is_utf8: bool) -> Result<String> {
    if is_utf8 {
        // UTF-16 length first (only used for buffer sizing; discarded).
        let (_, p) = read_utf8_len(chunk, pos)?;
        let (byte_len, p) = read_utf8_len(chunk, p)?;
        let bytes = utils::slice(chunk, p, byte_len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    } else {
        let (unit_len, p) = read_utf16_len(chunk, pos)?;
        let bytes = utils::slice(chunk, p, unit_len * 2)?;
        let (text, _, _) = UTF_16LE.decode(bytes);
        Ok(text.into_owned())
    }
}

/// One- or two-byte length: high bit of the first byte selects the two-byte
/// form `((b0 & 0x7f) << 8) | b1`.
fn read_utf8_len(chunk: &[u8], pos: usize) -> Result<(usize, usize)> {
    let b0 = *utils::slice(chunk, pos, 1)?.first().unwrap_or(&0);
    if b0 & 0x80 != 0 {
        let b1 = *utils::slice(chunk, pos + 1, 1)?.first().unwrap_or(&0);
        Ok((((b0 as usize & 0x7f) << 8) | b1 as usize, pos + 2))
    } else {
        Ok((b0 as usize, pos + 1))
    }
}

/// One- or two-word length: high bit of the first word selects the two-word
/// form `((w0 & 0x7fff) << 16) | w1`.
fn read_utf16_len(chunk: &[u8], pos: usize) -> Result<(usize, usize)> {
    let w0 = utils::read_u16_le(chunk, pos)?;
    if w0 & 0x8000 != 0 {
        let w1 = utils::read_u16_le(chunk, pos + 2)?;
        Ok((
            ((w0 as usize & 0x7fff) << 16) | w1 as usize,
            pos + 4,
        ))
    } else {
        Ok((w0 as usize, pos + 2))
    }
}
