//! Decoder for Apple binary property lists (`bplist00`).
//!
//! File layout:
//! ```text
//! [8 bytes]  magic "bplist00"
//! [objects]  marker-tagged objects, addressed via the offset table
//! [table]    numObjects big-endian offsets of offsetIntSize bytes each
//! [32 bytes] trailer: widths, object count, top object, table start
//! ```
//!
//! Objects reference each other by offset-table index. The decoder memoizes
//! per index, which both deduplicates shared subtrees and keeps a malformed
//! self-referencing file from recursing forever.

use chrono::DateTime;
use encoding_rs::UTF_16BE;
use log::{debug, warn};

use std::collections::{BTreeMap, HashMap, HashSet};

use super::error::{ArtifactError, Result};
use super::models::PlistValue;
use super::utils;

/// Seconds between the Unix epoch and Apple's 2001-01-01 reference date.
const APPLE_EPOCH_UNIX_SECS: f64 = 978_307_200.0;

/// Defense against adversarial object graphs.
const MAX_DEPTH: usize = 1024;

/// True when the buffer starts with the `bplist` magic.
pub fn sniff(buf: &[u8]) -> bool {
    buf.len() >= 6 && &buf[..6] == b"bplist"
}

/// Decode a complete binary plist into its top-level value.
pub fn parse(buf: &[u8]) -> Result<PlistValue> {
    if !sniff(buf) {
        return Err(ArtifactError::NotBplist);
    }
    if buf.len() < 40 {
        return Err(ArtifactError::TrailerTruncated { len: buf.len() });
    }

    // The trailer is the last 32 bytes.
    let trailer = buf.len() - 32;
    let offset_int_size = buf[trailer + 6] as usize;
    let object_ref_size = buf[trailer + 7] as usize;
    let num_objects = utils::read_uint_be(buf, trailer + 8, 8)?;
    let top_object = utils::read_uint_be(buf, trailer + 16, 8)?;
    let table_start = utils::read_uint_be(buf, trailer + 24, 8)? as usize;
    debug!(
        "bplist: {} objects, offset width {}, ref width {}, top {}",
        num_objects, offset_int_size, object_ref_size, top_object
    );

    if offset_int_size == 0 || offset_int_size > 8 || object_ref_size == 0 || object_ref_size > 8 {
        return Err(ArtifactError::InvalidFormat(format!(
            "bplist integer widths out of range: offset {}, ref {}",
            offset_int_size, object_ref_size
        )));
    }

    // The offset table has exactly numObjects absolute offsets and must fit
    // between the objects and the trailer.
    let table_len = (num_objects as usize).saturating_mul(offset_int_size);
    if table_start.saturating_add(table_len) > trailer {
        return Err(ArtifactError::TrailerTruncated { len: buf.len() });
    }

    let mut offsets = Vec::with_capacity(num_objects as usize);
    for i in 0..num_objects {
        let pos = table_start + (i as usize) * offset_int_size;
        let offset = utils::read_uint_be(buf, pos, offset_int_size)?;
        if offset as usize >= trailer {
            return Err(ArtifactError::OffsetOutOfRange {
                index: i,
                offset,
                len: buf.len(),
            });
        }
        offsets.push(offset as usize);
    }

    let mut decoder = Decoder {
        buf,
        offsets,
        object_ref_size,
        memo: HashMap::new(),
        visiting: HashSet::new(),
    };
    decoder.object(top_object, 0)
}

struct Decoder<'a> {
    buf: &'a [u8],
    offsets: Vec<usize>,
    object_ref_size: usize,
    memo: HashMap<u64, PlistValue>,
    visiting: HashSet<u64>,
}

impl<'a> Decoder<'a> {
    /// Resolve the object at a table index. Re-entering an already-resolved
    /// index returns the memoized value without re-descending.
    fn object(&mut self, index: u64, depth: usize) -> Result<PlistValue> {
        if let Some(value) = self.memo.get(&index) {
            return Ok(value.clone());
        }
        if !self.visiting.insert(index) {
            return Err(ArtifactError::InvalidFormat(format!(
                "bplist object {} references itself",
                index
            )));
        }
        if depth > MAX_DEPTH {
            self.visiting.remove(&index);
            return Err(ArtifactError::RecursionLimit(MAX_DEPTH));
        }

        let result = self.decode_at(index, depth);
        self.visiting.remove(&index);
        let value = result?;
        self.memo.insert(index, value.clone());
        Ok(value)
    }

    fn decode_at(&mut self, index: u64, depth: usize) -> Result<PlistValue> {
        let offset = *self
            .offsets
            .get(index as usize)
            .ok_or(ArtifactError::OffsetOutOfRange {
                index,
                offset: 0,
                len: self.buf.len(),
            })?;
        let marker = *utils::slice(self.buf, offset, 1)?
            .first()
            .unwrap_or(&0);
        let hi = marker >> 4;
        let info = marker & 0x0f;

        match hi {
            0x0 => Ok(match info {
                0x8 => PlistValue::Bool(false),
                0x9 => PlistValue::Bool(true),
                _ => PlistValue::Null,
            }),
            0x1 => {
                let byte_count = 1usize << info;
                if byte_count > 8 {
                    return Err(ArtifactError::InvalidFormat(format!(
                        "bplist integer of {} bytes",
                        byte_count
                    )));
                }
                let raw = utils::read_uint_be(self.buf, offset + 1, byte_count)?;
                Ok(PlistValue::Int(raw as i64))
            }
            0x2 => {
                let byte_count = 1usize << info;
                let real = match byte_count {
                    4 => f64::from(f32::from_bits(
                        utils::read_u32_be(self.buf, offset + 1)?,
                    )),
                    8 => f64::from_bits(utils::read_uint_be(self.buf, offset + 1, 8)?),
                    other => {
                        return Err(ArtifactError::InvalidFormat(format!(
                            "bplist real of {} bytes",
                            other
                        )))
                    }
                };
                Ok(PlistValue::Real(real))
            }
            0x3 => {
                let secs = f64::from_bits(utils::read_uint_be(self.buf, offset + 1, 8)?);
                let millis = ((APPLE_EPOCH_UNIX_SECS + secs) * 1000.0) as i64;
                let date = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                    ArtifactError::InvalidFormat(format!("bplist date out of range: {}", secs))
                })?;
                Ok(PlistValue::Date(date))
            }
            0x4 => {
                let (count, header_len) = self.count(offset, info)?;
                let bytes = utils::slice(self.buf, offset + header_len, count)?;
                Ok(PlistValue::Data(bytes.to_vec()))
            }
            0x5 => {
                let (count, header_len) = self.count(offset, info)?;
                let bytes = utils::slice(self.buf, offset + header_len, count)?;
                Ok(PlistValue::Ascii(
                    String::from_utf8_lossy(bytes).into_owned(),
                ))
            }
            0x6 => {
                let (count, header_len) = self.count(offset, info)?;
                let bytes = utils::slice(self.buf, offset + header_len, count * 2)?;
                let (text, _, _) = UTF_16BE.decode(bytes);
                Ok(PlistValue::Unicode(text.into_owned()))
            }
            0x8 => {
                let byte_count = info as usize + 1;
                let raw = utils::read_uint_be(self.buf, offset + 1, byte_count.min(8))?;
                Ok(PlistValue::Uid(raw))
            }
            0xa | 0xc => {
                let (count, header_len) = self.count(offset, info)?;
                let mut items = Vec::with_capacity(count);
                for i in 0..count {
                    let reference = self.object_ref(offset + header_len, i)?;
                    items.push(self.object(reference, depth + 1)?);
                }
                Ok(if hi == 0xa {
                    PlistValue::Array(items)
                } else {
                    PlistValue::Set(items)
                })
            }
            0xd => {
                let (count, header_len) = self.count(offset, info)?;
                let mut dict = BTreeMap::new();
                for i in 0..count {
                    let key_ref = self.object_ref(offset + header_len, i)?;
                    let value_ref = self.object_ref(offset + header_len, count + i)?;
                    let key = self.object(key_ref, depth + 1)?;
                    let value = self.object(value_ref, depth + 1)?;
                    match key.as_str() {
                        Some(k) => {
                            dict.insert(k.to_string(), value);
                        }
                        None => {
                            warn!("Skipping non-string bplist dict key {:?}", key);
                        }
                    }
                }
                Ok(PlistValue::Dict(dict))
            }
            other => {
                warn!("Unknown bplist marker type {:#x} at offset {}", other, offset);
                Ok(PlistValue::Null)
            }
        }
    }

    /// Element count for a container/blob marker.
    ///
    /// Info 0x0f means the real count follows as an int-marked big-endian
    /// length; anything else is the count itself.
    fn count(&self, offset: usize, info: u8) -> Result<(usize, usize)> {
        if info != 0x0f {
            return Ok((info as usize, 1));
        }
        let int_marker = *utils::slice(self.buf, offset + 1, 1)?
            .first()
            .unwrap_or(&0);
        if int_marker >> 4 != 0x1 {
            return Err(ArtifactError::InvalidFormat(format!(
                "bplist count extension has non-integer marker {:#04x}",
                int_marker
            )));
        }
        let byte_count = 1usize << (int_marker & 0x0f);
        if byte_count > 8 {
            return Err(ArtifactError::InvalidFormat(format!(
                "bplist count of {} bytes",
                byte_count
            )));
        }
        let count = utils::read_uint_be(self.buf, offset + 2, byte_count)? as usize;
        Ok((count, 2 + byte_count))
    }

    /// The i-th object reference in a container body.
    fn object_ref(&self, base: usize, i: usize) -> Result<u64> {
        utils::read_uint_be(self.buf, base + i * self.object_ref_size, self.object_ref_size)
    }
}
