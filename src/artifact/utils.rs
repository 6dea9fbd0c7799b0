//! Bounds-checked slice reading utilities shared by the binary decoders.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::error::{ArtifactError, Result};

/// Read a little-endian u16 at `pos`, or fail with an offset-carrying error.
pub fn read_u16_le(buf: &[u8], pos: usize) -> Result<u16> {
    slice(buf, pos, 2).map(LittleEndian::read_u16)
}

/// Read a little-endian u32 at `pos`.
pub fn read_u32_le(buf: &[u8], pos: usize) -> Result<u32> {
    slice(buf, pos, 4).map(LittleEndian::read_u32)
}

/// Read a little-endian i32 at `pos`.
pub fn read_i32_le(buf: &[u8], pos: usize) -> Result<i32> {
    slice(buf, pos, 4).map(LittleEndian::read_i32)
}

/// Read a big-endian u32 at `pos`.
pub fn read_u32_be(buf: &[u8], pos: usize) -> Result<u32> {
    slice(buf, pos, 4).map(BigEndian::read_u32)
}

/// Read a big-endian unsigned integer of `width` bytes (1..=8) at `pos`.
///
/// bplist offsets, object references and length extensions all use this
/// variable-width big-endian encoding.
pub fn read_uint_be(buf: &[u8], pos: usize, width: usize) -> Result<u64> {
    let bytes = slice(buf, pos, width)?;
    if width > 8 {
        return Err(ArtifactError::InvalidFormat(format!(
            "integer width {} exceeds 8 bytes",
            width
        )));
    }
    let mut value = 0u64;
    for &b in bytes {
        value = (value << 8) | u64::from(b);
    }
    Ok(value)
}

/// Borrow `len` bytes at `pos`, or fail without panicking.
pub fn slice(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    let end = pos.checked_add(len).ok_or_else(|| {
        ArtifactError::InvalidFormat("offset arithmetic overflow".to_string())
    })?;
    buf.get(pos..end).ok_or_else(|| {
        ArtifactError::InvalidFormat(format!(
            "read of {} bytes at offset {} overruns buffer of {} bytes",
            len,
            pos,
            buf.len()
        ))
    })
}
