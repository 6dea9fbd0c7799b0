//! Restorer for Xcode's "crushed" CgBI PNGs.
//!
//! Xcode's pngcrush variant strips the zlib wrapper from the IDAT stream,
//! stores pixels as BGRA, and premultiplies alpha. Restoration reverses all
//! three: raw-deflate the IDAT payload, invert the per-scanline PNG filters,
//! then swap channels and un-premultiply. Ordinary PNGs (no `CgBI` chunk)
//! pass through untouched.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};
use flate2::read::DeflateDecoder;
use log::{debug, trace};

use super::error::{ArtifactError, Result};
use super::models::IconData;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

const COLOR_TYPE_RGB: u8 = 2;
const COLOR_TYPE_RGBA: u8 = 6;

const FILTER_NONE: u8 = 0;
const FILTER_SUB: u8 = 1;
const FILTER_UP: u8 = 2;
const FILTER_AVERAGE: u8 = 3;
const FILTER_PAETH: u8 = 4;

struct Ihdr {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
}

/// Restore an icon payload.
///
/// Non-PNG bytes and PNGs without a `CgBI` chunk are returned unchanged;
/// a crushed PNG comes back as its raw RGBA plane.
pub fn restore(bytes: &[u8]) -> Result<IconData> {
    if bytes.len() < 8 || bytes[..8] != PNG_SIGNATURE {
        return Ok(IconData::Png(bytes.to_vec()));
    }

    let mut has_cgbi = false;
    let mut ihdr: Option<Ihdr> = None;
    let mut idat: Vec<u8> = Vec::new();

    // Chunk walk: {length, type, data, crc} records from offset 8 to IEND.
    let mut pos = 8;
    while pos + 8 <= bytes.len() {
        let length = BigEndian::read_u32(&bytes[pos..]) as usize;
        let chunk_type: [u8; 4] = [
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ];
        let data_start = pos + 8;
        if data_start + length > bytes.len() {
            break;
        }
        let data = &bytes[data_start..data_start + length];

        match &chunk_type {
            b"CgBI" => has_cgbi = true,
            b"IHDR" if length >= 13 => {
                ihdr = Some(Ihdr {
                    width: BigEndian::read_u32(data),
                    height: BigEndian::read_u32(&data[4..]),
                    bit_depth: data[8],
                    color_type: data[9],
                });
            }
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => break,
            other => trace!(
                "Skipping PNG chunk {}",
                String::from_utf8_lossy(&other[..])
            ),
        }

        pos = data_start + length + 4;
    }

    if !has_cgbi {
        return Ok(IconData::Png(bytes.to_vec()));
    }

    let ihdr = ihdr.ok_or(ArtifactError::PngTruncated("IHDR chunk missing"))?;
    if ihdr.bit_depth != 8
        || (ihdr.color_type != COLOR_TYPE_RGB && ihdr.color_type != COLOR_TYPE_RGBA)
    {
        return Err(ArtifactError::UnsupportedImage(format!(
            "bit depth {}, color type {}",
            ihdr.bit_depth, ihdr.color_type
        )));
    }
    if idat.is_empty() {
        return Err(ArtifactError::PngTruncated("no IDAT payload"));
    }
    debug!(
        "CgBI PNG {}x{}, color type {}, {} compressed bytes",
        ihdr.width,
        ihdr.height,
        ihdr.color_type,
        idat.len()
    );

    // CgBI IDAT is raw deflate: no zlib header, no checksum.
    let mut raw = Vec::new();
    DeflateDecoder::new(idat.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| ArtifactError::InflateFailure(e.to_string()))?;

    let bpp = if ihdr.color_type == COLOR_TYPE_RGBA { 4 } else { 3 };
    let scanlines = unfilter(&raw, ihdr.width as usize, ihdr.height as usize, bpp)?;
    let pixels = to_rgba(&scanlines, ihdr.width as usize, ihdr.height as usize, bpp);

    Ok(IconData::Rgba {
        width: ihdr.width,
        height: ihdr.height,
        pixels,
    })
}

/// Invert the per-scanline PNG filters in place over a fresh buffer.
///
/// Each input row is `1 + width*bpp` bytes: the filter selector, then the
/// filtered bytes.
fn unfilter(raw: &[u8], width: usize, height: usize, bpp: usize) -> Result<Vec<u8>> {
    let row_len = width * bpp;
    let stride = 1 + row_len;
    if raw.len() < stride * height {
        return Err(ArtifactError::PngTruncated("IDAT inflates short of the pixel data"));
    }

    let mut out = vec![0u8; row_len * height];
    for y in 0..height {
        let filter = raw[y * stride];
        let row_in = &raw[y * stride + 1..y * stride + stride];
        for i in 0..row_len {
            let a = if i >= bpp { out[y * row_len + i - bpp] } else { 0 };
            let b = if y > 0 { out[(y - 1) * row_len + i] } else { 0 };
            let c = if y > 0 && i >= bpp {
                out[(y - 1) * row_len + i - bpp]
            } else {
                0
            };
            let value = match filter {
                FILTER_NONE => row_in[i],
                FILTER_SUB => row_in[i].wrapping_add(a),
                FILTER_UP => row_in[i].wrapping_add(b),
                FILTER_AVERAGE => {
                    row_in[i].wrapping_add(((u16::from(a) + u16::from(b)) >> 1) as u8)
                }
                FILTER_PAETH => row_in[i].wrapping_add(paeth(a, b, c)),
                other => {
                    return Err(ArtifactError::InvalidFormat(format!(
                        "unknown PNG filter {} on row {}",
                        other, y
                    )))
                }
            };
            out[y * row_len + i] = value;
        }
    }
    Ok(out)
}

/// The Paeth predictor: whichever of left/up/up-left is closest to
/// `a + b - c`, ties breaking left, then up, then up-left.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let pa = (p - i32::from(a)).abs();
    let pb = (p - i32::from(b)).abs();
    let pc = (p - i32::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Swap BGRA to RGBA and un-premultiply alpha.
///
/// Rounding is half away from zero, computed as `(c * 255 + a / 2) / a`.
fn to_rgba(scanlines: &[u8], width: usize, height: usize, bpp: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let at = (y * width + x) * bpp;
            let (b, g, r) = (scanlines[at], scanlines[at + 1], scanlines[at + 2]);
            if bpp == 3 {
                pixels.extend_from_slice(&[r, g, b, 0xff]);
                continue;
            }
            let a = scanlines[at + 3];
            match a {
                0 => pixels.extend_from_slice(&[0, 0, 0, 0]),
                255 => pixels.extend_from_slice(&[r, g, b, a]),
                _ => pixels.extend_from_slice(&[
                    unpremultiply(r, a),
                    unpremultiply(g, a),
                    unpremultiply(b, a),
                    a,
                ]),
            }
        }
    }
    pixels
}

fn unpremultiply(c: u8, a: u8) -> u8 {
    let (c, a) = (u32::from(c), u32::from(a));
    ((c * 255 + a / 2) / a).min(255) as u8
}
