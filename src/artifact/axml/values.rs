//! Typed attribute value resolution for compiled resources.

use crate::artifact::element::AttrValue;

use super::string_pool::StringPool;

pub const TYPE_NULL: u8 = 0x00;
pub const TYPE_REFERENCE: u8 = 0x01;
pub const TYPE_ATTRIBUTE: u8 = 0x02;
pub const TYPE_STRING: u8 = 0x03;
pub const TYPE_FLOAT: u8 = 0x04;
pub const TYPE_DIMENSION: u8 = 0x05;
pub const TYPE_FRACTION: u8 = 0x06;
pub const TYPE_INT_DEC: u8 = 0x10;
pub const TYPE_INT_HEX: u8 = 0x11;
pub const TYPE_INT_BOOLEAN: u8 = 0x12;

/// Map a binary type tag and its 32-bit data word to a typed value.
///
/// String indices out of pool range yield `Null` rather than failing.
/// Tags outside the known set keep their raw data word.
pub fn resolve_value(type_tag: u8, data: u32, pool: &StringPool) -> AttrValue {
    match type_tag {
        TYPE_NULL => AttrValue::Null,
        TYPE_REFERENCE => AttrValue::Reference(data),
        TYPE_ATTRIBUTE => AttrValue::AttributeRef(data),
        TYPE_STRING => match pool.get(data) {
            Some(s) => AttrValue::String(s.to_string()),
            None => AttrValue::Null,
        },
        TYPE_FLOAT => AttrValue::Float(f32::from_bits(data)),
        TYPE_DIMENSION => AttrValue::Dimension(AttrValue::complex_value(data), (data & 0x0f) as u8),
        TYPE_FRACTION => AttrValue::Fraction(AttrValue::complex_value(data), (data & 0x0f) as u8),
        TYPE_INT_DEC => AttrValue::IntDec(data as i32),
        TYPE_INT_HEX => AttrValue::IntHex(data),
        TYPE_INT_BOOLEAN => AttrValue::Bool(data != 0),
        _ => AttrValue::RawResource(data),
    }
}

/// Attribute names for the framework resource ids the manifest projection
/// cares about. AAPT occasionally emits attributes whose pooled name string
/// is empty and which are addressed purely through the resource map.
pub fn system_attr_name(resource_id: u32) -> Option<&'static str> {
    match resource_id {
        0x0101_0000 => Some("theme"),
        0x0101_0001 => Some("label"),
        0x0101_0002 => Some("icon"),
        0x0101_0003 => Some("name"),
        0x0101_000f => Some("debuggable"),
        0x0101_0010 => Some("exported"),
        0x0101_020c => Some("minSdkVersion"),
        0x0101_0270 => Some("targetSdkVersion"),
        0x0101_021b => Some("versionCode"),
        0x0101_021c => Some("versionName"),
        0x0101_0281 => Some("glEsVersion"),
        0x0101_028e => Some("required"),
        0x0101_064b => Some("compileSdkVersion"),
        0x0101_064c => Some("compileSdkVersionCodename"),
        _ => None,
    }
}
