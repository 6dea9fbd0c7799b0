//! The element tree shared by the binary-XML decoders and the XML tree reader.
//!
//! Both the AXML decoder and the AAPT2 proto-XML walker produce this shape, so
//! the manifest projection works identically for APK and AAB inputs.

use std::collections::HashMap;
use std::fmt;

/// Dimension unit suffixes, indexed by `data & 0x0f`.
const DIMENSION_UNITS: [&str; 6] = ["px", "dp", "sp", "pt", "in", "mm"];

/// Fraction basis suffixes: plain fraction or parent-relative.
const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

/// Radix table for the fixed-point "complex" encoding shared by
/// dimensions and fractions.
const COMPLEX_RADIX: [f32; 4] = [
    1.0,
    1.0 / 128.0,
    1.0 / 32768.0,
    1.0 / 8388608.0,
];

/// A typed attribute value as stored in compiled Android resources.
///
/// Every value has exactly one variant. The `Display` impl renders the
/// canonical text surface (`@0x…` for references, unit suffixes for
/// dimensions and fractions).
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    /// A reference into the resource table, rendered `@0x<hex>`.
    Reference(u32),
    /// A theme attribute reference, rendered `?0x<hex>`.
    AttributeRef(u32),
    String(String),
    Float(f32),
    /// A dimension value with its unit index (`data & 0x0f`).
    Dimension(f32, u8),
    /// A fraction value with its basis index (`data & 0x0f`).
    Fraction(f32, u8),
    IntDec(i32),
    IntHex(u32),
    Bool(bool),
    /// A typed value the decoder does not interpret; the raw data word
    /// is preserved.
    RawResource(u32),
}

impl AttrValue {
    /// Decode the fixed-point "complex" value used by dimensions and
    /// fractions: 24-bit mantissa scaled by a radix selected from bits 4-5.
    pub fn complex_value(data: u32) -> f32 {
        let mantissa = (data >> 8) & 0x00ff_ffff;
        let radix = ((data >> 4) & 0x3) as usize;
        mantissa as f32 * COMPLEX_RADIX[radix]
    }

    /// The string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// A boolean reading tolerant of string spellings ("true"/"false").
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// An integer reading tolerant of decimal string spellings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::IntDec(v) => Some(i64::from(*v)),
            AttrValue::IntHex(v) => Some(i64::from(*v)),
            AttrValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Reference(d) => write!(f, "@0x{:x}", d),
            AttrValue::AttributeRef(d) => write!(f, "?0x{:x}", d),
            AttrValue::String(s) => f.write_str(s),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Dimension(v, unit) => {
                let suffix = DIMENSION_UNITS.get(*unit as usize).copied().unwrap_or("");
                write!(f, "{}{}", v, suffix)
            }
            AttrValue::Fraction(v, basis) => {
                let suffix = FRACTION_UNITS.get(*basis as usize).copied().unwrap_or("");
                write!(f, "{}{}", v, suffix)
            }
            AttrValue::IntDec(v) => write!(f, "{}", v),
            AttrValue::IntHex(v) => write!(f, "0x{:x}", v),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::RawResource(d) => write!(f, "0x{:x}", d),
        }
    }
}

/// One attribute in document order, keeping its namespace URI so downstream
/// consumers can disambiguate colliding local names.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttr {
    pub namespace_uri: Option<String>,
    pub local_name: String,
    pub value: AttrValue,
    /// The binary type tag, when the source format carried one.
    pub type_tag: Option<u8>,
}

/// One XML element: qualified tag, keyed attributes, ordered children.
///
/// Attribute keys are `prefix:name` when the attribute's namespace URI has a
/// declared prefix, plain `name` otherwise. `raw_attrs` preserves original
/// order and the full namespace URI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: HashMap<String, AttrValue>,
    pub children: Vec<Element>,
    pub raw_attrs: Vec<RawAttr>,
    /// Character data, used only by the textual XML reader (binary XML
    /// discards CDATA).
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Element::default()
        }
    }

    /// Record an attribute under its map key and in document order.
    pub fn push_attr(
        &mut self,
        namespace_uri: Option<String>,
        key: String,
        local_name: String,
        value: AttrValue,
        type_tag: Option<u8>,
    ) {
        self.raw_attrs.push(RawAttr {
            namespace_uri,
            local_name,
            value: value.clone(),
            type_tag,
        });
        self.attributes.insert(key, value);
    }

    /// Look up an attribute under the `android:` prefix first, then bare.
    ///
    /// AXML documents carry the prefix; proto-XML manifests occasionally
    /// omit the namespace declaration, so both spellings occur in the wild.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .get(&format!("android:{}", name))
            .or_else(|| self.attributes.get(name))
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}
