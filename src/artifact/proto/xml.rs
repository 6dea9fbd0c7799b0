//! Walker for the AAPT2 proto-XML manifest (`XmlNode` in aapt2's
//! Resources schema), interpreted by field number without a schema compiler.
//!
//! Produces the same element shape as the binary XML decoder so the
//! manifest projection is format-agnostic.
//!
//! ```text
//! XmlNode      { 1: XmlElement, 2: text }
//! XmlElement   { 1: XmlNamespace*, 2: namespaceUri, 3: name,
//!                4: XmlAttribute*, 5: XmlNode* (children) }
//! XmlAttribute { 1: namespaceUri, 2: name, 3: valueString,
//!                5: resourceId, 6: compiled Item }
//! XmlNamespace { 1: prefix, 2: uri }
//! Item         { 1: Reference, 2: String, 3: RawString, 7: Primitive }
//! Reference    { 1: id }
//! Primitive    { 1: null, 3: float32, 6: intDec, 7: intHex, 8: bool }
//! ```

use std::collections::HashMap;

use log::{debug, trace};

use crate::artifact::element::{AttrValue, Element};
use crate::artifact::error::{ArtifactError, Result};

use super::read_fields;

/// Defense against adversarial node graphs.
const MAX_DEPTH: usize = 1024;

/// Decode a serialized `XmlNode` into its element tree.
///
/// Returns `None` when the top-level node carries no element.
pub fn parse(buf: &[u8]) -> Result<Option<Element>> {
    let node = read_fields(buf, 0, buf.len());
    let (offset, len) = match node.bytes(1) {
        Some(range) => range,
        None => {
            debug!("Top-level XmlNode has no element field");
            return Ok(None);
        }
    };

    let mut walker = Walker {
        buf,
        prefixes: HashMap::new(),
    };
    walker.element(offset, len, 0).map(Some)
}

/// Per-parse state. AAPT2 declares namespaces at the root, so the
/// uri → prefix map accumulates across the whole walk.
struct Walker<'a> {
    buf: &'a [u8],
    prefixes: HashMap<String, String>,
}

impl<'a> Walker<'a> {
    fn element(&mut self, offset: usize, len: usize, depth: usize) -> Result<Element> {
        if depth > MAX_DEPTH {
            return Err(ArtifactError::RecursionLimit(MAX_DEPTH));
        }
        let fields = read_fields(self.buf, offset, offset + len);

        for ns in fields.all(1).to_vec() {
            if let super::WireValue::Bytes { offset, len } = ns {
                self.namespace(offset, len);
            }
        }

        let tag = fields
            .bytes(3)
            .map(|(o, l)| self.text(o, l))
            .unwrap_or_default();
        let mut element = Element::new(tag);

        for attr in fields.all(4).to_vec() {
            if let super::WireValue::Bytes { offset, len } = attr {
                self.attribute(offset, len, &mut element);
            }
        }

        for child in fields.all(5).to_vec() {
            if let super::WireValue::Bytes { offset, len } = child {
                let node = read_fields(self.buf, offset, offset + len);
                if let Some((co, cl)) = node.bytes(1) {
                    element.children.push(self.element(co, cl, depth + 1)?);
                }
            }
        }

        Ok(element)
    }

    fn namespace(&mut self, offset: usize, len: usize) {
        let fields = read_fields(self.buf, offset, offset + len);
        let prefix = fields.bytes(1).map(|(o, l)| self.text(o, l));
        let uri = fields.bytes(2).map(|(o, l)| self.text(o, l));
        if let (Some(prefix), Some(uri)) = (prefix, uri) {
            trace!("Namespace {} -> {}", uri, prefix);
            self.prefixes.insert(uri, prefix);
        }
    }

    fn attribute(&mut self, offset: usize, len: usize, element: &mut Element) {
        let fields = read_fields(self.buf, offset, offset + len);
        let namespace_uri = fields.bytes(1).map(|(o, l)| self.text(o, l));
        let local_name = fields
            .bytes(2)
            .map(|(o, l)| self.text(o, l))
            .unwrap_or_default();
        let raw_value = fields.bytes(3).map(|(o, l)| self.text(o, l));

        // A compiled item overrides the raw string for the same attribute.
        let compiled = fields
            .bytes(6)
            .and_then(|(o, l)| self.item_value(o, l));
        let value = match (compiled, raw_value) {
            (Some(v), _) => v,
            (None, Some(s)) => AttrValue::String(s),
            (None, None) => AttrValue::Null,
        };

        let key = match namespace_uri
            .as_deref()
            .and_then(|uri| self.prefixes.get(uri))
        {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.clone(),
        };
        element.push_attr(namespace_uri, key, local_name, value, None);
    }

    /// Decode an `Item` message to a typed value, or `None` for item kinds
    /// the walker does not interpret (the caller falls back to the raw
    /// string).
    fn item_value(&self, offset: usize, len: usize) -> Option<AttrValue> {
        let item = read_fields(self.buf, offset, offset + len);

        if let Some((o, l)) = item.bytes(1) {
            // Reference { 1: id }
            let reference = read_fields(self.buf, o, o + l);
            return Some(AttrValue::Reference(
                reference.varint(1).unwrap_or(0) as u32
            ));
        }
        if let Some((o, l)) = item.bytes(2).or_else(|| item.bytes(3)) {
            // String / RawString { 1: value }
            let message = read_fields(self.buf, o, o + l);
            let text = message
                .bytes(1)
                .map(|(to, tl)| self.text(to, tl))
                .unwrap_or_default();
            return Some(AttrValue::String(text));
        }
        if let Some((o, l)) = item.bytes(7) {
            return self.primitive_value(o, l);
        }
        None
    }

    fn primitive_value(&self, offset: usize, len: usize) -> Option<AttrValue> {
        let prim = read_fields(self.buf, offset, offset + len);
        if prim.contains(1) {
            return Some(AttrValue::Null);
        }
        if let Some(bits) = prim.fixed32(3) {
            return Some(AttrValue::Float(f32::from_bits(bits)));
        }
        if let Some(v) = prim.varint(6) {
            return Some(AttrValue::IntDec(v as i32));
        }
        if let Some(v) = prim.varint(7) {
            return Some(AttrValue::IntHex(v as u32));
        }
        if let Some(v) = prim.varint(8) {
            return Some(AttrValue::Bool(v != 0));
        }
        None
    }

    fn text(&self, offset: usize, len: usize) -> String {
        String::from_utf8_lossy(&self.buf[offset..offset + len]).into_owned()
    }
}
