//! Decoder for Android's chunked binary XML (`AndroidManifest.xml` inside an
//! APK).
//!
//! The document is a sequence of typed chunks after an 8-byte file header:
//! a string pool, an optional resource-id map, namespace records, and the
//! element tree itself. Real artifacts occasionally carry padding or
//! truncated tails; malformed trailing chunks end the walk with whatever
//! tree was built so far.

pub mod string_pool;
pub mod values;

use std::collections::HashMap;

use log::{debug, trace, warn};

use super::element::{AttrValue, Element};
use super::error::{ArtifactError, Result};
use super::utils;
use self::string_pool::StringPool;

/// The leading chunk type of a binary XML document.
pub const RES_XML_TYPE: u16 = 0x0003;

const CHUNK_STRING_POOL: u16 = 0x0001;
const CHUNK_RESOURCE_MAP: u16 = 0x0180;
const CHUNK_START_NAMESPACE: u16 = 0x0100;
const CHUNK_END_NAMESPACE: u16 = 0x0101;
const CHUNK_START_ELEMENT: u16 = 0x0102;
const CHUNK_END_ELEMENT: u16 = 0x0103;
const CHUNK_CDATA: u16 = 0x0104;

/// True when the buffer leads with the binary XML chunk type.
pub fn sniff(buf: &[u8]) -> bool {
    utils::read_u16_le(buf, 0).map(|t| t == RES_XML_TYPE).unwrap_or(false)
}

/// Decode a complete binary XML document into its root element.
///
/// Returns the first top-level element when the document holds several.
pub fn parse(buf: &[u8]) -> Result<Element> {
    let file_type = utils::read_u16_le(buf, 0)?;
    if file_type != RES_XML_TYPE {
        return Err(ArtifactError::NotAxml { found: file_type });
    }
    let header_size = utils::read_u16_le(buf, 2)? as usize;
    let file_size = (utils::read_u32_le(buf, 4)? as usize).min(buf.len());
    debug!("Binary XML: {} declared bytes, header {}", file_size, header_size);

    let mut decoder = Decoder::default();
    let mut cursor = header_size;

    while cursor + 8 <= file_size {
        let chunk_type = utils::read_u16_le(buf, cursor)?;
        let chunk_size = utils::read_u32_le(buf, cursor + 4)? as usize;
        if chunk_size < 8 || cursor + chunk_size > buf.len() {
            // Padding or a tampered tail; keep the partial tree.
            warn!(
                "Malformed chunk (type {:#06x}, size {}) at offset {}; truncating",
                chunk_type, chunk_size, cursor
            );
            break;
        }
        let chunk = &buf[cursor..];

        match chunk_type {
            CHUNK_STRING_POOL => {
                decoder.pool = StringPool::parse(chunk, chunk_size)?;
            }
            CHUNK_RESOURCE_MAP => {
                decoder.load_resource_map(chunk, chunk_size)?;
            }
            CHUNK_START_NAMESPACE => {
                decoder.start_namespace(chunk)?;
            }
            CHUNK_END_NAMESPACE | CHUNK_CDATA => {}
            CHUNK_START_ELEMENT => {
                decoder.start_element(chunk)?;
            }
            CHUNK_END_ELEMENT => {
                decoder.end_element();
            }
            other => {
                trace!("Skipping chunk type {:#06x} at offset {}", other, cursor);
            }
        }

        cursor += chunk_size;
    }

    decoder.finish()
}

/// Parse state for one document: the pool, namespace prefixes, the element
/// stack, and the skip counter for top-level trees past the first.
#[derive(Default)]
struct Decoder {
    pool: StringPool,
    resource_map: Vec<u32>,
    prefixes: HashMap<String, String>,
    stack: Vec<Element>,
    root: Option<Element>,
    skip_depth: usize,
}

impl Decoder {
    fn load_resource_map(&mut self, chunk: &[u8], chunk_size: usize) -> Result<()> {
        let header_size = utils::read_u16_le(chunk, 2)? as usize;
        let count = chunk_size.saturating_sub(header_size) / 4;
        self.resource_map = (0..count)
            .map(|i| utils::read_u32_le(chunk, header_size + i * 4))
            .collect::<Result<_>>()?;
        trace!("Resource map with {} ids", self.resource_map.len());
        Ok(())
    }

    fn start_namespace(&mut self, chunk: &[u8]) -> Result<()> {
        // Body: line, comment, prefix index, uri index.
        let prefix_idx = utils::read_u32_le(chunk, 16)?;
        let uri_idx = utils::read_u32_le(chunk, 20)?;
        if let (Some(prefix), Some(uri)) = (self.pool.get(prefix_idx), self.pool.get(uri_idx)) {
            trace!("Namespace {} -> {}", uri, prefix);
            self.prefixes.insert(uri.to_string(), prefix.to_string());
        }
        Ok(())
    }

    fn start_element(&mut self, chunk: &[u8]) -> Result<()> {
        if (self.root.is_some() && self.stack.is_empty()) || self.skip_depth > 0 {
            // A second top-level tree; only the first is reported.
            self.skip_depth += 1;
            return Ok(());
        }

        // Body: line, comment, namespace, name, then attribute layout.
        let name_idx = utils::read_u32_le(chunk, 20)?;
        let attr_start = utils::read_u16_le(chunk, 24)? as usize;
        let attr_size = utils::read_u16_le(chunk, 26)? as usize;
        let attr_count = utils::read_u16_le(chunk, 28)? as usize;

        let tag = self
            .pool
            .get(name_idx)
            .unwrap_or_default()
            .to_string();
        let mut element = Element::new(tag);

        // The attribute table starts relative to the element body and each
        // entry spans exactly `attr_size` bytes, whatever this AAPT wrote.
        let base = 16 + attr_start;
        for i in 0..attr_count {
            let at = base + i * attr_size.max(20);
            if let Err(e) = self.read_attribute(chunk, at, &mut element) {
                warn!("Attribute {} unreadable: {}", i, e);
                break;
            }
        }

        self.stack.push(element);
        Ok(())
    }

    fn read_attribute(&self, chunk: &[u8], at: usize, element: &mut Element) -> Result<()> {
        let ns_idx = utils::read_i32_le(chunk, at)?;
        let name_idx = utils::read_u32_le(chunk, at + 4)?;
        let raw_value_idx = utils::read_i32_le(chunk, at + 8)?;
        let type_tag = *utils::slice(chunk, at + 15, 1)?.first().unwrap_or(&0);
        let data = utils::read_u32_le(chunk, at + 16)?;

        let local_name = self.attribute_name(name_idx);
        let namespace_uri = if ns_idx >= 0 {
            self.pool.get(ns_idx as u32).map(str::to_string)
        } else {
            None
        };
        let key = match namespace_uri.as_deref().and_then(|uri| self.prefixes.get(uri)) {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.clone(),
        };

        let value = if raw_value_idx >= 0 {
            match self.pool.get(raw_value_idx as u32) {
                Some(s) => AttrValue::String(s.to_string()),
                None => AttrValue::Null,
            }
        } else {
            values::resolve_value(type_tag, data, &self.pool)
        };

        element.push_attr(namespace_uri, key, local_name, value, Some(type_tag));
        Ok(())
    }

    /// An attribute's local name: the pooled string, or the framework name
    /// reached through the resource map when AAPT left the pooled name empty.
    fn attribute_name(&self, name_idx: u32) -> String {
        if let Some(name) = self.pool.get(name_idx) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        match self.resource_map.get(name_idx as usize) {
            Some(&id) => values::system_attr_name(id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("id-0x{:08x}", id)),
            None => String::new(),
        }
    }

    fn end_element(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        if let Some(done) = self.stack.pop() {
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(done),
                None => {
                    if self.root.is_none() {
                        self.root = Some(done);
                    }
                }
            }
        }
    }

    /// The finished root. A truncated document may leave open elements on
    /// the stack; they are folded back together so the partial tree survives.
    fn finish(mut self) -> Result<Element> {
        while self.stack.len() > 1 {
            if let Some(done) = self.stack.pop() {
                if let Some(parent) = self.stack.last_mut() {
                    parent.children.push(done);
                }
            }
        }
        if let Some(open_root) = self.stack.pop() {
            if self.root.is_none() {
                self.root = Some(open_root);
            }
        }
        self.root
            .ok_or_else(|| ArtifactError::InvalidFormat("binary XML contains no elements".into()))
    }
}
