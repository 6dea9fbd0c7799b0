//! Textual XML reading: a small tree reader over `quick-xml`, plus the
//! projection of a textual property list into plist values.
//!
//! Used for `Info.plist` files that are not binary plists and for the XML
//! region inside `embedded.mobileprovision`.

use base64::Engine;
use chrono::{DateTime, Utc};
use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use std::collections::BTreeMap;

use super::element::{AttrValue, Element};
use super::error::{ArtifactError, Result};
use super::models::PlistValue;

/// Parse an XML document into an element tree.
///
/// The shape matches what the binary decoders produce: tag, attributes,
/// ordered children, with character data collected on `text`.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(element_from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut root, done);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| {
                        ArtifactError::InvalidFormat(format!("bad XML text: {}", e))
                    })?;
                    top.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ArtifactError::InvalidFormat(format!(
                    "XML parse error at offset {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    root.ok_or_else(|| ArtifactError::InvalidFormat("XML document has no root element".into()))
}

fn element_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<Element> {
    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| {
            ArtifactError::InvalidFormat(format!("bad XML attribute: {}", e))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ArtifactError::InvalidFormat(format!("bad XML value: {}", e)))?
            .into_owned();
        element.push_attr(None, key.clone(), key, AttrValue::String(value), None);
    }
    Ok(element)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Project a textual plist tree into a plist value.
///
/// Accepts either the `<plist>` wrapper or the value element itself.
pub fn plist_value(root: &Element) -> Result<PlistValue> {
    let value_element = if root.tag == "plist" {
        root.children
            .first()
            .ok_or_else(|| ArtifactError::InvalidFormat("empty <plist> document".into()))?
    } else {
        root
    };
    convert(value_element)
}

fn convert(element: &Element) -> Result<PlistValue> {
    let text = || element.text.clone().unwrap_or_default();
    match element.tag.as_str() {
        "dict" => {
            let mut dict = BTreeMap::new();
            let mut children = element.children.iter();
            while let Some(key_el) = children.next() {
                if key_el.tag != "key" {
                    warn!("Expected <key> in plist dict, found <{}>", key_el.tag);
                    continue;
                }
                let key = key_el.text.clone().unwrap_or_default();
                match children.next() {
                    Some(value_el) => {
                        dict.insert(key, convert(value_el)?);
                    }
                    None => {
                        warn!("Dangling <key>{}</key> without a value", key);
                    }
                }
            }
            Ok(PlistValue::Dict(dict))
        }
        "array" => Ok(PlistValue::Array(
            element
                .children
                .iter()
                .map(convert)
                .collect::<Result<_>>()?,
        )),
        "string" => Ok(PlistValue::Ascii(text())),
        "integer" => Ok(PlistValue::Int(text().trim().parse().unwrap_or(0))),
        "real" => Ok(PlistValue::Real(text().trim().parse().unwrap_or(0.0))),
        "true" => Ok(PlistValue::Bool(true)),
        "false" => Ok(PlistValue::Bool(false)),
        "date" => {
            let raw = text();
            let parsed = DateTime::parse_from_rfc3339(raw.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| {
                    ArtifactError::InvalidFormat(format!("bad plist date {:?}: {}", raw, e))
                })?;
            Ok(PlistValue::Date(parsed))
        }
        "data" => {
            let cleaned: String = text().chars().filter(|c| !c.is_whitespace()).collect();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(cleaned.as_bytes())
                .unwrap_or_default();
            Ok(PlistValue::Data(decoded))
        }
        other => {
            warn!("Unknown plist element <{}>", other);
            Ok(PlistValue::Null)
        }
    }
}
