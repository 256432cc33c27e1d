//! XML parser
//!
//! Every direct child of the document root is one record. Elements convert
//! recursively with the same rule at every depth:
//!
//! - text only: a string
//! - nothing at all: an empty object
//! - otherwise an object holding `@attributes`, one entry per child name
//!   (a single child is the value itself, repeated children form an array)
//!   and the element's own text under `#text`
//!
//! External entities are never resolved.

use super::{read_text, FormatParser};
use crate::record::Record;
use fileshipper_common::{Result, ShipperError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::path::Path;

const ATTRIBUTES_KEY: &str = "@attributes";
const TEXT_KEY: &str = "#text";

/// A parsed element tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    fn open(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            attributes.push((key, value.into_owned()));
        }

        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    /// Canonical JSON value of this element
    pub fn to_value(&self) -> Value {
        let text = self.text.trim();

        if self.attributes.is_empty() && self.children.is_empty() {
            return if text.is_empty() {
                Value::Object(Map::new())
            } else {
                Value::String(text.to_string())
            };
        }

        let mut map = Map::new();

        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }

        for child in &self.children {
            let value = child.to_value();
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                },
                None => {
                    map.insert(child.name.clone(), value);
                },
            }
        }

        if !text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }

        Value::Object(map)
    }
}

/// Parse a complete document and return its root element
pub fn parse_document(path: &Path, content: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    let invalid = |reader: &Reader<&[u8]>, message: String| {
        ShipperError::data_format(
            path,
            format!("Unable to parse XML at byte {}: {}", reader.buffer_position(), message),
        )
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let element = XmlElement::open(&start).map_err(|e| invalid(&reader, e))?;
                stack.push(element);
            },
            Ok(Event::Empty(start)) => {
                let element = XmlElement::open(&start).map_err(|e| invalid(&reader, e))?;
                attach(&mut stack, &mut root, element).map_err(|e| invalid(&reader, e))?;
            },
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| invalid(&reader, "unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element).map_err(|e| invalid(&reader, e))?;
            },
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| invalid(&reader, e.to_string()))?;
                    current.text.push_str(&text);
                }
            },
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => return Err(invalid(&reader, e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(invalid(&reader, format!("element <{}> is never closed", open.name)));
    }

    root.ok_or_else(|| ShipperError::data_format(path, "XML document has no root element"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> std::result::Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!("second root element <{}>", element.name))
    }
}

/// Reads the children of the root element as records
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl XmlParser {
    pub fn parse_str(&self, path: &Path, content: &str) -> Result<Vec<XmlElement>> {
        Ok(parse_document(path, content)?.children)
    }
}

impl FormatParser for XmlParser {
    type Raw = XmlElement;

    fn parse(&self, path: &Path) -> Result<Vec<XmlElement>> {
        let content = read_text(path)?;
        self.parse_str(path, &content)
    }

    fn normalize(&self, _path: &Path, _index: usize, raw: XmlElement) -> Result<Record> {
        match raw.to_value() {
            Value::Object(map) => Ok(map),
            scalar => {
                let mut record = Record::new();
                record.insert(raw.name, scalar);
                Ok(record)
            },
        }
    }
}
