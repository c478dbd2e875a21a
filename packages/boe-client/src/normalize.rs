//! Response normalization.
//!
//! Turns a raw JSON or XML payload into a [`GenericDocument`]. Output depends
//! only on the input text.
//!
//! XML mapping, per element:
//! - attribute `x` becomes the entry `@x`;
//! - each distinct child tag becomes one entry; repeated siblings collapse
//!   into a `List` in document order, a lone child is not wrapped;
//! - a bare element (no children, no attributes) is a `Scalar` of its trimmed
//!   text;
//! - otherwise non-empty leading text is stored under the reserved key
//!   `text`. A child element named `text` is overwritten by it; that
//!   collision is logged, not avoided.
//!
//! The root element is wrapped as `Map{root_tag: ...}`. Documents nested
//! deeper than [`MAX_DEPTH`] elements are rejected as format errors.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::GenericDocument;
use crate::error::{ApiError, Result};

/// Key holding an element's own text when it also has attributes or children.
pub const TEXT_KEY: &str = "text";

/// Prefix marking attribute entries.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Deepest element nesting accepted, matching serde_json's recursion limit.
pub const MAX_DEPTH: usize = 128;

/// Payload format requested from (and declared by) the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Xml,
}

impl DocumentFormat {
    /// Value for the `Accept` header.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
        }
    }
}

/// Normalize `raw` according to its declared format.
pub fn normalize(raw: &str, format: DocumentFormat) -> Result<GenericDocument> {
    match format {
        DocumentFormat::Json => normalize_json(raw),
        DocumentFormat::Xml => normalize_xml(raw),
    }
}

pub fn normalize_json(raw: &str) -> Result<GenericDocument> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ApiError::format("JSON", e))?;
    Ok(GenericDocument::from(value))
}

/// An element still open while reading.
struct Frame {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<(String, GenericDocument)>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| ApiError::format("XML", e))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| ApiError::format("XML", e))?;
            attributes.push((key, value.into_owned()));
        }

        Ok(Self {
            tag,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Only text before the first child element counts as the element's text.
    fn push_text(&mut self, text: &str) {
        if self.children.is_empty() {
            self.text.push_str(text);
        }
    }

    fn finish(self) -> (String, GenericDocument) {
        let text = self.text.trim();

        if self.children.is_empty() && self.attributes.is_empty() {
            return (self.tag, GenericDocument::scalar(text));
        }

        let mut map = IndexMap::new();
        for (key, value) in self.attributes {
            map.insert(format!("{}{}", ATTRIBUTE_PREFIX, key), GenericDocument::Scalar(value));
        }

        for (tag, child) in self.children {
            // Element conversions are never lists, so an existing List here
            // can only come from an earlier repetition of this tag.
            match map.get_mut(&tag) {
                Some(GenericDocument::List(items)) => items.push(child),
                Some(existing) => {
                    let first = std::mem::replace(existing, GenericDocument::List(Vec::new()));
                    *existing = GenericDocument::List(vec![first, child]);
                }
                None => {
                    map.insert(tag, child);
                }
            }
        }

        if !text.is_empty() {
            if map.contains_key(TEXT_KEY) {
                warn!(
                    element = %self.tag,
                    "element text overwrites a child element named `text`"
                );
            }
            map.insert(TEXT_KEY.to_string(), GenericDocument::scalar(text));
        }

        (self.tag, GenericDocument::Map(map))
    }
}

pub fn normalize_xml(raw: &str) -> Result<GenericDocument> {
    let mut reader = Reader::from_str(raw);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, GenericDocument)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ApiError::format("XML", format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                check_open(&stack, &root)?;
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                check_open(&stack, &root)?;
                let closed = Frame::open(&start)?.finish();
                attach(&mut stack, &mut root, closed);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ApiError::format("XML", "closing tag without opening tag"))?;
                let closed = frame.finish();
                attach(&mut stack, &mut root, closed);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| ApiError::format("XML", e))?;
                match stack.last_mut() {
                    Some(frame) => frame.push_text(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(ApiError::format("XML", "text outside the root element")),
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ApiError::format(
            "XML",
            format!("unexpected end of input inside <{}>", open.tag),
        ));
    }

    let (tag, document) = root.ok_or_else(|| ApiError::format("XML", "no root element"))?;
    let mut wrapped = IndexMap::new();
    wrapped.insert(tag, document);
    Ok(GenericDocument::Map(wrapped))
}

/// Whether a new element may open under the current stack.
fn check_open(stack: &[Frame], root: &Option<(String, GenericDocument)>) -> Result<()> {
    if stack.is_empty() && root.is_some() {
        return Err(ApiError::format("XML", "more than one root element"));
    }
    if stack.len() >= MAX_DEPTH {
        return Err(ApiError::format(
            "XML",
            format!("nesting deeper than {} elements", MAX_DEPTH),
        ));
    }
    Ok(())
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<(String, GenericDocument)>,
    closed: (String, GenericDocument),
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(closed),
        None => *root = Some(closed),
    }
}
