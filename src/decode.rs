//! Tolerant decoding of `docProps/core.xml`.
//!
//! Producers disagree on prefixes for the same core-properties fields
//! (`dc:title`, `cp:title`, bare `title`). Decoding therefore tries three
//! strategies in order and keeps the first one that yields data:
//!
//! 1. [`Strategy::Structured`]: an XML parse of a `coreProperties` root,
//!    matching children by local name.
//! 2. [`Strategy::TagScan`]: a plain-text scan for a fixed list of tag
//!    spellings, for producers whose XML does not parse.
//! 3. [`Strategy::DublinCore`]: the entry is a bare Dublin Core document as
//!    written by [`MetadataRecord::to_xml`].
//!
//! A well-formed document with some other root skips straight to the Dublin
//! Core parse, since the text scan would only recover a subset of its fields.

use crate::dublincore::{Field, MetadataRecord};
use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use tracing::debug;

/// Tag spellings tried by the text scan, in evaluation order.
///
/// When several spellings of the same field match, the last one listed wins.
pub const TAG_CANDIDATES: [(&str, Field); 16] = [
    ("dc:title", Field::Title),
    ("title", Field::Title),
    ("cp:title", Field::Title),
    ("dc:creator", Field::Creator),
    ("creator", Field::Creator),
    ("cp:creator", Field::Creator),
    ("dc:subject", Field::Subject),
    ("subject", Field::Subject),
    ("cp:subject", Field::Subject),
    ("dc:description", Field::Description),
    ("description", Field::Description),
    ("cp:description", Field::Description),
    ("cp:keywords", Field::Keywords),
    ("keywords", Field::Keywords),
    ("cp:category", Field::Category),
    ("category", Field::Category),
];

/// Decoding strategy that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// XML parse of a `coreProperties` document.
    Structured,
    /// Substring scan over known tag spellings.
    TagScan,
    /// Namespace-aware Dublin Core parse.
    DublinCore,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Structured => "structured core properties",
            Strategy::TagScan => "tag scan",
            Strategy::DublinCore => "Dublin Core",
        };
        write!(f, "{}", name)
    }
}

/// A decoded record and the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: MetadataRecord,
    pub strategy: Strategy,
}

/// Decode core properties, trying each strategy in turn.
///
/// Errors from the first two strategies are swallowed. Only the failure of
/// the last strategy is returned.
pub fn decode_core_properties(xml: &str) -> Result<Decoded> {
    match parse_structured(xml) {
        Ok(record) if record.has_primary_fields() => {
            return Ok(Decoded {
                record,
                strategy: Strategy::Structured,
            });
        }
        Ok(_) => debug!("structured parse found no title, creator, keywords or description"),
        Err(Error::UnexpectedRoot { found, .. }) => {
            debug!("root is <{}>, trying Dublin Core first", found);
            match MetadataRecord::from_xml(xml) {
                Ok(record) if !record.is_empty() => {
                    return Ok(Decoded {
                        record,
                        strategy: Strategy::DublinCore,
                    });
                }
                Ok(_) => debug!("Dublin Core parse found no fields"),
                Err(e) => debug!("Dublin Core parse failed: {}", e),
            }
        }
        Err(e) => debug!("structured parse failed: {}", e),
    }

    if let Some(record) = scan_tags(xml) {
        return Ok(Decoded {
            record,
            strategy: Strategy::TagScan,
        });
    }
    debug!("tag scan matched no known tags");

    let record = MetadataRecord::from_xml(xml)?;
    Ok(Decoded {
        record,
        strategy: Strategy::DublinCore,
    })
}

/// Map a core-properties child element, by local name, to a field.
fn structured_field(local: &[u8]) -> Option<Field> {
    match local {
        b"title" => Some(Field::Title),
        b"creator" => Some(Field::Creator),
        b"subject" => Some(Field::Subject),
        b"description" => Some(Field::Description),
        b"keywords" => Some(Field::Keywords),
        b"category" => Some(Field::Category),
        _ => None,
    }
}

/// Parse a `coreProperties` document, ignoring namespaces.
///
/// Fields found in the document replace the defaults; fields not found keep
/// them.
pub fn parse_structured(xml: &str) -> Result<MetadataRecord> {
    let mut reader = Reader::from_str(xml);
    let mut found = MetadataRecord::default();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut current: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    expect_core_root(e.local_name().as_ref(), seen_root)?;
                    seen_root = true;
                } else if depth == 2 {
                    current = structured_field(e.local_name().as_ref());
                    text.clear();
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    expect_core_root(e.local_name().as_ref(), seen_root)?;
                    seen_root = true;
                } else if depth == 1 {
                    if let Some(field) = structured_field(e.local_name().as_ref()) {
                        found.values_mut(field).push(String::new());
                    }
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(field) = current.take() {
                        found.values_mut(field).push(std::mem::take(&mut text));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::XmlParse("document has no root element".to_string()));
    }
    if depth != 0 {
        return Err(Error::XmlParse(format!(
            "unexpected end of document, {} element(s) left open",
            depth
        )));
    }

    let mut record = MetadataRecord::with_defaults();
    for field in Field::ALL {
        let values = found.values_mut(field);
        if !values.is_empty() {
            *record.values_mut(field) = std::mem::take(values);
        }
    }
    Ok(record)
}

fn expect_core_root(local: &[u8], seen_root: bool) -> Result<()> {
    if seen_root {
        return Err(Error::XmlParse("multiple root elements".to_string()));
    }
    if local != b"coreProperties" {
        return Err(Error::UnexpectedRoot {
            expected: "coreProperties".to_string(),
            found: String::from_utf8_lossy(local).into_owned(),
        });
    }
    Ok(())
}

/// Scan raw text for every tag in [`TAG_CANDIDATES`].
///
/// Returns `None` when no candidate matched at all.
pub fn scan_tags(xml: &str) -> Option<MetadataRecord> {
    let mut record = MetadataRecord::with_defaults();
    let mut matched = false;

    for (tag, field) in TAG_CANDIDATES {
        let values: Vec<String> = TagScanner::new(xml, tag).map(unescape_lossy).collect();
        if !values.is_empty() {
            *record.values_mut(field) = values;
            matched = true;
        }
    }

    matched.then_some(record)
}

fn unescape_lossy(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Iterator over the trimmed inner text of every `<tag>…</tag>` pair.
///
/// Matches are non-overlapping and in document order. Only the exact
/// attribute-free spelling `<tag>` is recognized. The iterator stops at the
/// first opening tag without a closing tag.
pub struct TagScanner<'a> {
    haystack: &'a str,
    open: String,
    close: String,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    /// Create a scanner for `tag` over `haystack`.
    pub fn new(haystack: &'a str, tag: &str) -> Self {
        Self {
            haystack,
            open: format!("<{}>", tag),
            close: format!("</{}>", tag),
            pos: 0,
        }
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.haystack.get(self.pos..)?;
        let start = rest.find(&self.open)? + self.open.len();
        let Some(len) = rest[start..].find(&self.close) else {
            self.pos = self.haystack.len();
            return None;
        };
        let value = rest[start..start + len].trim();
        self.pos += start + len + self.close.len();
        Some(value)
    }
}

impl std::iter::FusedIterator for TagScanner<'_> {}
