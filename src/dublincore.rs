//! Dublin Core metadata record.
//!
//! [`MetadataRecord`] holds every recognized field as an ordered list of
//! strings. Single-valued fields such as the title still use a list so that
//! the record maps one-to-one onto XML, where any element may repeat.

use crate::container::decode_xml_bytes;
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Dublin Core elements namespace.
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Dublin Core terms namespace.
pub const DCTERMS_NAMESPACE: &str = "http://purl.org/dc/terms/";

/// MIME type recorded as the default `format`.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Classification written on every committed edit.
pub const FIXED_CATEGORY: &str = "curriculo";

/// A metadata field of [`MetadataRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Contributor,
    Date,
    Type,
    Format,
    Identifier,
    Source,
    Language,
    Relation,
    Coverage,
    Rights,
    Keywords,
    Category,
}

impl Field {
    /// All fields in serialization order.
    pub const ALL: [Field; 17] = [
        Field::Title,
        Field::Creator,
        Field::Subject,
        Field::Description,
        Field::Publisher,
        Field::Contributor,
        Field::Date,
        Field::Type,
        Field::Format,
        Field::Identifier,
        Field::Source,
        Field::Language,
        Field::Relation,
        Field::Coverage,
        Field::Rights,
        Field::Keywords,
        Field::Category,
    ];

    /// Element namespace and local name used by [`MetadataRecord::to_xml`].
    ///
    /// `keywords` and `category` live in the terms namespace as `keyword`
    /// and `type`.
    pub fn element(&self) -> (&'static str, &'static str) {
        match self {
            Field::Title => (DC_NAMESPACE, "title"),
            Field::Creator => (DC_NAMESPACE, "creator"),
            Field::Subject => (DC_NAMESPACE, "subject"),
            Field::Description => (DC_NAMESPACE, "description"),
            Field::Publisher => (DC_NAMESPACE, "publisher"),
            Field::Contributor => (DC_NAMESPACE, "contributor"),
            Field::Date => (DC_NAMESPACE, "date"),
            Field::Type => (DC_NAMESPACE, "type"),
            Field::Format => (DC_NAMESPACE, "format"),
            Field::Identifier => (DC_NAMESPACE, "identifier"),
            Field::Source => (DC_NAMESPACE, "source"),
            Field::Language => (DC_NAMESPACE, "language"),
            Field::Relation => (DC_NAMESPACE, "relation"),
            Field::Coverage => (DC_NAMESPACE, "coverage"),
            Field::Rights => (DC_NAMESPACE, "rights"),
            Field::Keywords => (DCTERMS_NAMESPACE, "keyword"),
            Field::Category => (DCTERMS_NAMESPACE, "type"),
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Creator => "Creator",
            Field::Subject => "Subject",
            Field::Description => "Description",
            Field::Publisher => "Publisher",
            Field::Contributor => "Contributor",
            Field::Date => "Date",
            Field::Type => "Type",
            Field::Format => "Format",
            Field::Identifier => "Identifier",
            Field::Source => "Source",
            Field::Language => "Language",
            Field::Relation => "Relation",
            Field::Coverage => "Coverage",
            Field::Rights => "Rights",
            Field::Keywords => "Keywords",
            Field::Category => "Category",
        }
    }

    fn from_element(namespace: &[u8], local: &[u8]) -> Option<Field> {
        Field::ALL.into_iter().find(|field| {
            let (ns, name) = field.element();
            ns.as_bytes() == namespace && name.as_bytes() == local
        })
    }
}

/// Document metadata in Dublin Core terms plus keywords and category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub creator: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub subject: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub publisher: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub contributor: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub date: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty", default)]
    pub r#type: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub format: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub identifier: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub source: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub language: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub relation: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub coverage: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub rights: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub category: Vec<String>,
}

impl MetadataRecord {
    /// Create a record for a document that has no metadata yet.
    ///
    /// `date` is set to the current local time (RFC 3339), `format` to the
    /// DOCX MIME type and `category` to the fixed classification. Use
    /// [`MetadataRecord::default`] for a record with every field empty.
    pub fn with_defaults() -> Self {
        Self {
            date: vec![chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)],
            format: vec![DOCX_MIME_TYPE.to_string()],
            category: vec![FIXED_CATEGORY.to_string()],
            ..Default::default()
        }
    }

    /// Values of a field.
    pub fn values(&self, field: Field) -> &[String] {
        match field {
            Field::Title => &self.title,
            Field::Creator => &self.creator,
            Field::Subject => &self.subject,
            Field::Description => &self.description,
            Field::Publisher => &self.publisher,
            Field::Contributor => &self.contributor,
            Field::Date => &self.date,
            Field::Type => &self.r#type,
            Field::Format => &self.format,
            Field::Identifier => &self.identifier,
            Field::Source => &self.source,
            Field::Language => &self.language,
            Field::Relation => &self.relation,
            Field::Coverage => &self.coverage,
            Field::Rights => &self.rights,
            Field::Keywords => &self.keywords,
            Field::Category => &self.category,
        }
    }

    /// Mutable values of a field.
    pub fn values_mut(&mut self, field: Field) -> &mut Vec<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Creator => &mut self.creator,
            Field::Subject => &mut self.subject,
            Field::Description => &mut self.description,
            Field::Publisher => &mut self.publisher,
            Field::Contributor => &mut self.contributor,
            Field::Date => &mut self.date,
            Field::Type => &mut self.r#type,
            Field::Format => &mut self.format,
            Field::Identifier => &mut self.identifier,
            Field::Source => &mut self.source,
            Field::Language => &mut self.language,
            Field::Relation => &mut self.relation,
            Field::Coverage => &mut self.coverage,
            Field::Rights => &mut self.rights,
            Field::Keywords => &mut self.keywords,
            Field::Category => &mut self.category,
        }
    }

    /// Replace the title with a single value.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = vec![title.into()];
    }

    /// Append a creator.
    pub fn add_creator(&mut self, creator: impl Into<String>) {
        self.creator.push(creator.into());
    }

    /// Replace all creators.
    pub fn set_creators<I, S>(&mut self, creators: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.creator = creators.into_iter().map(Into::into).collect();
    }

    /// Replace the description with a single value.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = vec![description.into()];
    }

    /// Append a keyword.
    pub fn add_keyword(&mut self, keyword: impl Into<String>) {
        self.keywords.push(keyword.into());
    }

    /// Replace all keywords.
    pub fn set_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
    }

    /// Force the category to the fixed classification.
    ///
    /// Called once per committed edit, after every other update.
    pub fn enforce_category(&mut self) {
        self.category = vec![FIXED_CATEGORY.to_string()];
    }

    /// True when no field holds a value.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.values(*f).is_empty())
    }

    /// True when title, creator, keywords or description holds a value.
    pub fn has_primary_fields(&self) -> bool {
        !self.title.is_empty()
            || !self.creator.is_empty()
            || !self.keywords.is_empty()
            || !self.description.is_empty()
    }

    /// Serialize as a standalone Dublin Core XML document.
    ///
    /// Empty fields are omitted; every value of a non-empty field becomes
    /// one element.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("dc");
        root.push_attribute(("xmlns", DC_NAMESPACE));
        root.push_attribute(("xmlns:dcterms", DCTERMS_NAMESPACE));
        writer.write_event(Event::Start(root))?;

        for field in Field::ALL {
            let (ns, local) = field.element();
            let tag = if ns == DCTERMS_NAMESPACE {
                format!("dcterms:{}", local)
            } else {
                local.to_string()
            };
            for value in self.values(field) {
                let value = xml_text(value);
                writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
                writer.write_event(Event::Text(BytesText::new(&value)))?;
                writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("dc")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::InvalidData(format!("serialized metadata is not UTF-8: {}", e)))
    }

    /// Parse a document produced by [`MetadataRecord::to_xml`].
    ///
    /// Elements are matched by namespace, so any prefix works. Unknown
    /// elements are skipped. The root must be `dc` in the Dublin Core
    /// namespace.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        let mut record = Self::default();
        let mut depth = 0usize;
        let mut seen_root = false;
        let mut current: Option<(Field, usize)> = None;
        let mut text = String::new();

        loop {
            match reader.read_resolved_event()? {
                (ns, Event::Start(e)) => {
                    depth += 1;
                    if depth == 1 {
                        check_root(&ns, e.local_name().as_ref(), seen_root)?;
                        seen_root = true;
                    } else if depth == 2 && current.is_none() {
                        if let ResolveResult::Bound(Namespace(uri)) = ns {
                            if let Some(field) = Field::from_element(uri, e.local_name().as_ref())
                            {
                                current = Some((field, depth));
                                text.clear();
                            }
                        }
                    }
                }
                (ns, Event::Empty(e)) => {
                    if depth == 0 {
                        check_root(&ns, e.local_name().as_ref(), seen_root)?;
                        seen_root = true;
                    } else if depth == 1 {
                        if let ResolveResult::Bound(Namespace(uri)) = ns {
                            if let Some(field) = Field::from_element(uri, e.local_name().as_ref())
                            {
                                record.values_mut(field).push(String::new());
                            }
                        }
                    }
                }
                (_, Event::Text(e)) => {
                    if current.is_some() {
                        text.push_str(&e.unescape()?);
                    }
                }
                (_, Event::CData(e)) => {
                    if current.is_some() {
                        text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                (_, Event::End(_)) => {
                    if let Some((field, at)) = current {
                        if at == depth {
                            record.values_mut(field).push(std::mem::take(&mut text));
                            current = None;
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                (_, Event::Eof) => break,
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

        Ok(record)
    }

    /// Parse raw bytes, detecting UTF-8 or UTF-16 encoding.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let xml = decode_xml_bytes(data)?;
        Self::from_xml(&xml)
    }
}

/// Replace characters that XML 1.0 does not allow with U+FFFD.
pub(crate) fn xml_text(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .chars()
            .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
            .collect(),
    )
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn check_root(ns: &ResolveResult<'_>, local: &[u8], seen_root: bool) -> Result<()> {
    if seen_root {
        return Err(Error::XmlParse("multiple root elements".to_string()));
    }
    let in_dc = matches!(
        ns,
        ResolveResult::Bound(Namespace(uri)) if *uri == DC_NAMESPACE.as_bytes()
    );
    if !in_dc || local != b"dc" {
        return Err(Error::XmlParse(format!(
            "expected element <dc> in {}, found <{}>",
            DC_NAMESPACE,
            String::from_utf8_lossy(local)
        )));
    }
    Ok(())
}
