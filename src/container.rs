//! DOCX container: open, decode metadata, rewrite.
//!
//! The whole file is held in memory. Saving re-reads the archive from that
//! buffer, so the destination may be the file that was opened.

use crate::decode::{decode_core_properties, Strategy};
use crate::dublincore::{xml_text, Field, MetadataRecord};
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive path of the core-properties part.
pub const CORE_PROPERTIES_PATH: &str = "docProps/core.xml";

/// Namespaces declared on the rewritten core-properties root.
const CP_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Elements written to `docProps/core.xml`, in order.
const CORE_ELEMENTS: [(&str, Field); 6] = [
    ("dc:title", Field::Title),
    ("dc:creator", Field::Creator),
    ("dc:subject", Field::Subject),
    ("dc:description", Field::Description),
    ("cp:keywords", Field::Keywords),
    ("cp:category", Field::Category),
];

/// Where the container's metadata record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// The archive has no `docProps/core.xml`; defaults were used.
    Missing,
    /// Decoded from the archive by the given strategy.
    Decoded(Strategy),
    /// The entry exists but could not be read or decoded; defaults were used.
    Fallback(String),
}

/// Decode XML bytes handling UTF-8 (with or without BOM) and UTF-16 LE/BE.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec())
            .map_err(|e| Error::InvalidData(format!("invalid UTF-8: {}", e)));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes).map(|s| declare_utf8(&s));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes).map(|s| declare_utf8(&s));
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        // ASCII markup in UTF-16 without a BOM leaves every other byte zero.
        Err(_) if bytes.len() >= 4 && bytes[1] == 0 && bytes[3] == 0 => {
            decode_utf16(bytes, u16::from_le_bytes).map(|s| declare_utf8(&s))
        }
        Err(_) if bytes.len() >= 4 && bytes[0] == 0 && bytes[2] == 0 => {
            decode_utf16(bytes, u16::from_be_bytes).map(|s| declare_utf8(&s))
        }
        Err(_) => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidData(format!("invalid UTF-16: {}", e)))
}

/// Rewrite a UTF-16 encoding declaration once the text is already UTF-8.
fn declare_utf8(content: &str) -> String {
    let Some(end) = content.strip_prefix("<?xml").and(content.find("?>")) else {
        return content.to_string();
    };
    let decl = content[..end]
        .replace("\"UTF-16\"", "\"UTF-8\"")
        .replace("'UTF-16'", "'UTF-8'")
        .replace("\"utf-16\"", "\"UTF-8\"")
        .replace("'utf-16'", "'UTF-8'");
    format!("{}{}", decl, &content[end..])
}

/// Serialize a record as a complete `docProps/core.xml` part.
pub fn core_properties_xml(record: &MetadataRecord) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("cp:coreProperties");
    root.push_attribute(("xmlns:cp", CP_NAMESPACE));
    root.push_attribute(("xmlns:dc", crate::dublincore::DC_NAMESPACE));
    root.push_attribute(("xmlns:dcterms", crate::dublincore::DCTERMS_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    for (tag, field) in CORE_ELEMENTS {
        for value in record.values(field) {
            let value = xml_text(value);
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            writer.write_event(Event::Text(BytesText::new(&value)))?;
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::InvalidData(format!("serialized core properties are not UTF-8: {}", e)))
}

/// A DOCX document held in memory with its decoded metadata.
pub struct DocxContainer {
    path: Option<PathBuf>,
    data: Vec<u8>,
    metadata: MetadataRecord,
    source: MetadataSource,
}

impl DocxContainer {
    /// Open a DOCX file and decode its core properties.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use coreprops::DocxContainer;
    ///
    /// let doc = DocxContainer::open("resume.docx")?;
    /// println!("{:?}", doc.metadata().title);
    /// # Ok::<(), coreprops::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut container = Self::from_bytes(data)?;
        container.path = Some(path.to_path_buf());
        Ok(container)
    }

    /// Create a container from the bytes of a DOCX file.
    ///
    /// Fails only when the bytes are not a ZIP archive. A missing or
    /// undecodable metadata entry yields a default record.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data.as_slice()))
            .map_err(|e| Error::ZipArchive(e.to_string()))?;

        let (metadata, source) = match read_entry(&mut archive, CORE_PROPERTIES_PATH) {
            Ok(None) => {
                debug!("{} not present, using defaults", CORE_PROPERTIES_PATH);
                (MetadataRecord::with_defaults(), MetadataSource::Missing)
            }
            Ok(Some(bytes)) => {
                match decode_xml_bytes(&bytes).and_then(|xml| decode_core_properties(&xml)) {
                    Ok(decoded) => {
                        debug!("decoded {} using {}", CORE_PROPERTIES_PATH, decoded.strategy);
                        (decoded.record, MetadataSource::Decoded(decoded.strategy))
                    }
                    Err(e) => {
                        warn!("could not decode {}, using defaults: {}", CORE_PROPERTIES_PATH, e);
                        (MetadataRecord::with_defaults(), MetadataSource::Fallback(e.to_string()))
                    }
                }
            }
            Err(e) => {
                warn!("could not read {}, using defaults: {}", CORE_PROPERTIES_PATH, e);
                (MetadataRecord::with_defaults(), MetadataSource::Fallback(e.to_string()))
            }
        };
        drop(archive);

        Ok(Self {
            path: None,
            data,
            metadata,
            source,
        })
    }

    /// Path the container was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Original file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Current metadata.
    pub fn metadata(&self) -> &MetadataRecord {
        &self.metadata
    }

    /// Mutable access to the metadata.
    pub fn metadata_mut(&mut self) -> &mut MetadataRecord {
        &mut self.metadata
    }

    /// Replace the metadata written on the next save.
    pub fn set_metadata(&mut self, metadata: MetadataRecord) {
        self.metadata = metadata;
    }

    /// How the metadata was obtained when the container was opened.
    pub fn source(&self) -> &MetadataSource {
        &self.source
    }

    /// Names of all archive entries in stored order.
    pub fn entry_names(&self) -> Result<Vec<String>> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            names.push(archive.by_index_raw(index)?.name().to_string());
        }
        Ok(names)
    }

    /// Text of the original metadata entry, if the archive has one.
    pub fn raw_core_xml(&self) -> Result<Option<String>> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        match read_entry(&mut archive, CORE_PROPERTIES_PATH)? {
            Some(bytes) => decode_xml_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Write the document with updated metadata to `output`.
    ///
    /// `output` may be the path the container was opened from. A failure
    /// part-way leaves a partial file behind.
    pub fn save(&self, output: impl AsRef<Path>) -> Result<()> {
        let output = output.as_ref();
        let file = File::create(output).map_err(|source| Error::Write {
            path: output.to_path_buf(),
            source,
        })?;
        let mut writer = self.save_to_writer(BufWriter::new(file))?;
        writer.flush().map_err(|source| Error::Write {
            path: output.to_path_buf(),
            source,
        })?;
        info!("saved {}", output.display());
        Ok(())
    }

    /// Serialize the updated document into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.save_to_writer(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write the updated document to any seekable writer and return it.
    ///
    /// Every entry except `docProps/core.xml` is copied raw, so its
    /// compressed bytes are unchanged. The metadata entry is replaced in
    /// place, or appended when the source had none.
    pub fn save_to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        let core_xml = core_properties_xml(&self.metadata)?;
        let mut out = ZipWriter::new(writer);
        let mut wrote_core = false;

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let name = entry.name().to_string();

            if name == CORE_PROPERTIES_PATH {
                drop(entry);
                write_core_entry(&mut out, &core_xml)?;
                wrote_core = true;
                continue;
            }

            debug!("copying {}", name);
            out.raw_copy_file(entry)
                .map_err(|e| Error::EntryWrite {
                    name,
                    reason: e.to_string(),
                })?;
        }

        if !wrote_core {
            debug!("appending {}", CORE_PROPERTIES_PATH);
            write_core_entry(&mut out, &core_xml)?;
        }

        out.finish().map_err(|e| Error::EntryWrite {
            name: "central directory".to_string(),
            reason: e.to_string(),
        })
    }
}

fn write_core_entry<W: Write + Seek>(out: &mut ZipWriter<W>, xml: &str) -> Result<()> {
    let to_entry_error = |reason: String| Error::EntryWrite {
        name: CORE_PROPERTIES_PATH.to_string(),
        reason,
    };
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    out.start_file(CORE_PROPERTIES_PATH, options)
        .map_err(|e| to_entry_error(e.to_string()))?;
    out.write_all(xml.as_bytes())
        .map_err(|e| to_entry_error(e.to_string()))
}

/// Read an entry by exact name. `Ok(None)` when it does not exist.
fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

impl std::fmt::Debug for DocxContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocxContainer")
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .field("source", &self.source)
            .finish()
    }
}
