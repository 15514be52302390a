//! Integration tests for reading and rewriting DOCX core properties.
//!
//! Documents are built in memory with `zip::ZipWriter`, so no fixture files
//! are needed.

use coreprops::{
    edit_file, DocxContainer, EditOptions, EditOutcome, EditReport, Error, MetadataEditor,
    MetadataRecord, MetadataSource, Result, Strategy, CORE_PROPERTIES_PATH, DOCX_MIME_TYPE,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

const DOCUMENT: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p></w:body></w:document>"#;

/// Build a DOCX-like archive. Entries are stored or deflated alternately.
fn build_docx(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (i, (name, data)) in entries.iter().enumerate() {
        let method = if i % 2 == 0 {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default().compression_method(method);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn sample_docx(core: Option<&str>) -> Vec<u8> {
    let image: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", "<Relationships/>".as_bytes()),
        ("word/document.xml", DOCUMENT.as_bytes()),
    ];
    if let Some(core) = core {
        entries.push((CORE_PROPERTIES_PATH, core.as_bytes()));
    }
    entries.push(("word/media/image1.png", image.as_slice()));
    entries.push(("docProps/app.xml", "<Properties/>".as_bytes()));
    build_docx(&entries)
}

/// SHA-256 of every entry's decompressed content, keyed by name.
fn entry_hashes(data: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut hashes = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        hashes.insert(file.name().to_string(), Sha256::digest(&content).to_vec());
    }
    hashes
}

fn entry_names(data: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn read_entry(data: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

/// Editor that applies a fixed change, counting how often it is invoked.
struct ScriptedEditor {
    title: Option<&'static str>,
    cancel: bool,
    calls: usize,
}

impl ScriptedEditor {
    fn set_title(title: &'static str) -> Self {
        Self {
            title: Some(title),
            cancel: false,
            calls: 0,
        }
    }

    fn cancel() -> Self {
        Self {
            title: None,
            cancel: true,
            calls: 0,
        }
    }

    fn no_op() -> Self {
        Self {
            title: None,
            cancel: false,
            calls: 0,
        }
    }
}

impl MetadataEditor for ScriptedEditor {
    fn edit(&mut self, record: &MetadataRecord) -> Result<EditOutcome> {
        self.calls += 1;
        if self.cancel {
            return Ok(EditOutcome::Cancelled);
        }
        let mut record = record.clone();
        if let Some(title) = self.title {
            record.set_title(title);
        }
        Ok(EditOutcome::Submitted(record))
    }
}

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_example_scenario() {
    let source = sample_docx(Some(
        "<coreProperties><dc:title>Old</dc:title></coreProperties>",
    ));
    let mut doc = DocxContainer::from_bytes(source.clone()).unwrap();
    assert_eq!(doc.metadata().title, vec!["Old"]);

    doc.metadata_mut().set_title("New Role");
    doc.metadata_mut().enforce_category();
    let saved = doc.to_bytes().unwrap();

    let core = read_entry(&saved, CORE_PROPERTIES_PATH);
    assert!(core.contains("<dc:title>New Role</dc:title>"), "{}", core);
    assert!(core.contains("<cp:category>curriculo</cp:category>"), "{}", core);

    let before = entry_hashes(&source);
    let after = entry_hashes(&saved);
    for (name, hash) in &before {
        if name != CORE_PROPERTIES_PATH {
            assert_eq!(after.get(name), Some(hash), "entry {} changed", name);
        }
    }
    assert_ne!(before[CORE_PROPERTIES_PATH], after[CORE_PROPERTIES_PATH]);
}

const CP_ONLY_CORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties">
<cp:title>Data Engineer</cp:title>
<cp:creator>Ana Lima</cp:creator>
<cp:keywords>SQL</cp:keywords>
<cp:keywords>Spark</cp:keywords>
<cp:description>Pipelines and more</cp:description>
<cp:category>resume</cp:category>
</cp:coreProperties>"#;

fn assert_cp_only_fields(record: &MetadataRecord) {
    assert_eq!(record.title, vec!["Data Engineer"]);
    assert_eq!(record.creator, vec!["Ana Lima"]);
    assert_eq!(record.keywords, vec!["SQL", "Spark"]);
    assert_eq!(record.description, vec!["Pipelines and more"]);
    assert_eq!(record.category, vec!["resume"]);
}

#[test]
fn test_cp_prefixed_only_document() {
    let doc = DocxContainer::from_bytes(sample_docx(Some(CP_ONLY_CORE))).unwrap();
    assert!(matches!(doc.source(), MetadataSource::Decoded(_)));
    assert_cp_only_fields(doc.metadata());
}

#[test]
fn test_cp_prefixed_only_malformed_uses_tag_scan() {
    // Unclosed root: the XML parse fails and the text scan takes over.
    let core = CP_ONLY_CORE.replace("</cp:coreProperties>", "");
    let doc = DocxContainer::from_bytes(sample_docx(Some(&core))).unwrap();
    assert_eq!(doc.source(), &MetadataSource::Decoded(Strategy::TagScan));
    assert_cp_only_fields(doc.metadata());
}

#[test]
fn test_dublin_core_entry_survives_save() {
    let mut source = MetadataRecord::default();
    source.set_title("T");
    source.add_keyword("rust");
    source.language = vec!["pt-BR".to_string()];
    let core = source.to_xml().unwrap();

    let doc = DocxContainer::from_bytes(sample_docx(Some(&core))).unwrap();
    assert_eq!(doc.source(), &MetadataSource::Decoded(Strategy::DublinCore));
    assert_eq!(doc.metadata().keywords, vec!["rust"]);
    assert_eq!(doc.metadata().language, vec!["pt-BR"]);

    let saved = doc.to_bytes().unwrap();
    let written = read_entry(&saved, CORE_PROPERTIES_PATH);
    assert!(written.contains("<cp:keywords>rust</cp:keywords>"), "{}", written);

    let reopened = DocxContainer::from_bytes(saved).unwrap();
    assert_eq!(reopened.metadata().title, vec!["T"]);
    assert_eq!(reopened.metadata().keywords, vec!["rust"]);
}

#[test]
fn test_control_characters_are_not_written() {
    let mut doc = DocxContainer::from_bytes(sample_docx(None)).unwrap();
    doc.metadata_mut().set_title("a\u{1}b");
    let saved = doc.to_bytes().unwrap();

    let written = read_entry(&saved, CORE_PROPERTIES_PATH);
    assert!(!written.contains('\u{1}'));
    let reopened = DocxContainer::from_bytes(saved).unwrap();
    assert_eq!(reopened.source(), &MetadataSource::Decoded(Strategy::Structured));
    assert_eq!(reopened.metadata().title, vec!["a\u{FFFD}b"]);
}

#[test]
fn test_standard_word_core_properties() {
    let core = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Curriculum</dc:title><dc:subject></dc:subject><dc:creator>Maria</dc:creator><cp:keywords>go, backend</cp:keywords><dc:description></dc:description><cp:lastModifiedBy>Maria</cp:lastModifiedBy><cp:revision>3</cp:revision><dcterms:created xsi:type="dcterms:W3CDTF">2024-05-01T10:00:00Z</dcterms:created></cp:coreProperties>"#;
    let doc = DocxContainer::from_bytes(sample_docx(Some(core))).unwrap();
    let record = doc.metadata();

    assert_eq!(doc.source(), &MetadataSource::Decoded(Strategy::Structured));
    assert_eq!(record.title, vec!["Curriculum"]);
    assert_eq!(record.creator, vec!["Maria"]);
    assert_eq!(record.keywords, vec!["go, backend"]);
    assert_eq!(record.subject, vec![""]);
}

#[test]
fn test_missing_metadata_yields_defaults() {
    let doc = DocxContainer::from_bytes(sample_docx(None)).unwrap();
    let record = doc.metadata();

    assert_eq!(doc.source(), &MetadataSource::Missing);
    assert_eq!(record.format, vec![DOCX_MIME_TYPE]);
    assert_eq!(record.category, vec!["curriculo"]);
    assert_eq!(record.date.len(), 1);
    assert!(chrono_like_timestamp(&record.date[0]));

    let mut expected = MetadataRecord::with_defaults();
    expected.date = record.date.clone();
    assert_eq!(record, &expected);
}

fn chrono_like_timestamp(value: &str) -> bool {
    // YYYY-MM-DDTHH:MM:SS followed by a zone designator
    value.len() >= 20 && value.as_bytes()[4] == b'-' && value.as_bytes()[10] == b'T'
}

#[test]
fn test_invalid_input_is_format_error() {
    let err =
        DocxContainer::from_bytes(b"This is an exported RTF, not a DOCX".to_vec()).unwrap_err();
    assert!(matches!(err, Error::ZipArchive(_)));
    assert!(err.is_format_error());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.docx");
    fs::write(&path, b"{\\rtf1 not a zip}").unwrap();
    let err = DocxContainer::open(&path).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_utf16_core_properties() {
    let text = r#"<?xml version="1.0" encoding="UTF-16"?><coreProperties><title>Wide</title></coreProperties>"#;
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let data = build_docx(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        (CORE_PROPERTIES_PATH, bytes.as_slice()),
    ]);
    let doc = DocxContainer::from_bytes(data).unwrap();
    assert_eq!(doc.metadata().title, vec!["Wide"]);
}

// =============================================================================
// Saving
// =============================================================================

#[test]
fn test_save_preserves_other_entries() {
    let core = "<coreProperties><title>T</title><creator>C</creator></coreProperties>";
    let source = sample_docx(Some(core));
    let mut doc = DocxContainer::from_bytes(source.clone()).unwrap();
    doc.metadata_mut().add_keyword("rust");
    let saved = doc.to_bytes().unwrap();

    assert_eq!(entry_names(&source), entry_names(&saved));

    let before = entry_hashes(&source);
    let after = entry_hashes(&saved);
    assert_eq!(before.len(), after.len());
    for (name, hash) in &before {
        if name == CORE_PROPERTIES_PATH {
            assert_ne!(&after[name], hash);
        } else {
            assert_eq!(&after[name], hash, "entry {} changed", name);
        }
    }

    // Raw-copied entries keep their compression method.
    let mut src = ZipArchive::new(Cursor::new(source.as_slice())).unwrap();
    let mut out = ZipArchive::new(Cursor::new(saved.as_slice())).unwrap();
    for name in ["word/document.xml", "word/media/image1.png", "_rels/.rels"] {
        let a = src.by_name(name).unwrap().compression();
        let b = out.by_name(name).unwrap().compression();
        assert_eq!(a, b, "compression of {} changed", name);
    }
}

#[test]
fn test_saved_document_reopens() {
    let source = sample_docx(Some("<coreProperties><title>T</title></coreProperties>"));
    let mut doc = DocxContainer::from_bytes(source).unwrap();
    doc.metadata_mut().set_title("Reopened");
    doc.metadata_mut().set_creators(["A", "B"]);
    doc.metadata_mut().set_keywords(["k1", "k2"]);
    doc.metadata_mut().set_description("desc");
    doc.metadata_mut().enforce_category();

    let reopened = DocxContainer::from_bytes(doc.to_bytes().unwrap()).unwrap();
    let record = reopened.metadata();
    assert_eq!(reopened.source(), &MetadataSource::Decoded(Strategy::Structured));
    assert_eq!(record.title, vec!["Reopened"]);
    assert_eq!(record.creator, vec!["A", "B"]);
    assert_eq!(record.keywords, vec!["k1", "k2"]);
    assert_eq!(record.description, vec!["desc"]);
    assert_eq!(record.category, vec!["curriculo"]);
}

#[test]
fn test_save_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.docx");
    let source = sample_docx(Some("<coreProperties><title>Before</title></coreProperties>"));
    fs::write(&path, &source).unwrap();

    let mut doc = DocxContainer::open(&path).unwrap();
    doc.metadata_mut().set_title("After");
    doc.save(&path).unwrap();

    let reopened = DocxContainer::open(&path).unwrap();
    assert_eq!(reopened.metadata().title, vec!["After"]);

    let written = fs::read(&path).unwrap();
    let before = entry_hashes(&source);
    let after = entry_hashes(&written);
    assert_eq!(before["word/document.xml"], after["word/document.xml"]);
}

#[test]
fn test_save_to_unwritable_path() {
    let doc = DocxContainer::from_bytes(sample_docx(None)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = doc
        .save(dir.path().join("missing-dir").join("out.docx"))
        .unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
}

// =============================================================================
// Edit sessions
// =============================================================================

#[test]
fn test_edit_in_place_creates_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cv.docx");
    let source = sample_docx(Some("<coreProperties><title>Old</title></coreProperties>"));
    fs::write(&path, &source).unwrap();

    let mut editor = ScriptedEditor::set_title("New Role");
    let report = edit_file(&path, &EditOptions::new(), &mut editor).unwrap();
    assert_eq!(editor.calls, 1);

    let backup = dir.path().join("cv.docx.backup");
    match report {
        EditReport::Saved {
            output,
            backup: Some(written_backup),
            metadata,
        } => {
            assert_eq!(output, path);
            assert_eq!(written_backup, backup);
            assert_eq!(metadata.title, vec!["New Role"]);
            assert_eq!(metadata.category, vec!["curriculo"]);
        }
        other => panic!("unexpected report: {:?}", other),
    }

    assert_eq!(fs::read(&backup).unwrap(), source);
    let core = read_entry(&fs::read(&path).unwrap(), CORE_PROPERTIES_PATH);
    assert!(core.contains("<dc:title>New Role</dc:title>"));
}

#[test]
fn test_edit_to_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.docx");
    let output = dir.path().join("out.docx");
    let source = sample_docx(Some("<coreProperties><title>Old</title></coreProperties>"));
    fs::write(&input, &source).unwrap();

    let options = EditOptions::new().with_output(&output);
    let report = edit_file(&input, &options, &mut ScriptedEditor::set_title("Other")).unwrap();
    assert!(matches!(report, EditReport::Saved { backup: None, .. }));

    assert_eq!(fs::read(&input).unwrap(), source);
    assert!(!dir.path().join("in.docx.backup").exists());
    let reopened = DocxContainer::open(&output).unwrap();
    assert_eq!(reopened.metadata().title, vec!["Other"]);
}

#[test]
fn test_cancelled_edit_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cv.docx");
    let source = sample_docx(Some("<coreProperties><title>Old</title></coreProperties>"));
    fs::write(&path, &source).unwrap();

    let report = edit_file(&path, &EditOptions::new(), &mut ScriptedEditor::cancel()).unwrap();
    assert_eq!(report, EditReport::Cancelled);
    assert_eq!(fs::read(&path).unwrap(), source);
    assert!(!dir.path().join("cv.docx.backup").exists());
}

#[test]
fn test_unchanged_edit_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cv.docx");
    let core = "<coreProperties><title>Same</title><category>curriculo</category></coreProperties>";
    let source = sample_docx(Some(core));
    fs::write(&path, &source).unwrap();

    let report = edit_file(&path, &EditOptions::new(), &mut ScriptedEditor::no_op()).unwrap();
    assert_eq!(report, EditReport::Unchanged);
    assert_eq!(fs::read(&path).unwrap(), source);
}

#[test]
fn test_category_is_enforced_on_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cv.docx");
    let core = "<coreProperties><title>Same</title><category>other</category></coreProperties>";
    fs::write(&path, sample_docx(Some(core))).unwrap();

    let mut editor = |record: &MetadataRecord| -> Result<EditOutcome> {
        let mut record = record.clone();
        record.category = vec!["user supplied".to_string()];
        Ok(EditOutcome::Submitted(record))
    };
    let report = edit_file(&path, &EditOptions::new().with_backup(false), &mut editor).unwrap();
    match report {
        EditReport::Saved { metadata, backup, .. } => {
            assert_eq!(metadata.category, vec!["curriculo"]);
            assert!(backup.is_none());
        }
        other => panic!("unexpected report: {:?}", other),
    }
}

#[test]
fn test_edit_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut editor = ScriptedEditor::no_op();
    let err =
        edit_file(dir.path().join("nope.docx"), &EditOptions::new(), &mut editor).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert_eq!(editor.calls, 0);
}
