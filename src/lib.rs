//! # coreprops
//!
//! Read and rewrite the core properties (`docProps/core.xml`) of DOCX files.
//!
//! The metadata entry is decoded tolerantly, since producers disagree on
//! namespace prefixes, and written back with every other archive entry
//! copied byte-for-byte.
//!
//! ## Quick Start
//!
//! ```no_run
//! use coreprops::DocxContainer;
//!
//! let mut doc = DocxContainer::open("resume.docx")?;
//! println!("Title: {:?}", doc.metadata().title);
//!
//! doc.metadata_mut().set_title("Senior Backend Developer");
//! doc.metadata_mut().enforce_category();
//! doc.save("resume-updated.docx")?;
//! # Ok::<(), coreprops::Error>(())
//! ```
//!
//! ## Edit sessions
//!
//! [`edit_file`] runs the full open, edit, backup and save cycle against
//! any [`MetadataEditor`], such as an interactive terminal form.

pub mod container;
pub mod decode;
pub mod dublincore;
pub mod edit;
pub mod error;
pub mod render;
pub mod session;

// Re-exports
pub use container::{DocxContainer, MetadataSource, CORE_PROPERTIES_PATH};
pub use decode::{decode_core_properties, Decoded, Strategy};
pub use dublincore::{Field, MetadataRecord, DOCX_MIME_TYPE, FIXED_CATEGORY};
pub use edit::{has_changes, EditOutcome, FormInput, MetadataEditor};
pub use error::{Error, ErrorKind, Result};
pub use render::JsonFormat;
pub use session::{edit_file, EditOptions, EditReport};

use std::path::Path;

/// Read the metadata of a DOCX file.
///
/// # Example
///
/// ```no_run
/// let record = coreprops::read_metadata("resume.docx")?;
/// println!("{:?}", record.creator);
/// # Ok::<(), coreprops::Error>(())
/// ```
pub fn read_metadata(path: impl AsRef<Path>) -> Result<MetadataRecord> {
    Ok(DocxContainer::open(path)?.metadata().clone())
}

/// Render the metadata of a DOCX file as JSON.
pub fn to_json(path: impl AsRef<Path>, format: JsonFormat) -> Result<String> {
    let record = read_metadata(path)?;
    render::to_json(&record, format)
}
