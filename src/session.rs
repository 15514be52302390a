//! Open, edit and save a document in one pass.

use crate::container::DocxContainer;
use crate::dublincore::MetadataRecord;
use crate::edit::{has_changes, EditOutcome, MetadataEditor};
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for [`edit_file`].
#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Write the result here instead of over the input file.
    pub output: Option<PathBuf>,

    /// Copy the input to a backup before overwriting it in place.
    pub backup: bool,

    /// Suffix appended to the input path to name the backup.
    pub backup_suffix: String,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            output: None,
            backup: true,
            backup_suffix: ".backup".to_string(),
        }
    }
}

impl EditOptions {
    /// Create default edit options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit output path.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Enable or disable the in-place backup.
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Set the backup file suffix.
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }
}

/// What [`edit_file`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum EditReport {
    /// The editor was cancelled; nothing was written.
    Cancelled,
    /// The submitted record matches the original; nothing was written.
    Unchanged,
    /// The document was saved.
    Saved {
        output: PathBuf,
        backup: Option<PathBuf>,
        metadata: MetadataRecord,
    },
}

/// Run one edit session on `path`.
///
/// The submitted record always gets the fixed category. When no output
/// path is configured the input is overwritten, after a backup if enabled.
///
/// # Example
///
/// ```no_run
/// use coreprops::{edit_file, EditOptions, EditOutcome, MetadataRecord};
///
/// let mut editor = |record: &MetadataRecord| -> coreprops::Result<EditOutcome> {
///     let mut record = record.clone();
///     record.set_title("Backend Developer");
///     Ok(EditOutcome::Submitted(record))
/// };
/// let _report = edit_file("resume.docx", &EditOptions::new(), &mut editor)?;
/// # Ok::<(), coreprops::Error>(())
/// ```
pub fn edit_file<E: MetadataEditor + ?Sized>(
    path: impl AsRef<Path>,
    options: &EditOptions,
    editor: &mut E,
) -> Result<EditReport> {
    let path = path.as_ref();
    let mut container = DocxContainer::open(path)?;
    let original = container.metadata().clone();

    let mut updated = match editor.edit(&original)? {
        EditOutcome::Cancelled => return Ok(EditReport::Cancelled),
        EditOutcome::Submitted(record) => record,
    };
    updated.enforce_category();

    if !has_changes(&original, &updated) {
        return Ok(EditReport::Unchanged);
    }

    let (output, backup) = match &options.output {
        Some(output) => (output.clone(), None),
        None if options.backup => {
            let backup = create_backup(path, container.bytes(), &options.backup_suffix)?;
            (path.to_path_buf(), Some(backup))
        }
        None => (path.to_path_buf(), None),
    };

    container.set_metadata(updated);
    container.save(&output)?;

    Ok(EditReport::Saved {
        output,
        backup,
        metadata: container.metadata().clone(),
    })
}

/// Write `bytes` to `<path><suffix>` and return the backup path.
pub fn create_backup(path: &Path, bytes: &[u8], suffix: &str) -> Result<PathBuf> {
    let backup = backup_path(path, suffix);
    fs::write(&backup, bytes).map_err(|source| Error::Write {
        path: backup.clone(),
        source,
    })?;
    info!("created backup {}", backup.display());
    Ok(backup)
}

/// `<path><suffix>`, keeping the original extension.
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
