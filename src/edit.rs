//! Interface to the interactive metadata editor.
//!
//! The editor is an external collaborator: it receives the current record,
//! blocks on user input, and either submits a new record or cancels.

use crate::dublincore::MetadataRecord;
use crate::error::Result;

/// Maximum length accepted for the description input.
pub const DESCRIPTION_CHAR_LIMIT: usize = 200;

/// Result of an editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The user submitted the form; the record reflects their input.
    Submitted(MetadataRecord),
    /// The user cancelled; the original record stays untouched.
    Cancelled,
}

/// Something that lets a user edit a metadata record.
pub trait MetadataEditor {
    /// Present `record` for editing and wait for the user to finish.
    fn edit(&mut self, record: &MetadataRecord) -> Result<EditOutcome>;
}

impl<F> MetadataEditor for F
where
    F: FnMut(&MetadataRecord) -> Result<EditOutcome>,
{
    fn edit(&mut self, record: &MetadataRecord) -> Result<EditOutcome> {
        self(record)
    }
}

/// Raw text of the four editable form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub title: String,
    /// Comma-separated creators.
    pub creators: String,
    /// Comma-separated keywords.
    pub keywords: String,
    pub description: String,
}

impl FormInput {
    /// Pre-fill the form from a record.
    pub fn from_record(record: &MetadataRecord) -> Self {
        Self {
            title: record.title.first().cloned().unwrap_or_default(),
            creators: record.creator.join(", "),
            keywords: record.keywords.join(", "),
            description: record.description.first().cloned().unwrap_or_default(),
        }
    }

    /// Write the form values into `record`.
    ///
    /// Blank inputs leave their field unchanged. List inputs are split on
    /// commas and replace the whole list. The description is truncated to
    /// [`DESCRIPTION_CHAR_LIMIT`] characters.
    pub fn apply(&self, record: &mut MetadataRecord) {
        let title = self.title.trim();
        if !title.is_empty() {
            record.set_title(title);
        }

        let creators = split_list(&self.creators);
        if !creators.is_empty() {
            record.set_creators(creators);
        }

        let keywords = split_list(&self.keywords);
        if !keywords.is_empty() {
            record.set_keywords(keywords);
        }

        let description = self.description.trim();
        if !description.is_empty() {
            let truncated: String = description.chars().take(DESCRIPTION_CHAR_LIMIT).collect();
            record.set_description(truncated);
        }
    }
}

/// Split a comma-separated input, trimming items and dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Whether any user-editable field differs between two records.
///
/// Compares title, creator, keywords, description and category as ordered
/// lists, so `["a,b"]` and `["a", "b"]` are different.
pub fn has_changes(original: &MetadataRecord, updated: &MetadataRecord) -> bool {
    original.title != updated.title
        || original.creator != updated.creator
        || original.keywords != updated.keywords
        || original.description != updated.description
        || original.category != updated.category
}
