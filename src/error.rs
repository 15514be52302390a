//! Error types for the coreprops library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for coreprops operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or rewriting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without a more specific location.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The buffer is not a readable ZIP archive.
    #[error("not a valid archive: {0}")]
    ZipArchive(String),

    /// An archive entry could not be written to the destination.
    #[error("failed to write entry {name}: {reason}")]
    EntryWrite { name: String, reason: String },

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Well-formed XML whose root element is not the expected one.
    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot { expected: String, found: String },

    /// Invalid or malformed data in the document.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A required document component is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// Error while rendering metadata for output.
    #[error("Render error: {0}")]
    Render(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path missing or unreadable, write failure.
    Io,
    /// Not a valid archive, or content unusable by every decoder.
    Format,
    /// Malformed XML. Also a format error.
    Parse,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Read { .. } | Error::Write { .. } | Error::EntryWrite { .. } => {
                ErrorKind::Io
            }
            Error::XmlParse(_) | Error::UnexpectedRoot { .. } => ErrorKind::Parse,
            Error::ZipArchive(_)
            | Error::InvalidData(_)
            | Error::MissingComponent(_)
            | Error::Render(_) => ErrorKind::Format,
        }
    }

    /// True for archive and XML errors.
    pub fn is_format_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Format | ErrorKind::Parse)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::ZipArchive(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Error::XmlParse(err.to_string())
    }
}
