//! Error types for template serialization.
//!
//! Every [`TemplateError`] is fatal: rendering stops at the first one and
//! whatever was already written to the sink stays written. Callers that need
//! all-or-nothing output should render into a `String` first.

use std::io;

use httprpc_beans::AdapterError;
use thiserror::Error;

/// Errors raised while rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The top-level template could not be found by the loader.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// An include referenced by the template could not be found.
    #[error("include not found: {0}")]
    IncludeNotFound(String),

    /// The character stream ended inside a marker.
    #[error("unexpected end of character stream")]
    UnexpectedEof,

    /// A marker was not closed with `}}`.
    #[error("improperly terminated marker")]
    ImproperlyTerminated,

    /// A marker had no name.
    #[error("invalid marker")]
    InvalidMarker,

    /// A section name resolved to something other than a sequence.
    #[error("invalid section element: {0}")]
    InvalidSection(String),

    /// A variable resolved to a dictionary or a sequence.
    #[error("invalid variable: {0}")]
    InvalidVariable(String),

    /// A section end named a different section than the one open.
    #[error("invalid closing section marker: expected {expected}, found {found}")]
    InvalidClosingSection { expected: String, found: String },

    /// A section end appeared with no section open.
    #[error("section end without matching start: {0}")]
    UnmatchedSectionEnd(String),

    /// The stream ended while a section was still open.
    #[error("unterminated section: {0}")]
    UnterminatedSection(String),

    /// An include (directly or indirectly) includes itself.
    #[error("recursive include: {0}")]
    RecursiveInclude(String),

    /// The output sink reported a write failure.
    #[error("error writing to output stream: {0}")]
    Output(String),

    /// Reading a template or bundle failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A data source backing a section failed.
    #[error("data source error: {0}")]
    Source(#[from] AdapterError),
}

impl From<TemplateError> for io::Error {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Io(err) => err,
            TemplateError::TemplateNotFound(_) | TemplateError::IncludeNotFound(_) => {
                io::Error::new(io::ErrorKind::NotFound, err)
            }
            TemplateError::Output(_) => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
