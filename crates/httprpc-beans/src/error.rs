//! Error types for the adapter crate.

use thiserror::Error;

/// Errors raised while reading from an adapted data source.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// `next_row` was called on a sequence with no remaining rows.
    #[error("no more rows in sequence")]
    Exhausted,

    /// The operation would require materializing a one-pass stream.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// The underlying cursor or driver reported a failure.
    #[error("data source error: {0}")]
    Source(String),

    /// A stage of the cascading close failed.
    #[error("failed to close {stage}: {message}")]
    Close { stage: String, message: String },

    /// An XML document could not be parsed.
    #[error("invalid XML document: {0}")]
    Xml(String),
}

impl AdapterError {
    /// Builds a [`AdapterError::Source`] from any displayable driver error.
    pub fn source(err: impl std::fmt::Display) -> Self {
        AdapterError::Source(err.to_string())
    }

    /// Builds a [`AdapterError::Xml`] from a parser error.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        AdapterError::Xml(err.to_string())
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_error_names_stage() {
        let err = AdapterError::Close {
            stage: "statement".into(),
            message: "already gone".into(),
        };
        assert_eq!(err.to_string(), "failed to close statement: already gone");
    }

    #[test]
    fn source_helper_keeps_message() {
        let err = AdapterError::source("connection reset");
        assert!(matches!(err, AdapterError::Source(ref m) if m == "connection reset"));
    }
}
