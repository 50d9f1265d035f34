//! Error types for YAML parsing.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for simcfg-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a YAML document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error reported by the scanner.
    #[error("parse error: {message}")]
    ParseError {
        message: String,
        location: Option<SourceInfo>,
    },

    /// The input ended before a document was produced.
    #[error("unexpected end of input")]
    UnexpectedEof { location: Option<SourceInfo> },

    /// The event stream produced an impossible structure.
    #[error("invalid YAML structure: {message}")]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        let marker = *err.marker();
        Error::ParseError {
            message: err.to_string(),
            location: Some(SourceInfo::from_marker(&marker, 0)),
        }
    }
}
