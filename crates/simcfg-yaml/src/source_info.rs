//! Source location information for YAML nodes.

use serde::{Deserialize, Serialize};

/// Position of a YAML element in the original source text.
///
/// Carried by every node so that resolution errors can point back at the
/// exact place in the configuration file they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Filename or other source identifier, when known.
    pub file: Option<String>,

    /// Byte offset from the start of the source (0-based).
    pub offset: usize,

    /// Line number (1-based).
    pub line: usize,

    /// Column number (1-based).
    pub col: usize,

    /// Length in bytes.
    pub len: usize,
}

impl SourceInfo {
    pub fn new(file: Option<String>, offset: usize, line: usize, col: usize, len: usize) -> Self {
        Self {
            file,
            offset,
            line,
            col,
            len,
        }
    }

    /// Build a SourceInfo from a `yaml-rust2` marker.
    ///
    /// Markers only carry a start position; the length is supplied by the
    /// caller. yaml-rust2 lines are already 1-based; columns are 0-based and
    /// shifted to our 1-based convention.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker, len: usize) -> Self {
        Self {
            file: None,
            offset: marker.index(),
            line: marker.line(),
            col: marker.col() + 1,
            len,
        }
    }

    /// Attach a filename to this location.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// End offset (exclusive) of this location.
    pub fn end_offset(&self) -> usize {
        self.offset + self.len
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            file: None,
            offset: 0,
            line: 1,
            col: 1,
            len: 0,
        }
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "{}:{}", self.line, self.col),
        }
    }
}
