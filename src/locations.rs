//! Source locations
//!
//! Positions of model elements inside their source documents, and the
//! identifiers used to name those documents in diagnostics.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// One-based line and column of an element or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct LineInfo {
    /// Line number (1-based, 0 when unknown)
    pub line: u32,
    /// Column number (1-based, 0 when unknown)
    pub column: u32,
}

impl LineInfo {
    /// Create a new position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Position used for synthetic nodes that have no source text
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether this position points into real source text
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for LineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source of a document - a file path or a caller supplied name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// String identifier (for in-memory documents)
    Named(String),
}

impl Location {
    /// Create a location from a string (paths are detected by shape)
    pub fn from_str(s: &str) -> Self {
        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') {
            Location::Path(path)
        } else {
            Location::Named(s.to_string())
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Named(s) => s.clone(),
        }
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

/// Converts byte offsets of a source text into line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `text`
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Position of the byte at `offset`
    pub fn line_info(&self, offset: usize) -> LineInfo {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[line];
        LineInfo::new(line as u32 + 1, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_path() {
        let loc = Location::from_str("/tmp/model.csdl");
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::Named("inline".to_string());
        assert_eq!(loc.as_str(), "inline");
        assert!(!loc.is_file());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("<a>\n  <b/>\n</a>");
        assert_eq!(index.line_info(0), LineInfo::new(1, 1));
        assert_eq!(index.line_info(4), LineInfo::new(2, 1));
        assert_eq!(index.line_info(6), LineInfo::new(2, 3));
        assert_eq!(index.line_info(11), LineInfo::new(3, 1));
    }

    #[test]
    fn test_line_info_display() {
        assert_eq!(LineInfo::new(3, 14).to_string(), "3:14");
        assert!(!LineInfo::unknown().is_known());
    }
}
