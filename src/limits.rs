//! Limits and constraints for schema compilation
//!
//! Bounds applied while reading and compiling documents. They protect the
//! compiler from pathological inputs: deeply nested or huge documents and
//! inputs that would otherwise produce an unbounded number of diagnostics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Limits configuration for one compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Number of error diagnostics after which compilation stops
    pub max_errors: usize,

    /// Maximum element nesting depth of a document
    pub max_xml_depth: usize,

    /// Maximum document size in bytes
    pub max_xml_size: usize,

    /// Maximum number of attributes per element
    pub max_attributes: usize,

    /// Maximum number of model nodes in one compilation
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_errors: 100,
            max_xml_depth: 256,
            max_xml_size: 64 * 1024 * 1024, // 64 MB
            max_attributes: 256,
            max_nodes: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_errors: 20,
            max_xml_depth: 64,
            max_xml_size: 4 * 1024 * 1024, // 4 MB
            max_attributes: 64,
            max_nodes: 100_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_errors: 10_000,
            max_xml_depth: 4096,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_attributes: 4096,
            max_nodes: 50_000_000,
        }
    }

    /// Set the error threshold
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Load limits from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load limits from a JSON string; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of model nodes is within limits
    pub fn check_nodes(&self, count: usize) -> Result<()> {
        if count > self.max_nodes {
            Err(Error::LimitExceeded(format!(
                "Model node count {} exceeds maximum {}",
                count, self.max_nodes
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_errors, 100);
        assert!(limits.check_xml_depth(100).is_ok());
        assert!(limits.check_xml_depth(300).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.check_attributes(65).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_errors > Limits::default().max_errors);
        assert!(limits.check_xml_depth(1000).is_ok());
    }

    #[test]
    fn test_check_nodes_and_size() {
        let limits = Limits::default();
        assert!(limits.check_nodes(10).is_ok());
        assert!(limits.check_nodes(2_000_000).is_err());
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(128 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_limits_from_json() {
        let limits = Limits::from_json_str(r#"{ "max_errors": 5 }"#).unwrap();
        assert_eq!(limits.max_errors, 5);
        assert_eq!(limits.max_xml_depth, Limits::default().max_xml_depth);

        assert!(Limits::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_limits_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.json");
        std::fs::write(&path, r#"{ "max_errors": 7, "max_attributes": 12 }"#).unwrap();

        let limits = Limits::from_json_file(&path).unwrap();
        assert_eq!(limits.max_errors, 7);
        assert_eq!(limits.max_attributes, 12);
    }
}
