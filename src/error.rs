//! Error types for edmschema
//!
//! Problems found in a model are never returned as `Err`: they are collected as
//! [`Diagnostic`](crate::diagnostics::Diagnostic) records. The [`Error`] type in
//! this module covers the conditions that stop a document from being read at
//! all (I/O failures, malformed XML, configured limits).

use thiserror::Error;

/// Result type alias using the edmschema [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for edmschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a document or configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// A configured processing limit was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Value error (invalid value supplied through the API)
    #[error("value error: {0}")]
    Value(String),

    /// Configuration could not be decoded
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::LimitExceeded("XML depth 12 exceeds maximum 10".to_string());
        assert_eq!(err.to_string(), "limit exceeded: XML depth 12 exceeds maximum 10");

        let err = Error::Xml("unexpected end of document".to_string());
        assert!(err.to_string().starts_with("XML error:"));
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csdl");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
