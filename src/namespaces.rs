//! XML namespace handling
//!
//! Qualified element/attribute names, the grammar namespaces of the three
//! schema dialects and the version epoch each namespace declares.

use std::fmt;

use serde::Serialize;

/// Conceptual model namespace, version 1.0
pub const CSDL_V1_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2006/04/edm";
/// Conceptual model namespace, version 1.1
pub const CSDL_V1_1_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2007/05/edm";
/// Conceptual model namespace, version 2.0
pub const CSDL_V2_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2008/09/edm";
/// Conceptual model namespace, version 3.0
pub const CSDL_V3_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2009/11/edm";

/// Storage model namespace, version 1.0
pub const SSDL_V1_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2006/04/edm/ssdl";
/// Storage model namespace, version 2.0
pub const SSDL_V2_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2009/02/edm/ssdl";
/// Storage model namespace, version 3.0
pub const SSDL_V3_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2009/11/edm/ssdl";

/// Provider manifest namespace
pub const PROVIDER_MANIFEST_NAMESPACE: &str =
    "http://schemas.microsoft.com/ado/2006/04/edm/providermanifest";

/// Annotation namespace (StoreGeneratedPattern, LazyLoadingEnabled)
pub const ANNOTATION_NAMESPACE: &str = "http://schemas.microsoft.com/ado/2009/02/edm/annotation";

/// Store schema generator namespace (store:Schema, store:Name, store:Type)
pub const STORE_GENERATOR_NAMESPACE: &str =
    "http://schemas.microsoft.com/ado/2007/12/edm/EntityStoreSchemaGenerator";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of the EDM primitive types
pub const EDM_NAMESPACE: &str = "Edm";

/// Namespaces no user document may declare or alias
pub const RESERVED_NAMESPACES: &[&str] = &[EDM_NAMESPACE, "Transient", "System"];

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Whether this name is `local_name` in the given namespace
    pub fn is(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// The three schema dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// Conceptual model (CSDL)
    Conceptual,
    /// Storage model (SSDL)
    Storage,
    /// Provider capability manifest
    ProviderManifest,
}

impl Dialect {
    /// Get the dialect as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Conceptual => "conceptual",
            Dialect::Storage => "storage",
            Dialect::ProviderManifest => "provider manifest",
        }
    }

    /// Local name of the root element of a document in this dialect
    pub fn root_element(&self) -> &'static str {
        match self {
            Dialect::Conceptual | Dialect::Storage => "Schema",
            Dialect::ProviderManifest => "ProviderManifest",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema version epoch declared by a document namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SchemaVersion {
    /// Version 1.0
    V1_0,
    /// Version 1.1
    V1_1,
    /// Version 2.0
    V2_0,
    /// Version 3.0
    V3_0,
}

impl SchemaVersion {
    /// Get the version as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1_0 => "1.0",
            SchemaVersion::V1_1 => "1.1",
            SchemaVersion::V2_0 => "2.0",
            SchemaVersion::V3_0 => "3.0",
        }
    }

    /// Epochs up to 1.1 use the older referential constraint rules
    pub fn uses_v1_constraint_rules(&self) -> bool {
        *self <= SchemaVersion::V1_1
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dialect and version declared by a root element namespace
pub fn dialect_of(namespace: &str) -> Option<(Dialect, SchemaVersion)> {
    let found = match namespace {
        CSDL_V1_NAMESPACE => (Dialect::Conceptual, SchemaVersion::V1_0),
        CSDL_V1_1_NAMESPACE => (Dialect::Conceptual, SchemaVersion::V1_1),
        CSDL_V2_NAMESPACE => (Dialect::Conceptual, SchemaVersion::V2_0),
        CSDL_V3_NAMESPACE => (Dialect::Conceptual, SchemaVersion::V3_0),
        SSDL_V1_NAMESPACE => (Dialect::Storage, SchemaVersion::V1_0),
        SSDL_V2_NAMESPACE => (Dialect::Storage, SchemaVersion::V2_0),
        SSDL_V3_NAMESPACE => (Dialect::Storage, SchemaVersion::V3_0),
        PROVIDER_MANIFEST_NAMESPACE => (Dialect::ProviderManifest, SchemaVersion::V1_0),
        _ => return None,
    };
    Some(found)
}

/// Grammar namespace of a dialect at a version
pub fn namespace_of(dialect: Dialect, version: SchemaVersion) -> &'static str {
    match (dialect, version) {
        (Dialect::Conceptual, SchemaVersion::V1_0) => CSDL_V1_NAMESPACE,
        (Dialect::Conceptual, SchemaVersion::V1_1) => CSDL_V1_1_NAMESPACE,
        (Dialect::Conceptual, SchemaVersion::V2_0) => CSDL_V2_NAMESPACE,
        (Dialect::Conceptual, SchemaVersion::V3_0) => CSDL_V3_NAMESPACE,
        (Dialect::Storage, SchemaVersion::V1_0 | SchemaVersion::V1_1) => SSDL_V1_NAMESPACE,
        (Dialect::Storage, SchemaVersion::V2_0) => SSDL_V2_NAMESPACE,
        (Dialect::Storage, SchemaVersion::V3_0) => SSDL_V3_NAMESPACE,
        (Dialect::ProviderManifest, _) => PROVIDER_MANIFEST_NAMESPACE,
    }
}

/// Whether `namespace` belongs to the grammar itself rather than to an extension
pub fn is_grammar_namespace(namespace: Option<&str>) -> bool {
    match namespace {
        None => true,
        Some(ns) => dialect_of(ns).is_some(),
    }
}

/// Whether `name` is a reserved namespace (compared ordinally)
pub fn is_reserved_namespace(name: &str) -> bool {
    RESERVED_NAMESPACES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced(CSDL_V2_NAMESPACE, "EntityType");
        assert_eq!(qname.namespace.as_deref(), Some(CSDL_V2_NAMESPACE));
        assert!(qname.is(Some(CSDL_V2_NAMESPACE), "EntityType"));
        assert!(!qname.is(None, "EntityType"));
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("urn:x", "Foo");
        assert_eq!(qname.to_string(), "{urn:x}Foo");
        assert_eq!(QName::local("Name").to_string(), "Name");
    }

    #[test]
    fn test_dialect_of() {
        assert_eq!(
            dialect_of(CSDL_V1_NAMESPACE),
            Some((Dialect::Conceptual, SchemaVersion::V1_0))
        );
        assert_eq!(
            dialect_of(SSDL_V2_NAMESPACE),
            Some((Dialect::Storage, SchemaVersion::V2_0))
        );
        assert_eq!(
            dialect_of(PROVIDER_MANIFEST_NAMESPACE).map(|(d, _)| d),
            Some(Dialect::ProviderManifest)
        );
        assert_eq!(dialect_of("urn:unknown"), None);
    }

    #[test]
    fn test_namespace_round_trip() {
        for ns in [CSDL_V1_1_NAMESPACE, CSDL_V3_NAMESPACE, SSDL_V3_NAMESPACE] {
            let (dialect, version) = dialect_of(ns).unwrap();
            assert_eq!(namespace_of(dialect, version), ns);
        }
    }

    #[test]
    fn test_version_epochs() {
        assert!(SchemaVersion::V1_0.uses_v1_constraint_rules());
        assert!(SchemaVersion::V1_1.uses_v1_constraint_rules());
        assert!(!SchemaVersion::V2_0.uses_v1_constraint_rules());
        assert!(SchemaVersion::V3_0 > SchemaVersion::V2_0);
    }

    #[test]
    fn test_grammar_and_reserved_namespaces() {
        assert!(is_grammar_namespace(None));
        assert!(is_grammar_namespace(Some(SSDL_V1_NAMESPACE)));
        assert!(!is_grammar_namespace(Some(ANNOTATION_NAMESPACE)));
        assert!(is_reserved_namespace("Edm"));
        assert!(!is_reserved_namespace("edm"));
    }
}
