//! Namespace alias resolution
//!
//! Each document owns one [`AliasResolver`]. It is seeded with the document's
//! own alias and receives one alias per `Using` declaration.

use std::fmt;

use indexmap::IndexMap;

use crate::namespaces::is_reserved_namespace;

/// Reason an alias declaration was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    /// The alias is already bound to a namespace
    Duplicate {
        /// Namespace the alias is bound to
        namespace: String,
    },
    /// The alias names a reserved namespace
    Reserved,
}

impl fmt::Display for AliasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasError::Duplicate { namespace } => {
                write!(f, "is already used for namespace '{}'", namespace)
            }
            AliasError::Reserved => write!(f, "is a reserved namespace name"),
        }
    }
}

/// Per-document map from alias to namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasResolver {
    aliases: IndexMap<String, String>,
}

impl AliasResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `namespace`
    ///
    /// On error the resolver is left unchanged.
    pub fn add(&mut self, alias: &str, namespace: &str) -> Result<(), AliasError> {
        if is_reserved_namespace(alias) {
            return Err(AliasError::Reserved);
        }
        if let Some(existing) = self.aliases.get(alias) {
            return Err(AliasError::Duplicate {
                namespace: existing.clone(),
            });
        }
        self.aliases.insert(alias.to_string(), namespace.to_string());
        Ok(())
    }

    /// Namespace bound to `alias`
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Alias bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.aliases.iter().map(|(a, n)| (a.as_str(), n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_resolve() {
        let mut resolver = AliasResolver::new();
        resolver.add("Self", "Northwind.Model").unwrap();
        resolver.add("Common", "Shared.Types").unwrap();

        assert_eq!(resolver.resolve("Self"), Some("Northwind.Model"));
        assert_eq!(resolver.resolve("self"), None);
        assert_eq!(resolver.iter().count(), 2);
    }

    #[test]
    fn test_duplicate_alias_dropped() {
        let mut resolver = AliasResolver::new();
        resolver.add("C", "A.B").unwrap();
        assert_eq!(
            resolver.add("C", "X.Y"),
            Err(AliasError::Duplicate {
                namespace: "A.B".to_string()
            })
        );
        assert_eq!(resolver.resolve("C"), Some("A.B"));
    }

    #[test]
    fn test_reserved_alias() {
        let mut resolver = AliasResolver::new();
        assert_eq!(resolver.add("Edm", "A.B"), Err(AliasError::Reserved));
        assert_eq!(resolver.add("System", "A.B"), Err(AliasError::Reserved));
        assert!(resolver.resolve("Edm").is_none());
    }
}
