//! Model name validation and utilities
//!
//! Identifier rules for model element names and helpers to take apart
//! qualified names and type expressions such as `Collection(Ns.Type)`.

use once_cell::sync::Lazy;
use regex::Regex;

static SIMPLE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}\p{Cf}]*$")
        .expect("identifier pattern is valid")
});

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}\p{Cf}]*(\.[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}\p{Cf}]*)*$",
    )
    .expect("qualified name pattern is valid")
});

/// Check if a string is a valid simple identifier (element names, aliases)
pub fn is_valid_identifier(name: &str) -> bool {
    SIMPLE_IDENTIFIER.is_match(name)
}

/// Check if a string is a valid dotted name (namespaces, qualified type names)
pub fn is_valid_qualified_name(name: &str) -> bool {
    QUALIFIED_NAME.is_match(name)
}

/// Split a qualified name into qualifier and simple name on the last `.`
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Join a namespace and a simple name into a fully-qualified name
pub fn qualify(namespace: &str, name: &str) -> String {
    format!("{}.{}", namespace, name)
}

/// Shape of a type reference as written in an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeExpression<'a> {
    /// A plain (possibly qualified) type name
    Named(&'a str),
    /// `Collection(element)`
    Collection(&'a str),
    /// `Ref(entity type)`
    Reference(&'a str),
}

impl<'a> TypeExpression<'a> {
    /// Parse the text of a `Type` or `ReturnType` attribute
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        if let Some(inner) = unwrap_call(text, "Collection") {
            TypeExpression::Collection(inner)
        } else if let Some(inner) = unwrap_call(text, "Ref") {
            TypeExpression::Reference(inner)
        } else {
            TypeExpression::Named(text)
        }
    }

    /// The type name inside the expression
    pub fn name(&self) -> &'a str {
        match self {
            TypeExpression::Named(n) | TypeExpression::Collection(n) | TypeExpression::Reference(n) => n,
        }
    }
}

fn unwrap_call<'a>(text: &'a str, function: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(function)?;
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.trim())
}
