//! Diagnostics produced while compiling a set of schema documents
//!
//! Every problem found in a model becomes a [`Diagnostic`]: a code, a
//! severity, the document it came from, a position and a message. The
//! [`Diagnostics`] accumulator keeps them in report order and halts the
//! compilation once the configured number of errors has been collected.

use std::fmt;

use serde::Serialize;

use crate::locations::LineInfo;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational problem; does not stop pass progression
    Warning,
    /// The compiled model must not be trusted
    Error,
}

impl Severity {
    /// Get the severity as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes
///
/// Numbers are stable across releases and grouped by the phase that
/// usually reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ErrorCode {
    // === Fatal conditions ===
    /// The document is not well-formed XML
    XmlError = 1,
    /// The document could not be read
    IoError = 2,
    /// A configured processing limit was exceeded
    LimitExceeded = 3,
    /// Documents of different version epochs compiled together
    MixedVersions = 4,
    /// The root element is not a schema of a known dialect
    UnexpectedRootElement = 5,

    // === Parsing ===
    /// Attribute not legal at this position
    UnexpectedXmlAttribute = 100,
    /// Element not legal at this position
    UnexpectedXmlElement = 101,
    /// Text content not accepted by this element
    TextNotAllowed = 102,
    /// Required attribute is absent
    RequiredAttributeMissing = 103,
    /// Element requires a name and has none
    MissingName = 104,
    /// Name is not a valid identifier
    InvalidName = 105,
    /// Boolean attribute value is malformed
    InvalidBoolean = 106,
    /// Integer attribute value is malformed
    InvalidInteger = 107,
    /// Attribute value not among the allowed values
    InvalidValue = 108,
    /// Multiplicity literal is malformed
    InvalidMultiplicity = 109,
    /// Cascade action literal is malformed
    InvalidAction = 110,
    /// Name already defined in the same scope
    AlreadyDefined = 111,
    /// Namespace attribute is missing or malformed
    InvalidNamespace = 112,
    /// Alias already used in this document or names a reserved namespace
    InvalidAlias = 113,
    /// Namespace is reserved for built-in types
    ReservedNamespace = 114,
    /// Element occurs more often than allowed
    TooManyElements = 115,
    /// Required child element is absent
    MissingRequiredElement = 116,

    // === Name resolution ===
    /// Type name needs a namespace qualifier
    NotNamespaceQualified = 200,
    /// Qualifier is neither an alias nor a known namespace
    BadNamespace = 201,
    /// Namespace known but the name is not defined in it
    NotInNamespace = 202,
    /// Storage and manifest documents may not reference each other's types
    InvalidTypeReferenceAcrossDocuments = 203,
    /// Referenced type has the wrong kind for this position
    BadType = 204,
    /// Namespace named by a `Using` is not part of the compilation
    UnknownUsingNamespace = 205,
    /// Base type chain is cyclic
    CycleInTypeHierarchy = 206,
    /// Container extension chain is cyclic
    CyclicContainerExtension = 207,
    /// Container extends itself
    ContainerExtendsItself = 208,
    /// Role name does not name an end of the relationship
    InvalidRoleName = 209,
    /// Entity set named by a binding does not exist
    BadEntitySet = 210,
    /// Property named by a key or constraint does not exist
    InvalidPropertyReference = 211,
    /// Entity container named by `Extends` does not exist
    BadContainer = 212,

    // === Facets ===
    /// Facet not described by the resolved type
    FacetNotAllowed = 300,
    /// Facet value outside the described range
    FacetOutOfRange = 301,
    /// Constant facet given a different value
    ConstantFacetOverridden = 302,
    /// Scale exceeds precision
    ScaleOutOfRange = 303,
    /// Facets given on a non-primitive type
    FacetsOnNonScalarType = 304,

    // === Types and keys ===
    /// Root entity type declares no key
    KeyMissingOnEntityType = 400,
    /// Derived entity type redeclares the key
    KeyOnDerivedEntityType = 401,
    /// Key property is nullable
    NullableKeyProperty = 402,
    /// Key property is not a valid key type
    InvalidKeyType = 403,
    /// Key names the same property twice
    DuplicateKeyProperty = 404,
    /// Member redeclared somewhere up the base chain
    DuplicateMemberInHierarchy = 405,
    /// Property type has the wrong kind for its declaring type
    InvalidPropertyType = 406,
    /// Complex type contains itself
    ComplexTypeCycle = 407,
    /// Complex-typed property is nullable where it may not be
    NullableComplexProperty = 408,
    /// Enum underlying type is not integral
    InvalidEnumUnderlyingType = 409,
    /// Enum member value outside the underlying range
    EnumMemberValueOutOfRange = 410,
    /// Construct requires a later version epoch
    UnsupportedInVersion = 411,

    // === Relationships ===
    /// Relationship does not have exactly two ends
    InvalidEndCount = 500,
    /// End type is not an entity type
    EndTypeNotEntityType = 501,
    /// Many end carries an operation
    OperationOnManyEnd = 502,
    /// Navigation property is malformed
    BadNavigationProperty = 503,
    /// Principal and dependent name the same role
    SameRoleReferred = 504,
    /// Multiplicity contradicts the constraint
    InvalidMultiplicityInConstraint = 505,
    /// Principal properties are not the principal key
    InvalidPrincipalProperties = 506,
    /// Principal and dependent property counts differ
    MismatchedConstraintPropertyCount = 507,
    /// Paired properties have different types
    ConstraintPropertyTypeMismatch = 508,
    /// No entity set qualifies for an omitted end
    MissingExtent = 509,
    /// Several entity sets qualify for an omitted end
    AmbiguousExtent = 510,
    /// Bound entity set type is incompatible with the end
    IncompatibleEntitySet = 511,

    // === Containers and functions ===
    /// Member name collides with a member cloned from the base container
    DuplicateInExtendedContainer = 600,
    /// Two storage entity sets map the same table
    DuplicateTableMapping = 601,
    /// Functions with identical signatures
    AmbiguousFunctionOverload = 602,
    /// Composable function without a return type
    ComposableFunctionWithoutReturnType = 603,
    /// Aggregate function that is not composable
    NonComposableAggregate = 604,
    /// Command text on a composable function
    CommandTextOnComposableFunction = 605,
    /// Function import return type has the wrong shape
    InvalidFunctionImportReturnType = 606,
    /// Function import entity set missing or incompatible
    InvalidFunctionImportEntitySet = 607,
    /// Parameter mode is not In, Out or InOut
    InvalidParameterMode = 608,
    /// Entity set type is not an entity type
    InvalidEntitySetType = 609,
}

impl ErrorCode {
    /// Stable numeric code
    pub fn number(&self) -> u32 {
        *self as u32
    }

    /// Whether the code marks a condition that stops a document being read
    pub fn is_fatal(&self) -> bool {
        self.number() < 100
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.number())
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Problem code
    pub code: ErrorCode,
    /// Severity
    pub severity: Severity,
    /// Name of the document the problem was found in
    pub source_location: Option<String>,
    /// One-based line, 0 when unknown
    pub line: u32,
    /// One-based column, 0 when unknown
    pub column: u32,
    /// Human readable description
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            source_location: None,
            line: 0,
            column: 0,
            message: message.into(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attach the source document
    pub fn at(mut self, source_location: Option<&str>, line_info: LineInfo) -> Self {
        self.source_location = source_location.map(str::to_string);
        self.line = line_info.line;
        self.column = line_info.column;
        self
    }

    /// Whether this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.source_location {
            write!(f, "{}", location)?;
        }
        if self.line > 0 {
            write!(f, "({},{})", self.line, self.column)?;
        }
        if self.source_location.is_some() || self.line > 0 {
            write!(f, ": ")?;
        }
        write!(
            f,
            "{} {} {:?}: {}",
            self.severity, self.code, self.code, self.message
        )
    }
}

/// Ordered, capped collection of diagnostics
#[derive(Debug, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    error_count: usize,
    max_errors: usize,
    halted: bool,
}

impl Diagnostics {
    /// Create an accumulator that halts after `max_errors` errors
    pub fn new(max_errors: usize) -> Self {
        Self {
            items: Vec::new(),
            error_count: 0,
            max_errors: max_errors.max(1),
            halted: false,
        }
    }

    /// Record a diagnostic; returns `false` once the error cap has been reached
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        if self.halted {
            return false;
        }
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        log::trace!("diagnostic: {}", diagnostic);
        self.items.push(diagnostic);
        if self.error_count >= self.max_errors {
            log::warn!(
                "error limit of {} reached, compilation stopped",
                self.max_errors
            );
            self.halted = true;
        }
        true
    }

    /// Whether the error cap has been reached
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Number of errors recorded
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of warnings recorded
    pub fn warning_count(&self) -> usize {
        self.items.len() - self.error_count
    }

    /// Whether any error has been recorded
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// All diagnostics in report order
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Errors only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    /// Diagnostics with the given code
    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.items.iter().filter(move |d| d.code == code)
    }

    /// Number of diagnostics recorded
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the collected diagnostics
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(crate::limits::Limits::default().max_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers() {
        assert_eq!(ErrorCode::XmlError.number(), 1);
        assert_eq!(ErrorCode::BadNamespace.number(), 201);
        assert!(ErrorCode::MixedVersions.is_fatal());
        assert!(!ErrorCode::DuplicateTableMapping.is_fatal());
        assert_eq!(ErrorCode::BadNamespace.to_string(), "0201");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(ErrorCode::NotInNamespace, "Type 'X' not found")
            .at(Some("model.csdl"), LineInfo::new(4, 7));
        assert_eq!(
            diag.to_string(),
            "model.csdl(4,7): error 0202 NotInNamespace: Type 'X' not found"
        );

        let diag = Diagnostic::warning(ErrorCode::FacetsOnNonScalarType, "ignored");
        assert_eq!(diag.to_string(), "warning 0304 FacetsOnNonScalarType: ignored");
    }

    #[test]
    fn test_diagnostic_serialize() {
        let diag = Diagnostic::error(ErrorCode::MissingExtent, "no set")
            .at(None, LineInfo::new(2, 3));
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "MissingExtent");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["line"], 2);
    }

    #[test]
    fn test_diagnostics_cap() {
        let mut diags = Diagnostics::new(2);
        assert!(diags.report(Diagnostic::warning(ErrorCode::FacetsOnNonScalarType, "w")));
        assert!(diags.report(Diagnostic::error(ErrorCode::BadType, "e1")));
        assert!(!diags.is_halted());
        assert!(diags.report(Diagnostic::error(ErrorCode::BadType, "e2")));
        assert!(diags.is_halted());
        assert!(!diags.report(Diagnostic::error(ErrorCode::BadType, "e3")));

        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.len(), 3);
        assert_eq!(diags.with_code(ErrorCode::BadType).count(), 2);
    }
}
