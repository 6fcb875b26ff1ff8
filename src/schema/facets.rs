//! Facets of primitive type usages
//!
//! A [`FacetDescription`] is immutable metadata a primitive type carries for
//! one facet: the allowed range, the default and whether the value is fixed.
//! A [`FacetBuilder`] sits on every type-using element (properties,
//! parameters, return types) and records the facet values written there. Once
//! the type reference is resolved the builder is checked against the
//! descriptions of that type.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::diagnostics::ErrorCode;
use crate::locations::LineInfo;

/// Facet names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FacetName {
    /// Whether the value may be null
    Nullable,
    /// Default value literal (kept as text)
    DefaultValue,
    /// Maximum length of strings and binaries
    MaxLength,
    /// Whether the length is fixed
    FixedLength,
    /// Whether strings are Unicode
    Unicode,
    /// Numeric or temporal precision
    Precision,
    /// Decimal scale
    Scale,
    /// String collation
    Collation,
    /// Spatial reference system identifier
    Srid,
    /// Whether spatial values are strictly typed
    IsStrict,
}

/// Value shape a facet accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetValueKind {
    /// `true` / `false`
    Boolean,
    /// Integer literal
    Integer,
    /// Free text
    Text,
}

impl FacetName {
    /// Every facet name
    pub const ALL: [FacetName; 10] = [
        FacetName::Nullable,
        FacetName::DefaultValue,
        FacetName::MaxLength,
        FacetName::FixedLength,
        FacetName::Unicode,
        FacetName::Precision,
        FacetName::Scale,
        FacetName::Collation,
        FacetName::Srid,
        FacetName::IsStrict,
    ];

    /// Name as written in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetName::Nullable => "Nullable",
            FacetName::DefaultValue => "DefaultValue",
            FacetName::MaxLength => "MaxLength",
            FacetName::FixedLength => "FixedLength",
            FacetName::Unicode => "Unicode",
            FacetName::Precision => "Precision",
            FacetName::Scale => "Scale",
            FacetName::Collation => "Collation",
            FacetName::Srid => "SRID",
            FacetName::IsStrict => "IsStrict",
        }
    }

    /// Look a facet up by its document name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    /// Facet written as an attribute of a type-using element
    ///
    /// `IsStrict` only ever comes from a type's own descriptions.
    pub fn from_attribute(name: &str) -> Option<Self> {
        Self::from_name(name).filter(|f| *f != FacetName::IsStrict)
    }

    /// Shape of the facet's value
    pub fn value_kind(&self) -> FacetValueKind {
        match self {
            FacetName::Nullable
            | FacetName::FixedLength
            | FacetName::Unicode
            | FacetName::IsStrict => FacetValueKind::Boolean,
            FacetName::MaxLength | FacetName::Precision | FacetName::Scale | FacetName::Srid => {
                FacetValueKind::Integer
            }
            FacetName::Collation | FacetName::DefaultValue => FacetValueKind::Text,
        }
    }

    /// Facets every type accepts without a description
    pub fn is_universal(&self) -> bool {
        matches!(self, FacetName::Nullable | FacetName::DefaultValue)
    }

    /// Parse a literal for this facet
    pub fn parse_value(&self, text: &str) -> Result<FacetValue, FacetParseError> {
        let error = || FacetParseError {
            name: *self,
            text: text.to_string(),
        };
        match self.value_kind() {
            FacetValueKind::Boolean => match text.trim() {
                "true" | "1" => Ok(FacetValue::Bool(true)),
                "false" | "0" => Ok(FacetValue::Bool(false)),
                _ => Err(error()),
            },
            FacetValueKind::Integer => {
                let trimmed = text.trim();
                if *self == FacetName::MaxLength && trimmed == "Max" {
                    return Ok(FacetValue::Unbounded);
                }
                if *self == FacetName::Srid && trimmed == "Variable" {
                    return Ok(FacetValue::Variable);
                }
                trimmed
                    .parse::<i64>()
                    .map(FacetValue::Integer)
                    .map_err(|_| error())
            }
            FacetValueKind::Text => Ok(FacetValue::Text(text.to_string())),
        }
    }
}

impl fmt::Display for FacetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A facet value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FacetValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Text value
    Text(String),
    /// `Max` for MaxLength
    Unbounded,
    /// `Variable` for SRID
    Variable,
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetValue::Bool(b) => write!(f, "{}", b),
            FacetValue::Integer(i) => write!(f, "{}", i),
            FacetValue::Text(s) => write!(f, "{}", s),
            FacetValue::Unbounded => write!(f, "Max"),
            FacetValue::Variable => write!(f, "Variable"),
        }
    }
}

/// A facet literal that does not parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetParseError {
    /// Facet being parsed
    pub name: FacetName,
    /// Offending text
    pub text: String,
}

impl FacetParseError {
    /// Diagnostic code for the failure
    pub fn code(&self) -> ErrorCode {
        match self.name.value_kind() {
            FacetValueKind::Boolean => ErrorCode::InvalidBoolean,
            _ => ErrorCode::InvalidInteger,
        }
    }
}

impl fmt::Display for FacetParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a valid value for facet '{}'",
            self.text, self.name
        )
    }
}

/// Description of one facet of a primitive type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetDescription {
    /// Facet name
    pub name: FacetName,
    /// Smallest allowed integer value
    pub minimum: Option<i64>,
    /// Largest allowed integer value
    pub maximum: Option<i64>,
    /// Value used when the facet is not specified
    pub default_value: Option<FacetValue>,
    /// Whether the default may not be overridden
    pub is_constant: bool,
}

impl FacetDescription {
    /// Create a description without range, default or constant
    pub fn new(name: FacetName) -> Self {
        Self {
            name,
            minimum: None,
            maximum: None,
            default_value: None,
            is_constant: false,
        }
    }

    /// Set the allowed range
    pub fn with_range(mut self, minimum: i64, maximum: i64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: FacetValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark the default as fixed
    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }

    /// Whether an integer value lies within the range
    pub fn in_range(&self, value: i64) -> bool {
        self.minimum.map_or(true, |min| value >= min) && self.maximum.map_or(true, |max| value <= max)
    }
}

/// A facet value written at a use site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifiedFacet {
    /// Parsed value
    pub value: FacetValue,
    /// Position of the element carrying it
    pub line_info: LineInfo,
}

/// A problem found when checking specified facets against descriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetProblem {
    /// The type does not describe the facet
    NotAllowed {
        /// Facet name
        name: FacetName,
        /// Position
        line_info: LineInfo,
    },
    /// Value outside the described range
    OutOfRange {
        /// Facet name
        name: FacetName,
        /// Specified value
        value: i64,
        /// Description the value violates
        description: FacetDescription,
        /// Position
        line_info: LineInfo,
    },
    /// A constant facet was given a different value
    ConstantOverridden {
        /// Facet name
        name: FacetName,
        /// Specified value
        value: FacetValue,
        /// Position
        line_info: LineInfo,
    },
    /// Scale larger than precision
    ScaleExceedsPrecision {
        /// Scale value
        scale: i64,
        /// Precision value
        precision: i64,
        /// Position
        line_info: LineInfo,
    },
}

impl FacetProblem {
    /// Diagnostic code for the problem
    pub fn code(&self) -> ErrorCode {
        match self {
            FacetProblem::NotAllowed { .. } => ErrorCode::FacetNotAllowed,
            FacetProblem::OutOfRange { .. } => ErrorCode::FacetOutOfRange,
            FacetProblem::ConstantOverridden { .. } => ErrorCode::ConstantFacetOverridden,
            FacetProblem::ScaleExceedsPrecision { .. } => ErrorCode::ScaleOutOfRange,
        }
    }

    /// Position of the offending use site
    pub fn line_info(&self) -> LineInfo {
        match self {
            FacetProblem::NotAllowed { line_info, .. }
            | FacetProblem::OutOfRange { line_info, .. }
            | FacetProblem::ConstantOverridden { line_info, .. }
            | FacetProblem::ScaleExceedsPrecision { line_info, .. } => *line_info,
        }
    }

    /// Message naming the problem for type `type_name`
    pub fn message(&self, type_name: &str) -> String {
        match self {
            FacetProblem::NotAllowed { name, .. } => {
                format!("Facet '{}' is not allowed for type '{}'", name, type_name)
            }
            FacetProblem::OutOfRange {
                name,
                value,
                description,
                ..
            } => format!(
                "Value {} of facet '{}' is outside the range [{}, {}] allowed by type '{}'",
                value,
                name,
                description
                    .minimum
                    .map_or_else(|| "-".to_string(), |m| m.to_string()),
                description
                    .maximum
                    .map_or_else(|| "-".to_string(), |m| m.to_string()),
                type_name
            ),
            FacetProblem::ConstantOverridden { name, value, .. } => format!(
                "Facet '{}' is constant for type '{}' and cannot be set to '{}'",
                name, type_name, value
            ),
            FacetProblem::ScaleExceedsPrecision {
                scale, precision, ..
            } => format!(
                "Scale {} must not be greater than precision {}",
                scale, precision
            ),
        }
    }
}

/// Facets resolved against a type's descriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetValidation {
    /// Specified values merged with defaults
    pub facets: IndexMap<FacetName, FacetValue>,
    /// Problems found
    pub problems: Vec<FacetProblem>,
}

/// Facet values written at one use site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetBuilder {
    specified: IndexMap<FacetName, SpecifiedFacet>,
}

impl FacetBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and record a facet literal
    pub fn specify(
        &mut self,
        name: FacetName,
        text: &str,
        line_info: LineInfo,
    ) -> Result<(), FacetParseError> {
        let value = name.parse_value(text)?;
        self.specified
            .insert(name, SpecifiedFacet { value, line_info });
        Ok(())
    }

    /// Value written for a facet
    pub fn get(&self, name: FacetName) -> Option<&FacetValue> {
        self.specified.get(&name).map(|s| &s.value)
    }

    /// Boolean value written for a facet
    pub fn get_bool(&self, name: FacetName) -> Option<bool> {
        match self.get(name) {
            Some(FacetValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.specified.is_empty()
    }

    /// Whether facets other than Nullable and DefaultValue were written
    pub fn has_type_facets(&self) -> bool {
        self.specified.keys().any(|name| !name.is_universal())
    }

    /// Specified facets in document order
    pub fn iter(&self) -> impl Iterator<Item = (FacetName, &SpecifiedFacet)> {
        self.specified.iter().map(|(name, spec)| (*name, spec))
    }

    /// Check the specified values against a type's descriptions
    pub fn validate(&self, descriptions: &[FacetDescription]) -> FacetValidation {
        let mut result = FacetValidation::default();
        for description in descriptions {
            if let Some(default) = &description.default_value {
                result.facets.insert(description.name, default.clone());
            }
        }

        for (name, spec) in &self.specified {
            if name.is_universal() {
                result.facets.insert(*name, spec.value.clone());
                continue;
            }
            let Some(description) = descriptions.iter().find(|d| d.name == *name) else {
                result.problems.push(FacetProblem::NotAllowed {
                    name: *name,
                    line_info: spec.line_info,
                });
                continue;
            };
            if description.is_constant {
                if description.default_value.as_ref() != Some(&spec.value) {
                    result.problems.push(FacetProblem::ConstantOverridden {
                        name: *name,
                        value: spec.value.clone(),
                        line_info: spec.line_info,
                    });
                }
                continue;
            }
            if let FacetValue::Integer(value) = spec.value {
                if !description.in_range(value) {
                    result.problems.push(FacetProblem::OutOfRange {
                        name: *name,
                        value,
                        description: description.clone(),
                        line_info: spec.line_info,
                    });
                    continue;
                }
            }
            result.facets.insert(*name, spec.value.clone());
        }

        if let (Some(FacetValue::Integer(scale)), Some(FacetValue::Integer(precision))) = (
            result.facets.get(&FacetName::Scale),
            result.facets.get(&FacetName::Precision),
        ) {
            if scale > precision {
                let line_info = self
                    .specified
                    .get(&FacetName::Scale)
                    .or_else(|| self.specified.get(&FacetName::Precision))
                    .map(|s| s.line_info)
                    .unwrap_or_default();
                result.problems.push(FacetProblem::ScaleExceedsPrecision {
                    scale: *scale,
                    precision: *precision,
                    line_info,
                });
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal_facets() -> Vec<FacetDescription> {
        vec![
            FacetDescription::new(FacetName::Precision)
                .with_range(1, 38)
                .with_default(FacetValue::Integer(18)),
            FacetDescription::new(FacetName::Scale)
                .with_range(0, 38)
                .with_default(FacetValue::Integer(0)),
        ]
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(
            FacetName::MaxLength.parse_value("Max"),
            Ok(FacetValue::Unbounded)
        );
        assert_eq!(
            FacetName::MaxLength.parse_value("40"),
            Ok(FacetValue::Integer(40))
        );
        assert_eq!(FacetName::Srid.parse_value("Variable"), Ok(FacetValue::Variable));
        assert_eq!(FacetName::Nullable.parse_value("0"), Ok(FacetValue::Bool(false)));

        let err = FacetName::Unicode.parse_value("yes").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidBoolean);
        let err = FacetName::Precision.parse_value("ten").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInteger);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(FacetName::from_attribute("SRID"), Some(FacetName::Srid));
        assert_eq!(FacetName::from_attribute("IsStrict"), None);
        assert_eq!(FacetName::from_name("IsStrict"), Some(FacetName::IsStrict));
        assert_eq!(FacetName::from_attribute("Type"), None);
    }

    #[test]
    fn test_defaults_merge() {
        let mut builder = FacetBuilder::new();
        builder
            .specify(FacetName::Precision, "10", LineInfo::new(1, 1))
            .unwrap();
        builder
            .specify(FacetName::Nullable, "false", LineInfo::new(1, 1))
            .unwrap();

        let result = builder.validate(&decimal_facets());
        assert!(result.problems.is_empty());
        assert_eq!(result.facets[&FacetName::Precision], FacetValue::Integer(10));
        assert_eq!(result.facets[&FacetName::Scale], FacetValue::Integer(0));
        assert_eq!(result.facets[&FacetName::Nullable], FacetValue::Bool(false));
    }

    #[test]
    fn test_not_allowed_and_range() {
        let mut builder = FacetBuilder::new();
        builder
            .specify(FacetName::MaxLength, "10", LineInfo::new(2, 3))
            .unwrap();
        builder
            .specify(FacetName::Precision, "40", LineInfo::new(2, 3))
            .unwrap();

        let result = builder.validate(&decimal_facets());
        assert_eq!(result.problems.len(), 2);
        assert_eq!(result.problems[0].code(), ErrorCode::FacetNotAllowed);
        assert_eq!(result.problems[1].code(), ErrorCode::FacetOutOfRange);
        assert_eq!(result.problems[0].line_info(), LineInfo::new(2, 3));
        assert!(result.problems[1]
            .message("Edm.Decimal")
            .contains("[1, 38]"));
    }

    #[test]
    fn test_constant_override() {
        let descriptions = vec![FacetDescription::new(FacetName::FixedLength)
            .with_default(FacetValue::Bool(true))
            .constant()];

        let mut same = FacetBuilder::new();
        same.specify(FacetName::FixedLength, "true", LineInfo::unknown())
            .unwrap();
        assert!(same.validate(&descriptions).problems.is_empty());

        let mut other = FacetBuilder::new();
        other
            .specify(FacetName::FixedLength, "false", LineInfo::unknown())
            .unwrap();
        let result = other.validate(&descriptions);
        assert_eq!(result.problems[0].code(), ErrorCode::ConstantFacetOverridden);
        assert_eq!(result.facets[&FacetName::FixedLength], FacetValue::Bool(true));
    }

    #[test]
    fn test_scale_exceeds_precision() {
        let mut builder = FacetBuilder::new();
        builder
            .specify(FacetName::Precision, "4", LineInfo::unknown())
            .unwrap();
        builder
            .specify(FacetName::Scale, "6", LineInfo::unknown())
            .unwrap();
        let result = builder.validate(&decimal_facets());
        assert_eq!(result.problems.len(), 1);
        assert_eq!(result.problems[0].code(), ErrorCode::ScaleOutOfRange);
    }

    #[test]
    fn test_universal_facets() {
        let mut builder = FacetBuilder::new();
        builder
            .specify(FacetName::DefaultValue, "abc", LineInfo::unknown())
            .unwrap();
        assert!(!builder.has_type_facets());
        assert!(builder.validate(&[]).problems.is_empty());
    }
}
