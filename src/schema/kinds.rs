//! Node kinds of the schema model
//!
//! [`NodeKind`] is the payload of a model node: one variant per element kind
//! of the three dialects. Reference fields come in pairs, the name as written
//! (`base_type`, `relationship`, ...) and the node it resolves to
//! (`resolved_base`, `resolved_relationship`, ...). Only the resolved half is
//! written after parsing.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::names::TypeExpression;
use crate::namespaces::{Dialect, SchemaVersion};

use super::aliases::AliasResolver;
use super::builtins::PrimitiveKind;
use super::facets::{FacetBuilder, FacetDescription, FacetName, FacetValue};
use super::model::NodeId;
use super::table::NamedTable;

// =============================================================================
// Literal enums
// =============================================================================

/// Multiplicity of a relationship end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Multiplicity {
    /// Exactly one (`1`)
    One,
    /// Zero or one (`0..1`)
    ZeroOrOne,
    /// Any number (`*`)
    Many,
}

impl Multiplicity {
    /// Parse a multiplicity literal
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "1" => Some(Multiplicity::One),
            "0..1" => Some(Multiplicity::ZeroOrOne),
            "*" => Some(Multiplicity::Many),
            _ => None,
        }
    }

    /// Literal as written in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::One => "1",
            Multiplicity::ZeroOrOne => "0..1",
            Multiplicity::Many => "*",
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cascade action of an `OnDelete` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    /// No action
    None,
    /// Delete dependents
    Cascade,
    /// Refuse the delete (storage only)
    Restrict,
}

impl Action {
    /// Parse an action literal
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "None" => Some(Action::None),
            "Cascade" => Some(Action::Cascade),
            "Restrict" => Some(Action::Restrict),
            _ => None,
        }
    }
}

/// Direction of a function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterMode {
    /// Input
    In,
    /// Output
    Out,
    /// Input and output
    InOut,
}

impl ParameterMode {
    /// Parse a mode literal
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "In" => Some(ParameterMode::In),
            "Out" => Some(ParameterMode::Out),
            "InOut" => Some(ParameterMode::InOut),
            _ => None,
        }
    }

    /// Literal as written in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterMode::In => "In",
            ParameterMode::Out => "Out",
            ParameterMode::InOut => "InOut",
        }
    }
}

/// What a text-holding element contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextRole {
    /// Documentation summary
    Summary,
    /// Documentation long description
    LongDescription,
    /// Store query defining an entity set
    DefiningQuery,
    /// Store command of a function
    CommandText,
    /// Conceptual function body
    DefiningExpression,
}

impl TextRole {
    /// Element name
    pub fn as_str(&self) -> &'static str {
        match self {
            TextRole::Summary => "Summary",
            TextRole::LongDescription => "LongDescription",
            TextRole::DefiningQuery => "DefiningQuery",
            TextRole::CommandText => "CommandText",
            TextRole::DefiningExpression => "DefiningExpression",
        }
    }
}

// =============================================================================
// Element kind tags
// =============================================================================

/// Tag of a [`NodeKind`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    /// Document root
    Schema,
    /// Cross-document namespace reference
    Using,
    /// Documentation block
    Documentation,
    /// Text holder
    Text,
    /// Primitive type
    PrimitiveType,
    /// Facet description of a manifest type
    FacetDescription,
    /// Entity type
    EntityType,
    /// Complex type
    ComplexType,
    /// Entity key
    Key,
    /// Property reference
    PropertyRef,
    /// Scalar or complex property
    Property,
    /// Navigation property
    NavigationProperty,
    /// Enumeration type
    EnumType,
    /// Enumeration member
    EnumMember,
    /// Association
    Association,
    /// Association end
    AssociationEnd,
    /// Cascade action
    OnDelete,
    /// Referential constraint
    ReferentialConstraint,
    /// Principal or dependent role of a constraint
    ConstraintRole,
    /// Function
    Function,
    /// Function parameter
    Parameter,
    /// Function return type element
    ReturnType,
    /// Inline collection type
    CollectionType,
    /// Inline row type
    RowType,
    /// Property of a row type
    RowProperty,
    /// Inline reference type
    ReferenceType,
    /// Inline named type reference
    TypeRef,
    /// Entity container
    EntityContainer,
    /// Entity set
    EntitySet,
    /// Association set
    AssociationSet,
    /// Association set end
    AssociationSetEnd,
    /// Function import
    FunctionImport,
}

impl ElementKind {
    /// Name used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Schema => "Schema",
            ElementKind::Using => "Using",
            ElementKind::Documentation => "Documentation",
            ElementKind::Text => "Text",
            ElementKind::PrimitiveType => "Type",
            ElementKind::FacetDescription => "FacetDescription",
            ElementKind::EntityType => "EntityType",
            ElementKind::ComplexType => "ComplexType",
            ElementKind::Key => "Key",
            ElementKind::PropertyRef => "PropertyRef",
            ElementKind::Property => "Property",
            ElementKind::NavigationProperty => "NavigationProperty",
            ElementKind::EnumType => "EnumType",
            ElementKind::EnumMember => "Member",
            ElementKind::Association => "Association",
            ElementKind::AssociationEnd => "End",
            ElementKind::OnDelete => "OnDelete",
            ElementKind::ReferentialConstraint => "ReferentialConstraint",
            ElementKind::ConstraintRole => "Role",
            ElementKind::Function => "Function",
            ElementKind::Parameter => "Parameter",
            ElementKind::ReturnType => "ReturnType",
            ElementKind::CollectionType => "CollectionType",
            ElementKind::RowType => "RowType",
            ElementKind::RowProperty => "Property",
            ElementKind::ReferenceType => "ReferenceType",
            ElementKind::TypeRef => "TypeRef",
            ElementKind::EntityContainer => "EntityContainer",
            ElementKind::EntitySet => "EntitySet",
            ElementKind::AssociationSet => "AssociationSet",
            ElementKind::AssociationSetEnd => "End",
            ElementKind::FunctionImport => "FunctionImport",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Document root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaData {
    /// Dialect declared by the root namespace
    pub dialect: Dialect,
    /// Version epoch declared by the root namespace
    pub version: SchemaVersion,
    /// Declared namespace
    pub namespace: Option<String>,
    /// Declared alias
    pub alias: Option<String>,
    /// Store provider invariant name (storage)
    pub provider: Option<String>,
    /// Store provider manifest token (storage)
    pub provider_manifest_token: Option<String>,
    /// Namespace unqualified type names resolve in
    pub primitive_namespace: String,
    /// Name of the source document
    pub source_location: Option<String>,
    /// Synthesized from a primitive type catalogue
    pub is_primitive: bool,
    /// Types in document order
    pub types: Vec<NodeId>,
    /// Functions in document order
    pub functions: Vec<NodeId>,
    /// Entity containers in document order
    pub containers: Vec<NodeId>,
    /// `Using` declarations in document order
    pub usings: Vec<NodeId>,
    /// Alias bindings
    pub aliases: AliasResolver,
}

impl SchemaData {
    /// Create an empty root for a dialect
    pub fn new(dialect: Dialect, version: SchemaVersion, primitive_namespace: impl Into<String>) -> Self {
        Self {
            dialect,
            version,
            namespace: None,
            alias: None,
            provider: None,
            provider_manifest_token: None,
            primitive_namespace: primitive_namespace.into(),
            source_location: None,
            is_primitive: false,
            types: Vec::new(),
            functions: Vec::new(),
            containers: Vec::new(),
            usings: Vec::new(),
            aliases: AliasResolver::new(),
        }
    }
}

/// `Using`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsingData {
    /// Referenced namespace
    pub namespace: Option<String>,
    /// Alias for it
    pub alias: Option<String>,
}

/// `Documentation`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentationData {
    /// `Summary` text node
    pub summary: Option<NodeId>,
    /// `LongDescription` text node
    pub long_description: Option<NodeId>,
}

/// Text holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    /// What the text is
    pub role: TextRole,
    /// Collected text
    pub text: String,
}

/// Primitive type, synthesized from a catalogue or declared by a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveTypeData {
    /// Primitive kind
    pub kind: Option<PrimitiveKind>,
    /// Facets the type accepts
    pub facets: Vec<FacetDescription>,
}

/// Facet description element of a manifest type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetDescriptionData {
    /// Parsed description
    pub description: FacetDescription,
}

/// Entity and complex types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredTypeData {
    /// Base type name as written
    pub base_type: Option<String>,
    /// Resolved base type; unset for roots and rejected links
    pub resolved_base: Option<NodeId>,
    /// Declared abstract
    pub is_abstract: bool,
    /// Declared members (properties, navigation properties)
    pub members: NamedTable,
    /// `Key` element
    pub key: Option<NodeId>,
}

/// `Key`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyData {
    /// `PropertyRef` children
    pub property_refs: Vec<NodeId>,
}

/// `PropertyRef`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyRefData {
    /// Resolved property
    pub property: Option<NodeId>,
}

/// A reference to a type together with its facets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeUsage {
    /// Type name inside any `Collection(...)` / `Ref(...)` wrapper
    pub type_name: Option<String>,
    /// Written as `Collection(...)`
    pub collection: bool,
    /// Written as `Ref(...)`
    pub reference: bool,
    /// Resolved type
    pub resolved: Option<NodeId>,
    /// Inline type element (`CollectionType`, `RowType`, ...)
    pub inline: Option<NodeId>,
    /// Facets written at this site
    pub facets: FacetBuilder,
    /// Facets after validation against the resolved type
    pub resolved_facets: IndexMap<FacetName, FacetValue>,
}

impl TypeUsage {
    /// Record the text of a `Type` attribute
    pub fn set_type_text(&mut self, text: &str) {
        let expression = TypeExpression::parse(text);
        self.collection = matches!(expression, TypeExpression::Collection(_));
        self.reference = matches!(expression, TypeExpression::Reference(_));
        self.type_name = Some(expression.name().to_string());
    }

    /// Effective nullability (defaults to nullable)
    pub fn is_nullable(&self) -> bool {
        self.facets.get_bool(FacetName::Nullable).unwrap_or(true)
    }

    /// Whether any type reference was given
    pub fn is_specified(&self) -> bool {
        self.type_name.is_some() || self.inline.is_some()
    }
}

/// `Property`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyData {
    /// Property type
    pub usage: TypeUsage,
    /// `StoreGeneratedPattern`
    pub store_generated_pattern: Option<String>,
    /// `ConcurrencyMode`
    pub concurrency_mode: Option<String>,
}

/// `NavigationProperty`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPropertyData {
    /// Association name as written
    pub relationship: Option<String>,
    /// Role navigated from
    pub from_role: Option<String>,
    /// Role navigated to
    pub to_role: Option<String>,
    /// Resolved association
    pub resolved_relationship: Option<NodeId>,
    /// Resolved from end
    pub from_end: Option<NodeId>,
    /// Resolved to end
    pub to_end: Option<NodeId>,
}

/// `EnumType`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTypeData {
    /// Underlying type name as written
    pub underlying_type: Option<String>,
    /// Resolved underlying type
    pub resolved_underlying: Option<NodeId>,
    /// Declared as a flags enum
    pub is_flags: bool,
    /// Members
    pub members: NamedTable,
}

/// `Member` of an enum
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumMemberData {
    /// Declared value
    pub value: Option<i64>,
    /// Value after auto-increment
    pub resolved_value: Option<i64>,
}

/// `Association`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationData {
    /// Ends keyed by role name
    pub ends: NamedTable,
    /// `ReferentialConstraint` children
    pub constraints: Vec<NodeId>,
}

/// `End` of an association
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationEndData {
    /// End type name as written
    pub type_name: Option<String>,
    /// Resolved end type
    pub resolved_type: Option<NodeId>,
    /// Declared multiplicity
    pub multiplicity: Option<Multiplicity>,
    /// Multiplicity inferred from a referential constraint
    pub inferred_multiplicity: Option<Multiplicity>,
    /// Cascade action of an `OnDelete` child
    pub on_delete: Option<Action>,
}

impl AssociationEndData {
    /// Declared multiplicity, else the inferred one
    pub fn effective_multiplicity(&self) -> Option<Multiplicity> {
        self.multiplicity.or(self.inferred_multiplicity)
    }
}

/// `OnDelete`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnDeleteData {
    /// Declared action
    pub action: Option<Action>,
}

/// `ReferentialConstraint`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferentialConstraintData {
    /// `Principal` child
    pub principal: Option<NodeId>,
    /// `Dependent` child
    pub dependent: Option<NodeId>,
}

/// `Principal` or `Dependent` of a referential constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintRoleData {
    /// Whether this is the principal role
    pub is_principal: bool,
    /// Role name as written
    pub role: Option<String>,
    /// Resolved association end
    pub end: Option<NodeId>,
    /// `PropertyRef` children
    pub property_refs: Vec<NodeId>,
}

/// `Function`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionData {
    /// `ReturnType` attribute
    pub return_type: TypeUsage,
    /// `ReturnType` child elements
    pub return_types: Vec<NodeId>,
    /// Parameters keyed by name
    pub parameters: NamedTable,
    /// `Aggregate`
    pub is_aggregate: bool,
    /// `BuiltIn`
    pub is_builtin: bool,
    /// `NiladicFunction`
    pub is_niladic: bool,
    /// `IsComposable`
    pub is_composable: bool,
    /// `ParameterTypeSemantics`
    pub parameter_type_semantics: Option<String>,
    /// `StoreFunctionName`
    pub store_function_name: Option<String>,
    /// `Schema`
    pub schema: Option<String>,
    /// `CommandText` text node
    pub command_text: Option<NodeId>,
    /// `DefiningExpression` text node
    pub defining_expression: Option<NodeId>,
    /// Registered identity, `Namespace.Name(Mode Type, ...)`
    pub signature: Option<String>,
}

impl Default for FunctionData {
    fn default() -> Self {
        Self {
            return_type: TypeUsage::default(),
            return_types: Vec::new(),
            parameters: NamedTable::new(),
            is_aggregate: false,
            is_builtin: false,
            is_niladic: false,
            is_composable: true,
            parameter_type_semantics: None,
            store_function_name: None,
            schema: None,
            command_text: None,
            defining_expression: None,
            signature: None,
        }
    }
}

impl FunctionData {
    /// Whether a return type is declared in either form
    pub fn has_return_type(&self) -> bool {
        self.return_type.is_specified() || !self.return_types.is_empty()
    }
}

/// `Parameter`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterData {
    /// Declared mode
    pub mode: Option<ParameterMode>,
    /// Parameter type
    pub usage: TypeUsage,
}

/// `RowType`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTypeData {
    /// Row properties keyed by name
    pub properties: NamedTable,
}

/// `EntityContainer`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityContainerData {
    /// Extended container name as written
    pub extends: Option<String>,
    /// Resolved extended container
    pub resolved_extends: Option<NodeId>,
    /// Members (local ones, then clones of inherited ones)
    pub members: NamedTable,
    /// `annotation:LazyLoadingEnabled`
    pub lazy_loading_enabled: Option<bool>,
}

/// `EntitySet`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySetData {
    /// Element type name as written
    pub entity_type: Option<String>,
    /// Resolved element type
    pub resolved_type: Option<NodeId>,
    /// Store schema (storage)
    pub schema: Option<String>,
    /// Store table (storage)
    pub table: Option<String>,
    /// `store:Type` (Tables or Views)
    pub store_type: Option<String>,
    /// `store:Schema`
    pub store_schema: Option<String>,
    /// `store:Name`
    pub store_name: Option<String>,
    /// `DefiningQuery` text node
    pub defining_query: Option<NodeId>,
}

/// An association end bound to an entity set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndBinding {
    /// Role name
    pub role: String,
    /// Association end
    pub end: NodeId,
    /// Bound entity set; unset when inference failed
    pub entity_set: Option<NodeId>,
    /// Declared `End` element, unset for inferred bindings
    pub declared: Option<NodeId>,
}

/// `AssociationSet`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationSetData {
    /// Association name as written
    pub association: Option<String>,
    /// Resolved association
    pub resolved_association: Option<NodeId>,
    /// Declared `End` children
    pub ends: Vec<NodeId>,
    /// One binding per association end, declared or inferred
    pub bindings: Vec<EndBinding>,
}

/// `End` of an association set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationSetEndData {
    /// Role name as written
    pub role: Option<String>,
    /// Entity set name as written
    pub entity_set: Option<String>,
    /// Resolved association end
    pub resolved_end: Option<NodeId>,
    /// Resolved entity set
    pub resolved_entity_set: Option<NodeId>,
}

/// `FunctionImport`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionImportData {
    /// `ReturnType`
    pub return_type: TypeUsage,
    /// Entity set name as written
    pub entity_set: Option<String>,
    /// Resolved entity set
    pub resolved_entity_set: Option<NodeId>,
    /// `IsComposable`
    pub is_composable: bool,
    /// `IsSideEffecting`
    pub is_side_effecting: Option<bool>,
    /// `IsBindable`
    pub is_bindable: bool,
    /// Parameters keyed by name
    pub parameters: NamedTable,
}

// =============================================================================
// NodeKind
// =============================================================================

/// Payload of a model node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Schema(SchemaData),
    /// `Using`
    Using(UsingData),
    /// `Documentation`
    Documentation(DocumentationData),
    /// Text holder
    Text(TextData),
    /// Primitive type
    PrimitiveType(PrimitiveTypeData),
    /// Manifest facet description
    FacetDescription(FacetDescriptionData),
    /// `EntityType`
    EntityType(StructuredTypeData),
    /// `ComplexType`
    ComplexType(StructuredTypeData),
    /// `Key`
    Key(KeyData),
    /// `PropertyRef`
    PropertyRef(PropertyRefData),
    /// `Property`
    Property(PropertyData),
    /// `NavigationProperty`
    NavigationProperty(NavigationPropertyData),
    /// `EnumType`
    EnumType(EnumTypeData),
    /// Enum `Member`
    EnumMember(EnumMemberData),
    /// `Association`
    Association(AssociationData),
    /// Association `End`
    AssociationEnd(AssociationEndData),
    /// `OnDelete`
    OnDelete(OnDeleteData),
    /// `ReferentialConstraint`
    ReferentialConstraint(ReferentialConstraintData),
    /// `Principal` / `Dependent`
    ConstraintRole(ConstraintRoleData),
    /// `Function`
    Function(FunctionData),
    /// `Parameter`
    Parameter(ParameterData),
    /// `ReturnType` element
    ReturnType(TypeUsage),
    /// `CollectionType`
    CollectionType(TypeUsage),
    /// `RowType`
    RowType(RowTypeData),
    /// `Property` of a row type
    RowProperty(TypeUsage),
    /// `ReferenceType`
    ReferenceType(TypeUsage),
    /// `TypeRef`
    TypeRef(TypeUsage),
    /// `EntityContainer`
    EntityContainer(EntityContainerData),
    /// `EntitySet`
    EntitySet(EntitySetData),
    /// `AssociationSet`
    AssociationSet(AssociationSetData),
    /// Association set `End`
    AssociationSetEnd(AssociationSetEndData),
    /// `FunctionImport`
    FunctionImport(FunctionImportData),
}

impl NodeKind {
    /// Tag of this kind
    pub fn element_kind(&self) -> ElementKind {
        match self {
            NodeKind::Schema(_) => ElementKind::Schema,
            NodeKind::Using(_) => ElementKind::Using,
            NodeKind::Documentation(_) => ElementKind::Documentation,
            NodeKind::Text(_) => ElementKind::Text,
            NodeKind::PrimitiveType(_) => ElementKind::PrimitiveType,
            NodeKind::FacetDescription(_) => ElementKind::FacetDescription,
            NodeKind::EntityType(_) => ElementKind::EntityType,
            NodeKind::ComplexType(_) => ElementKind::ComplexType,
            NodeKind::Key(_) => ElementKind::Key,
            NodeKind::PropertyRef(_) => ElementKind::PropertyRef,
            NodeKind::Property(_) => ElementKind::Property,
            NodeKind::NavigationProperty(_) => ElementKind::NavigationProperty,
            NodeKind::EnumType(_) => ElementKind::EnumType,
            NodeKind::EnumMember(_) => ElementKind::EnumMember,
            NodeKind::Association(_) => ElementKind::Association,
            NodeKind::AssociationEnd(_) => ElementKind::AssociationEnd,
            NodeKind::OnDelete(_) => ElementKind::OnDelete,
            NodeKind::ReferentialConstraint(_) => ElementKind::ReferentialConstraint,
            NodeKind::ConstraintRole(_) => ElementKind::ConstraintRole,
            NodeKind::Function(_) => ElementKind::Function,
            NodeKind::Parameter(_) => ElementKind::Parameter,
            NodeKind::ReturnType(_) => ElementKind::ReturnType,
            NodeKind::CollectionType(_) => ElementKind::CollectionType,
            NodeKind::RowType(_) => ElementKind::RowType,
            NodeKind::RowProperty(_) => ElementKind::RowProperty,
            NodeKind::ReferenceType(_) => ElementKind::ReferenceType,
            NodeKind::TypeRef(_) => ElementKind::TypeRef,
            NodeKind::EntityContainer(_) => ElementKind::EntityContainer,
            NodeKind::EntitySet(_) => ElementKind::EntitySet,
            NodeKind::AssociationSet(_) => ElementKind::AssociationSet,
            NodeKind::AssociationSetEnd(_) => ElementKind::AssociationSetEnd,
            NodeKind::FunctionImport(_) => ElementKind::FunctionImport,
        }
    }

    /// Whether nodes of this kind are registered in the global type table
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::PrimitiveType(_)
                | NodeKind::EntityType(_)
                | NodeKind::ComplexType(_)
                | NodeKind::EnumType(_)
                | NodeKind::Association(_)
        )
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, NodeKind::PrimitiveType(_))
    }

    /// Entity or complex type data
    pub fn structured(&self) -> Option<&StructuredTypeData> {
        match self {
            NodeKind::EntityType(data) | NodeKind::ComplexType(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable entity or complex type data
    pub fn structured_mut(&mut self) -> Option<&mut StructuredTypeData> {
        match self {
            NodeKind::EntityType(data) | NodeKind::ComplexType(data) => Some(data),
            _ => None,
        }
    }

    /// Type reference of a type-using element
    pub fn type_usage(&self) -> Option<&TypeUsage> {
        match self {
            NodeKind::Property(data) => Some(&data.usage),
            NodeKind::Parameter(data) => Some(&data.usage),
            NodeKind::ReturnType(usage)
            | NodeKind::CollectionType(usage)
            | NodeKind::RowProperty(usage)
            | NodeKind::ReferenceType(usage)
            | NodeKind::TypeRef(usage) => Some(usage),
            NodeKind::Function(data) => Some(&data.return_type),
            NodeKind::FunctionImport(data) => Some(&data.return_type),
            _ => None,
        }
    }

    /// Mutable type reference of a type-using element
    pub fn type_usage_mut(&mut self) -> Option<&mut TypeUsage> {
        match self {
            NodeKind::Property(data) => Some(&mut data.usage),
            NodeKind::Parameter(data) => Some(&mut data.usage),
            NodeKind::ReturnType(usage)
            | NodeKind::CollectionType(usage)
            | NodeKind::RowProperty(usage)
            | NodeKind::ReferenceType(usage)
            | NodeKind::TypeRef(usage) => Some(usage),
            NodeKind::Function(data) => Some(&mut data.return_type),
            NodeKind::FunctionImport(data) => Some(&mut data.return_type),
            _ => None,
        }
    }

    /// Name-keyed children table, for kinds that have one
    pub fn member_table(&self) -> Option<&NamedTable> {
        match self {
            NodeKind::EntityType(data) | NodeKind::ComplexType(data) => Some(&data.members),
            NodeKind::EnumType(data) => Some(&data.members),
            NodeKind::Association(data) => Some(&data.ends),
            NodeKind::Function(data) => Some(&data.parameters),
            NodeKind::FunctionImport(data) => Some(&data.parameters),
            NodeKind::RowType(data) => Some(&data.properties),
            NodeKind::EntityContainer(data) => Some(&data.members),
            _ => None,
        }
    }

    /// Mutable name-keyed children table
    pub fn member_table_mut(&mut self) -> Option<&mut NamedTable> {
        match self {
            NodeKind::EntityType(data) | NodeKind::ComplexType(data) => Some(&mut data.members),
            NodeKind::EnumType(data) => Some(&mut data.members),
            NodeKind::Association(data) => Some(&mut data.ends),
            NodeKind::Function(data) => Some(&mut data.parameters),
            NodeKind::FunctionImport(data) => Some(&mut data.parameters),
            NodeKind::RowType(data) => Some(&mut data.properties),
            NodeKind::EntityContainer(data) => Some(&mut data.members),
            _ => None,
        }
    }

    /// Visit every node reference held by the payload
    pub(crate) fn for_each_id_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        fn opt(id: &mut Option<NodeId>, f: &mut dyn FnMut(&mut NodeId)) {
            if let Some(id) = id {
                f(id);
            }
        }
        fn usage(u: &mut TypeUsage, f: &mut dyn FnMut(&mut NodeId)) {
            opt(&mut u.resolved, f);
            opt(&mut u.inline, f);
        }

        match self {
            NodeKind::Schema(data) => {
                data.types.iter_mut().for_each(&mut *f);
                data.functions.iter_mut().for_each(&mut *f);
                data.containers.iter_mut().for_each(&mut *f);
                data.usings.iter_mut().for_each(&mut *f);
            }
            NodeKind::Using(_)
            | NodeKind::Text(_)
            | NodeKind::PrimitiveType(_)
            | NodeKind::FacetDescription(_)
            | NodeKind::OnDelete(_) => {}
            NodeKind::Documentation(data) => {
                opt(&mut data.summary, f);
                opt(&mut data.long_description, f);
            }
            NodeKind::EntityType(data) | NodeKind::ComplexType(data) => {
                opt(&mut data.resolved_base, f);
                data.members.for_each_id_mut(f);
                opt(&mut data.key, f);
            }
            NodeKind::Key(data) => data.property_refs.iter_mut().for_each(&mut *f),
            NodeKind::PropertyRef(data) => opt(&mut data.property, f),
            NodeKind::Property(data) => usage(&mut data.usage, f),
            NodeKind::NavigationProperty(data) => {
                opt(&mut data.resolved_relationship, f);
                opt(&mut data.from_end, f);
                opt(&mut data.to_end, f);
            }
            NodeKind::EnumType(data) => {
                opt(&mut data.resolved_underlying, f);
                data.members.for_each_id_mut(f);
            }
            NodeKind::EnumMember(_) => {}
            NodeKind::Association(data) => {
                data.ends.for_each_id_mut(f);
                data.constraints.iter_mut().for_each(&mut *f);
            }
            NodeKind::AssociationEnd(data) => opt(&mut data.resolved_type, f),
            NodeKind::ReferentialConstraint(data) => {
                opt(&mut data.principal, f);
                opt(&mut data.dependent, f);
            }
            NodeKind::ConstraintRole(data) => {
                opt(&mut data.end, f);
                data.property_refs.iter_mut().for_each(&mut *f);
            }
            NodeKind::Function(data) => {
                usage(&mut data.return_type, f);
                data.return_types.iter_mut().for_each(&mut *f);
                data.parameters.for_each_id_mut(f);
                opt(&mut data.command_text, f);
                opt(&mut data.defining_expression, f);
            }
            NodeKind::Parameter(data) => usage(&mut data.usage, f),
            NodeKind::ReturnType(u)
            | NodeKind::CollectionType(u)
            | NodeKind::RowProperty(u)
            | NodeKind::ReferenceType(u)
            | NodeKind::TypeRef(u) => usage(u, f),
            NodeKind::RowType(data) => data.properties.for_each_id_mut(f),
            NodeKind::EntityContainer(data) => {
                opt(&mut data.resolved_extends, f);
                data.members.for_each_id_mut(f);
            }
            NodeKind::EntitySet(data) => {
                opt(&mut data.resolved_type, f);
                opt(&mut data.defining_query, f);
            }
            NodeKind::AssociationSet(data) => {
                opt(&mut data.resolved_association, f);
                data.ends.iter_mut().for_each(&mut *f);
                for binding in &mut data.bindings {
                    f(&mut binding.end);
                    opt(&mut binding.entity_set, f);
                    opt(&mut binding.declared, f);
                }
            }
            NodeKind::AssociationSetEnd(data) => {
                opt(&mut data.resolved_end, f);
                opt(&mut data.resolved_entity_set, f);
            }
            NodeKind::FunctionImport(data) => {
                usage(&mut data.return_type, f);
                opt(&mut data.resolved_entity_set, f);
                data.parameters.for_each_id_mut(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity_literals() {
        assert_eq!(Multiplicity::parse("0..1"), Some(Multiplicity::ZeroOrOne));
        assert_eq!(Multiplicity::parse("*"), Some(Multiplicity::Many));
        assert_eq!(Multiplicity::parse("many"), None);
        assert_eq!(Multiplicity::One.to_string(), "1");
    }

    #[test]
    fn test_parameter_mode_and_action() {
        assert_eq!(ParameterMode::parse("InOut"), Some(ParameterMode::InOut));
        assert_eq!(ParameterMode::parse("in"), None);
        assert_eq!(Action::parse("Cascade"), Some(Action::Cascade));
    }

    #[test]
    fn test_type_usage_text() {
        let mut usage = TypeUsage::default();
        usage.set_type_text("Collection(Model.Order)");
        assert!(usage.collection);
        assert_eq!(usage.type_name.as_deref(), Some("Model.Order"));
        assert!(usage.is_nullable());

        usage.set_type_text("Ref(Model.Customer)");
        assert!(usage.reference);
        assert!(!usage.collection);
    }

    #[test]
    fn test_effective_multiplicity() {
        let mut end = AssociationEndData::default();
        assert_eq!(end.effective_multiplicity(), None);
        end.inferred_multiplicity = Some(Multiplicity::Many);
        assert_eq!(end.effective_multiplicity(), Some(Multiplicity::Many));
        end.multiplicity = Some(Multiplicity::One);
        assert_eq!(end.effective_multiplicity(), Some(Multiplicity::One));
    }

    #[test]
    fn test_for_each_id_mut() {
        let mut kind = NodeKind::NavigationProperty(NavigationPropertyData {
            resolved_relationship: Some(NodeId::from_index(3)),
            from_end: Some(NodeId::from_index(4)),
            ..Default::default()
        });
        let mut seen = Vec::new();
        kind.for_each_id_mut(&mut |id| {
            seen.push(*id);
            *id = NodeId::from_index(id.index() + 10);
        });
        assert_eq!(seen.len(), 2);
        match kind {
            NodeKind::NavigationProperty(data) => {
                assert_eq!(data.from_end, Some(NodeId::from_index(14)));
            }
            _ => unreachable!(),
        }
    }
}
