//! Per-kind element handlers
//!
//! Each node kind has an [`ElementHandler`]. A handler accepts the
//! attributes and child elements its kind understands and passes everything
//! else to the handler helpers of its more generic base kinds, e.g. an
//! entity type falls back to the structured type helpers, which fall back to
//! the named element helpers in [`common`].

mod common;
mod containers;
mod functions;
mod manifest;
mod relationships;
mod schema;
mod types;

use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::QName;

use super::kinds::NodeKind;
use super::model::NodeId;
use super::parsing::Parser;

/// Parsing behaviour of one node kind
pub(crate) trait ElementHandler: Sync {
    /// Accept an attribute; `false` leaves it to the parser
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let _ = (p, id, attr);
        false
    }

    /// Accept a child element; `false` leaves it to the parser
    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        let _ = (p, id, name, line_info);
        Ok(false)
    }

    /// Accept text content; `false` reports it
    fn handle_text(&self, p: &mut Parser<'_>, id: NodeId, text: &str, line_info: LineInfo) -> bool {
        let _ = (p, id, text, line_info);
        false
    }

    /// Runs after the last attribute
    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let _ = (p, id);
    }

    /// Runs after the last child
    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let _ = (p, id);
    }
}

/// Handler for a node kind
pub(crate) fn handler_for(kind: &NodeKind) -> &'static dyn ElementHandler {
    match kind {
        NodeKind::Schema(_) => &schema::SchemaHandler,
        NodeKind::Using(_) => &schema::UsingHandler,
        NodeKind::Documentation(_) => &schema::DocumentationHandler,
        NodeKind::Text(_) => &schema::TextHandler,
        NodeKind::PrimitiveType(_) => &manifest::PrimitiveTypeHandler,
        NodeKind::FacetDescription(_) => &manifest::FacetDescriptionHandler,
        NodeKind::EntityType(_) => &types::EntityTypeHandler,
        NodeKind::ComplexType(_) => &types::ComplexTypeHandler,
        NodeKind::Key(_) => &types::KeyHandler,
        NodeKind::PropertyRef(_) => &types::PropertyRefHandler,
        NodeKind::Property(_) => &types::PropertyHandler,
        NodeKind::NavigationProperty(_) => &types::NavigationPropertyHandler,
        NodeKind::EnumType(_) => &types::EnumTypeHandler,
        NodeKind::EnumMember(_) => &types::EnumMemberHandler,
        NodeKind::Association(_) => &relationships::AssociationHandler,
        NodeKind::AssociationEnd(_) => &relationships::AssociationEndHandler,
        NodeKind::OnDelete(_) => &relationships::OnDeleteHandler,
        NodeKind::ReferentialConstraint(_) => &relationships::ReferentialConstraintHandler,
        NodeKind::ConstraintRole(_) => &relationships::ConstraintRoleHandler,
        NodeKind::Function(_) => &functions::FunctionHandler,
        NodeKind::Parameter(_) => &functions::ParameterHandler,
        NodeKind::ReturnType(_) => &functions::ReturnTypeHandler,
        NodeKind::CollectionType(_) => &functions::CollectionTypeHandler,
        NodeKind::RowType(_) => &functions::RowTypeHandler,
        NodeKind::RowProperty(_) => &functions::RowPropertyHandler,
        NodeKind::ReferenceType(_) => &functions::ReferenceTypeHandler,
        NodeKind::TypeRef(_) => &functions::TypeRefHandler,
        NodeKind::EntityContainer(_) => &containers::EntityContainerHandler,
        NodeKind::EntitySet(_) => &containers::EntitySetHandler,
        NodeKind::AssociationSet(_) => &containers::AssociationSetHandler,
        NodeKind::AssociationSetEnd(_) => &containers::AssociationSetEndHandler,
        NodeKind::FunctionImport(_) => &containers::FunctionImportHandler,
    }
}
