//! Handler helpers shared by the named and type-using element kinds

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::{QName, SchemaVersion};

use crate::schema::facets::FacetName;
use crate::schema::kinds::{DocumentationData, NodeKind, RowTypeData, TextData, TextRole, TypeUsage};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

/// `Name` attribute of a named element
pub(super) fn named_attribute(p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
    if attr.is("Name") {
        p.set_name(id, attr);
        true
    } else {
        false
    }
}

/// `Documentation` child of a named element
pub(super) fn named_element(p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
    if !p.is_own(name, "Documentation") {
        return Ok(false);
    }
    if p.model[id].documentation.is_some() {
        p.too_many(id, "Documentation", line_info);
    }
    let docs = p.parse_child(id, NodeKind::Documentation(DocumentationData::default()), line_info)?;
    p.model[id].documentation.get_or_insert(docs);
    Ok(true)
}

/// Report a missing `Name`
pub(super) fn require_name(p: &mut Parser<'_>, id: NodeId) {
    if p.model[id].name.as_deref().map_or(false, |name| !name.is_empty()) {
        return;
    }
    let (kind, line_info) = (p.model[id].element_kind(), p.model[id].line_info);
    p.error(
        line_info,
        ErrorCode::MissingName,
        format!("Element '{}' requires a Name", kind),
    );
}

/// Report an element the document's version epoch does not support
pub(super) fn require_version(p: &mut Parser<'_>, id: NodeId, minimum: SchemaVersion) {
    if p.version < minimum {
        let node = &p.model[id];
        let (kind, line_info) = (node.element_kind(), node.line_info);
        p.error(
            line_info,
            ErrorCode::UnsupportedInVersion,
            format!(
                "Element '{}' requires schema version {} or later; the document declares {}",
                kind, minimum, p.version
            ),
        );
    }
}

fn usage_mut<'p>(p: &'p mut Parser<'_>, id: NodeId) -> Option<&'p mut TypeUsage> {
    p.model[id].kind.type_usage_mut()
}

/// Type attribute and facets of a type-using element
pub(super) fn type_usage_attribute(
    p: &mut Parser<'_>,
    id: NodeId,
    attr: &XmlAttribute,
    type_attribute: &str,
) -> bool {
    if attr.is(type_attribute) {
        if let Some(usage) = usage_mut(p, id) {
            usage.set_type_text(&attr.value);
        }
        return true;
    }
    if attr.name.namespace.is_some() {
        return false;
    }
    let Some(facet) = FacetName::from_attribute(&attr.name.local_name) else {
        return false;
    };
    let result = match usage_mut(p, id) {
        Some(usage) => usage.facets.specify(facet, &attr.value, attr.line_info),
        None => return false,
    };
    if let Err(err) = result {
        p.error(attr.line_info, err.code(), err.to_string());
    }
    true
}

/// Inline type elements of function parameters and return types
pub(super) fn inline_type_element(
    p: &mut Parser<'_>,
    id: NodeId,
    name: &QName,
    line_info: LineInfo,
) -> Result<bool> {
    let kind = match name.local_name.as_str() {
        "CollectionType" => NodeKind::CollectionType(TypeUsage::default()),
        "RowType" => NodeKind::RowType(RowTypeData::default()),
        "ReferenceType" => NodeKind::ReferenceType(TypeUsage::default()),
        "TypeRef" => NodeKind::TypeRef(TypeUsage::default()),
        _ => return Ok(false),
    };
    if !p.is_own(name, &name.local_name) {
        return Ok(false);
    }
    let already = p.model[id].kind.type_usage().map_or(false, |u| u.inline.is_some());
    if already {
        p.too_many(id, &name.local_name, line_info);
    }
    let child = p.parse_child(id, kind, line_info)?;
    if let Some(usage) = usage_mut(p, id) {
        usage.inline.get_or_insert(child);
    }
    Ok(true)
}

/// Report a type-using element that names no type at all
pub(super) fn require_type(p: &mut Parser<'_>, id: NodeId, attribute: &str) {
    let present = p.model[id].kind.type_usage().map_or(false, |u| u.is_specified());
    p.require(id, present, attribute);
}

/// Parse a text-holder child element
pub(super) fn text_element(p: &mut Parser<'_>, owner: NodeId, role: TextRole, line_info: LineInfo) -> Result<NodeId> {
    p.parse_child(
        owner,
        NodeKind::Text(TextData {
            role,
            text: String::new(),
        }),
        line_info,
    )
}
