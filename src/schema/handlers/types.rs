//! Entity, complex and enum types and their members

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::{Dialect, QName, SchemaVersion, ANNOTATION_NAMESPACE};

use crate::schema::kinds::{
    EnumMemberData, KeyData, NavigationPropertyData, NodeKind, PropertyData, PropertyRefData,
};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{
    named_attribute, named_element, require_name, require_type, require_version, type_usage_attribute,
};
use super::ElementHandler;

const STORE_GENERATED_PATTERNS: &[&str] = &["None", "Identity", "Computed"];
const CONCURRENCY_MODES: &[&str] = &["None", "Fixed"];

// =============================================================================
// Structured types
// =============================================================================

fn structured_attribute(p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
    let conceptual = p.dialect == Dialect::Conceptual;
    if attr.is("BaseType") && conceptual {
        if let Some(data) = p.model[id].kind.structured_mut() {
            data.base_type = Some(attr.value.trim().to_string());
        }
        true
    } else if attr.is("Abstract") && conceptual {
        let value = p.parse_bool(attr).unwrap_or(false);
        if let Some(data) = p.model[id].kind.structured_mut() {
            data.is_abstract = value;
        }
        true
    } else {
        named_attribute(p, id, attr)
    }
}

fn structured_element(p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
    if p.is_own(name, "Property") {
        let child = p.parse_child(id, NodeKind::Property(PropertyData::default()), line_info)?;
        p.add_member(id, child);
        Ok(true)
    } else {
        named_element(p, id, name, line_info)
    }
}

/// `EntityType`
pub(crate) struct EntityTypeHandler;

impl ElementHandler for EntityTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        structured_attribute(p, id, attr)
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if p.is_own(name, "Key") {
            let existing = p.model[id].kind.structured().and_then(|d| d.key);
            if existing.is_some() {
                p.too_many(id, "Key", line_info);
            }
            let key = p.parse_child(id, NodeKind::Key(KeyData::default()), line_info)?;
            if let Some(data) = p.model[id].kind.structured_mut() {
                data.key.get_or_insert(key);
            }
            Ok(true)
        } else if p.is_own(name, "NavigationProperty") && p.dialect == Dialect::Conceptual {
            let child = p.parse_child(
                id,
                NodeKind::NavigationProperty(NavigationPropertyData::default()),
                line_info,
            )?;
            p.add_member(id, child);
            Ok(true)
        } else {
            structured_element(p, id, name, line_info)
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }
}

/// `ComplexType`
pub(crate) struct ComplexTypeHandler;

impl ElementHandler for ComplexTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        structured_attribute(p, id, attr)
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        structured_element(p, id, name, line_info)
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }
}

/// `Key`
pub(crate) struct KeyHandler;

impl ElementHandler for KeyHandler {
    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "PropertyRef") {
            return Ok(false);
        }
        let child = p.parse_child(id, NodeKind::PropertyRef(PropertyRefData::default()), line_info)?;
        if let NodeKind::Key(data) = &mut p.model[id].kind {
            data.property_refs.push(child);
        }
        Ok(true)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let empty = matches!(&p.model[id].kind, NodeKind::Key(data) if data.property_refs.is_empty());
        if empty {
            let line_info = p.model[id].line_info;
            p.error(
                line_info,
                ErrorCode::MissingRequiredElement,
                "A Key must contain at least one PropertyRef",
            );
        }
    }
}

/// `PropertyRef`
pub(crate) struct PropertyRefHandler;

impl ElementHandler for PropertyRefHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        named_attribute(p, id, attr)
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }
}

// =============================================================================
// Members
// =============================================================================

fn check_literal(p: &mut Parser<'_>, attr: &XmlAttribute, allowed: &[&str]) -> Option<String> {
    let value = attr.value.trim();
    if allowed.contains(&value) {
        Some(value.to_string())
    } else {
        p.error(
            attr.line_info,
            ErrorCode::InvalidValue,
            format!(
                "'{}' is not a valid value for attribute '{}'; expected one of {}",
                attr.value,
                attr.name.local_name,
                allowed.join(", ")
            ),
        );
        None
    }
}

/// `Property`
pub(crate) struct PropertyHandler;

impl ElementHandler for PropertyHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let conceptual = p.dialect == Dialect::Conceptual;
        let store_generated = if conceptual {
            attr.is_in(ANNOTATION_NAMESPACE, "StoreGeneratedPattern")
        } else {
            attr.is("StoreGeneratedPattern")
        };

        if store_generated {
            let value = check_literal(p, attr, STORE_GENERATED_PATTERNS);
            if let NodeKind::Property(data) = &mut p.model[id].kind {
                data.store_generated_pattern = value;
            }
            true
        } else if attr.is("ConcurrencyMode") && conceptual {
            let value = check_literal(p, attr, CONCURRENCY_MODES);
            if let NodeKind::Property(data) = &mut p.model[id].kind {
                data.concurrency_mode = value;
            }
            true
        } else {
            type_usage_attribute(p, id, attr, "Type") || named_attribute(p, id, attr)
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        named_element(p, id, name, line_info)
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        require_type(p, id, "Type");
    }
}

/// `NavigationProperty`
pub(crate) struct NavigationPropertyHandler;

impl ElementHandler for NavigationPropertyHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let value = attr.value.trim().to_string();
        let NodeKind::NavigationProperty(data) = &mut p.model[id].kind else {
            return false;
        };
        if attr.is("Relationship") {
            data.relationship = Some(value);
        } else if attr.is("FromRole") {
            data.from_role = Some(value);
        } else if attr.is("ToRole") {
            data.to_role = Some(value);
        } else {
            return named_attribute(p, id, attr);
        }
        true
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        named_element(p, id, name, line_info)
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        let (relationship, from, to) = match &p.model[id].kind {
            NodeKind::NavigationProperty(data) => (
                data.relationship.is_some(),
                data.from_role.is_some(),
                data.to_role.is_some(),
            ),
            _ => return,
        };
        p.require(id, relationship, "Relationship");
        p.require(id, from, "FromRole");
        p.require(id, to, "ToRole");
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// `EnumType`
pub(crate) struct EnumTypeHandler;

impl ElementHandler for EnumTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("UnderlyingType") {
            if let NodeKind::EnumType(data) = &mut p.model[id].kind {
                data.underlying_type = Some(attr.value.trim().to_string());
            }
            true
        } else if attr.is("IsFlags") {
            let value = p.parse_bool(attr).unwrap_or(false);
            if let NodeKind::EnumType(data) = &mut p.model[id].kind {
                data.is_flags = value;
            }
            true
        } else {
            named_attribute(p, id, attr)
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if p.is_own(name, "Member") {
            let child = p.parse_child(id, NodeKind::EnumMember(EnumMemberData::default()), line_info)?;
            p.add_member(id, child);
            Ok(true)
        } else {
            named_element(p, id, name, line_info)
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        require_version(p, id, SchemaVersion::V3_0);
    }
}

/// Enum `Member`
pub(crate) struct EnumMemberHandler;

impl ElementHandler for EnumMemberHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("Value") {
            let value = p.parse_integer(attr);
            if let NodeKind::EnumMember(data) = &mut p.model[id].kind {
                data.value = value;
            }
            true
        } else {
            named_attribute(p, id, attr)
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        named_element(p, id, name, line_info)
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }
}
