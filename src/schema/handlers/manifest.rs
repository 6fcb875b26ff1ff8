//! Provider manifest types and facet descriptions

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::QName;

use crate::schema::builtins::PrimitiveKind;
use crate::schema::facets::{FacetDescription, FacetName};
use crate::schema::kinds::{FacetDescriptionData, NodeKind};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{named_attribute, named_element, require_name};
use super::ElementHandler;

/// Manifest `Type`
pub(crate) struct PrimitiveTypeHandler;

impl ElementHandler for PrimitiveTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if !attr.is("PrimitiveTypeKind") {
            return named_attribute(p, id, attr);
        }
        let kind = PrimitiveKind::from_name(attr.value.trim());
        if kind.is_none() {
            p.error(
                attr.line_info,
                ErrorCode::InvalidValue,
                format!("'{}' is not a primitive type kind", attr.value),
            );
        }
        if let NodeKind::PrimitiveType(data) = &mut p.model[id].kind {
            data.kind = kind;
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        let present = matches!(&p.model[id].kind, NodeKind::PrimitiveType(data) if data.kind.is_some());
        p.require(id, present, "PrimitiveTypeKind");
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if p.is_own(name, "FacetDescriptions") {
            p.parse_wrapper(id, "FacetDescriptions", facet_description)?;
            Ok(true)
        } else {
            named_element(p, id, name, line_info)
        }
    }
}

fn facet_description(p: &mut Parser<'_>, owner: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
    let Some(facet) = FacetName::from_name(&name.local_name).filter(|_| p.is_own(name, &name.local_name)) else {
        return Ok(false);
    };
    let data = FacetDescriptionData {
        description: FacetDescription::new(facet),
    };
    p.parse_child(owner, NodeKind::FacetDescription(data), line_info)?;
    Ok(true)
}

/// One facet element inside `FacetDescriptions`
pub(crate) struct FacetDescriptionHandler;

impl ElementHandler for FacetDescriptionHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let facet = match &p.model[id].kind {
            NodeKind::FacetDescription(data) => data.description.name,
            _ => return false,
        };
        if attr.is("Minimum") || attr.is("Maximum") {
            let value = p.parse_integer(attr);
            if let NodeKind::FacetDescription(data) = &mut p.model[id].kind {
                if attr.is("Minimum") {
                    data.description.minimum = value;
                } else {
                    data.description.maximum = value;
                }
            }
        } else if attr.is("DefaultValue") {
            match facet.parse_value(&attr.value) {
                Ok(value) => {
                    if let NodeKind::FacetDescription(data) = &mut p.model[id].kind {
                        data.description.default_value = Some(value);
                    }
                }
                Err(err) => p.error(attr.line_info, err.code(), err.to_string()),
            }
        } else if attr.is("Constant") {
            let constant = p.parse_bool(attr).unwrap_or(false);
            if let NodeKind::FacetDescription(data) = &mut p.model[id].kind {
                data.description.is_constant = constant;
            }
        } else {
            return false;
        }
        true
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let description = match &p.model[id].kind {
            NodeKind::FacetDescription(data) => data.description.clone(),
            _ => return,
        };
        let Some(parent) = p.model[id].parent else {
            return;
        };
        if let NodeKind::PrimitiveType(data) = &mut p.model[parent].kind {
            if data.facets.iter().any(|d| d.name == description.name) {
                let line_info = p.model[id].line_info;
                p.too_many(parent, description.name.as_str(), line_info);
            } else {
                data.facets.push(description);
            }
        }
    }
}
