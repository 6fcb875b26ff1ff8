//! Entity containers and their members

use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::{Dialect, QName, ANNOTATION_NAMESPACE, STORE_GENERATOR_NAMESPACE};

use crate::schema::kinds::{
    AssociationSetData, AssociationSetEndData, EntitySetData, FunctionImportData, NodeKind, ParameterData,
    TextRole,
};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{named_attribute, named_element, require_name, text_element, type_usage_attribute};
use super::ElementHandler;

/// `EntityContainer`
pub(crate) struct EntityContainerHandler;

impl ElementHandler for EntityContainerHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let conceptual = p.dialect == Dialect::Conceptual;
        if attr.is("Extends") && conceptual {
            if let NodeKind::EntityContainer(data) = &mut p.model[id].kind {
                data.extends = Some(attr.value.trim().to_string());
            }
            true
        } else if attr.is_in(ANNOTATION_NAMESPACE, "LazyLoadingEnabled") && conceptual {
            let value = p.parse_bool(attr);
            if let NodeKind::EntityContainer(data) = &mut p.model[id].kind {
                data.lazy_loading_enabled = value;
            }
            true
        } else {
            named_attribute(p, id, attr)
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        let conceptual = p.dialect == Dialect::Conceptual;
        let kind = match name.local_name.as_str() {
            _ if !p.is_own(name, &name.local_name) => return Ok(false),
            "EntitySet" => NodeKind::EntitySet(EntitySetData::default()),
            "AssociationSet" => NodeKind::AssociationSet(AssociationSetData::default()),
            "FunctionImport" if conceptual => NodeKind::FunctionImport(FunctionImportData::default()),
            _ => return named_element(p, id, name, line_info),
        };
        let child = p.parse_child(id, kind, line_info)?;
        p.add_member(id, child);
        Ok(true)
    }
}

/// `EntitySet`
pub(crate) struct EntitySetHandler;

impl ElementHandler for EntitySetHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let storage = p.dialect == Dialect::Storage;
        let value = Some(attr.value.trim().to_string());
        let NodeKind::EntitySet(data) = &mut p.model[id].kind else {
            return false;
        };
        if attr.is("EntityType") {
            data.entity_type = value;
        } else if attr.is("Schema") && storage {
            data.schema = value;
        } else if attr.is("Table") && storage {
            data.table = value;
        } else if attr.is_in(STORE_GENERATOR_NAMESPACE, "Type") && storage {
            data.store_type = value;
        } else if attr.is_in(STORE_GENERATOR_NAMESPACE, "Schema") && storage {
            data.store_schema = value;
        } else if attr.is_in(STORE_GENERATOR_NAMESPACE, "Name") && storage {
            data.store_name = value;
        } else {
            return named_attribute(p, id, attr);
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        let present = matches!(&p.model[id].kind, NodeKind::EntitySet(data) if data.entity_type.is_some());
        p.require(id, present, "EntityType");
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !(p.is_own(name, "DefiningQuery") && p.dialect == Dialect::Storage) {
            return named_element(p, id, name, line_info);
        }
        let taken = matches!(&p.model[id].kind, NodeKind::EntitySet(d) if d.defining_query.is_some());
        if taken {
            p.too_many(id, "DefiningQuery", line_info);
        }
        let text = text_element(p, id, TextRole::DefiningQuery, line_info)?;
        if let NodeKind::EntitySet(data) = &mut p.model[id].kind {
            data.defining_query.get_or_insert(text);
        }
        Ok(true)
    }
}

/// `AssociationSet`
pub(crate) struct AssociationSetHandler;

impl ElementHandler for AssociationSetHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if !attr.is("Association") {
            return named_attribute(p, id, attr);
        }
        if let NodeKind::AssociationSet(data) = &mut p.model[id].kind {
            data.association = Some(attr.value.trim().to_string());
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        let present = matches!(&p.model[id].kind, NodeKind::AssociationSet(data) if data.association.is_some());
        p.require(id, present, "Association");
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "End") {
            return named_element(p, id, name, line_info);
        }
        let count = match &p.model[id].kind {
            NodeKind::AssociationSet(data) => data.ends.len(),
            _ => 0,
        };
        if count >= 2 {
            p.too_many(id, "End", line_info);
        }
        let end = p.parse_child(id, NodeKind::AssociationSetEnd(AssociationSetEndData::default()), line_info)?;
        if let NodeKind::AssociationSet(data) = &mut p.model[id].kind {
            if data.ends.len() < 2 {
                data.ends.push(end);
            }
        }
        Ok(true)
    }
}

/// Association set `End`
pub(crate) struct AssociationSetEndHandler;

impl ElementHandler for AssociationSetEndHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let value = Some(attr.value.trim().to_string());
        let NodeKind::AssociationSetEnd(data) = &mut p.model[id].kind else {
            return false;
        };
        if attr.is("Role") {
            data.role = value;
        } else if attr.is("EntitySet") {
            data.entity_set = value;
        } else {
            return false;
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let present = matches!(&p.model[id].kind, NodeKind::AssociationSetEnd(data) if data.entity_set.is_some());
        p.require(id, present, "EntitySet");
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        named_element(p, id, name, line_info)
    }
}

/// `FunctionImport`
pub(crate) struct FunctionImportHandler;

impl ElementHandler for FunctionImportHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("EntitySet") {
            if let NodeKind::FunctionImport(data) = &mut p.model[id].kind {
                data.entity_set = Some(attr.value.trim().to_string());
            }
            return true;
        }
        let flag = match attr.name.local_name.as_str() {
            "IsComposable" | "IsSideEffecting" | "IsBindable" if attr.name.namespace.is_none() => {
                Some(p.parse_bool(attr))
            }
            _ => None,
        };
        if let Some(value) = flag {
            if let NodeKind::FunctionImport(data) = &mut p.model[id].kind {
                match attr.name.local_name.as_str() {
                    "IsComposable" => data.is_composable = value.unwrap_or(false),
                    "IsSideEffecting" => data.is_side_effecting = value,
                    _ => data.is_bindable = value.unwrap_or(false),
                }
            }
            return true;
        }
        named_attribute(p, id, attr) || type_usage_attribute(p, id, attr, "ReturnType")
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "Parameter") {
            return named_element(p, id, name, line_info);
        }
        let child = p.parse_child(id, NodeKind::Parameter(ParameterData::default()), line_info)?;
        p.add_member(id, child);
        Ok(true)
    }
}
