//! Associations, their ends and referential constraints

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::names::split_qualified;
use crate::namespaces::{Dialect, QName};

use crate::schema::kinds::{
    Action, AssociationEndData, ConstraintRoleData, ElementKind, Multiplicity, NodeKind, OnDeleteData,
    PropertyRefData, ReferentialConstraintData,
};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{named_attribute, named_element, require_name};
use super::ElementHandler;

/// `Association`
pub(crate) struct AssociationHandler;

impl ElementHandler for AssociationHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        named_attribute(p, id, attr)
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if p.is_own(name, "End") {
            let end = p.parse_child(id, NodeKind::AssociationEnd(AssociationEndData::default()), line_info)?;
            p.add_member(id, end);
            Ok(true)
        } else if p.is_own(name, "ReferentialConstraint") {
            let existing = matches!(&p.model[id].kind, NodeKind::Association(data) if !data.constraints.is_empty());
            if existing {
                p.too_many(id, "ReferentialConstraint", line_info);
            }
            let constraint = p.parse_child(
                id,
                NodeKind::ReferentialConstraint(ReferentialConstraintData::default()),
                line_info,
            )?;
            if let NodeKind::Association(data) = &mut p.model[id].kind {
                data.constraints.push(constraint);
            }
            Ok(true)
        } else {
            named_element(p, id, name, line_info)
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let node = &p.model[id];
        let count = node
            .children
            .iter()
            .filter(|child| p.model[**child].element_kind() == ElementKind::AssociationEnd)
            .count();
        if count != 2 {
            let (line_info, name) = (node.line_info, node.name_or_empty().to_string());
            p.error(
                line_info,
                ErrorCode::InvalidEndCount,
                format!("Association '{}' must have exactly two ends; found {}", name, count),
            );
        }
    }
}

/// Association `End`
pub(crate) struct AssociationEndHandler;

impl ElementHandler for AssociationEndHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("Role") {
            p.set_name(id, attr);
        } else if attr.is("Type") {
            if let NodeKind::AssociationEnd(data) = &mut p.model[id].kind {
                data.type_name = Some(attr.value.trim().to_string());
            }
        } else if attr.is("Multiplicity") {
            let multiplicity = Multiplicity::parse(&attr.value);
            if multiplicity.is_none() {
                p.error(
                    attr.line_info,
                    ErrorCode::InvalidMultiplicity,
                    format!("'{}' is not a valid multiplicity; expected 1, 0..1 or *", attr.value),
                );
            }
            if let NodeKind::AssociationEnd(data) = &mut p.model[id].kind {
                data.multiplicity = multiplicity;
            }
        } else {
            return false;
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let type_name = match &p.model[id].kind {
            NodeKind::AssociationEnd(data) => data.type_name.clone(),
            _ => return,
        };
        p.require(id, type_name.is_some(), "Type");
        // An unnamed end takes the simple name of its type as its role.
        if p.model[id].name.is_none() {
            if let Some(type_name) = type_name {
                let (_, simple) = split_qualified(&type_name);
                p.model[id].name = Some(simple.to_string());
            }
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "OnDelete") {
            return named_element(p, id, name, line_info);
        }
        let declared = matches!(&p.model[id].kind, NodeKind::AssociationEnd(data) if data.on_delete.is_some());
        if declared {
            p.too_many(id, "OnDelete", line_info);
        }
        p.parse_child(id, NodeKind::OnDelete(OnDeleteData::default()), line_info)?;
        Ok(true)
    }
}

/// `OnDelete`
pub(crate) struct OnDeleteHandler;

impl ElementHandler for OnDeleteHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if !attr.is("Action") {
            return false;
        }
        let action = match Action::parse(&attr.value) {
            Some(Action::Restrict) if p.dialect == Dialect::Conceptual => None,
            other => other,
        };
        if action.is_none() {
            p.error(
                attr.line_info,
                ErrorCode::InvalidAction,
                format!("'{}' is not a valid OnDelete action", attr.value),
            );
        }
        if let NodeKind::OnDelete(data) = &mut p.model[id].kind {
            data.action = Some(action.unwrap_or(Action::None));
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let action = match &p.model[id].kind {
            NodeKind::OnDelete(data) => data.action,
            _ => return,
        };
        p.require(id, action.is_some(), "Action");
        let Some(parent) = p.model[id].parent else {
            return;
        };
        if let NodeKind::AssociationEnd(end) = &mut p.model[parent].kind {
            end.on_delete = action;
        }
    }
}

/// `ReferentialConstraint`
pub(crate) struct ReferentialConstraintHandler;

impl ElementHandler for ReferentialConstraintHandler {
    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        let is_principal = if p.is_own(name, "Principal") {
            true
        } else if p.is_own(name, "Dependent") {
            false
        } else {
            return named_element(p, id, name, line_info);
        };

        let taken = match &p.model[id].kind {
            NodeKind::ReferentialConstraint(data) if is_principal => data.principal.is_some(),
            NodeKind::ReferentialConstraint(data) => data.dependent.is_some(),
            _ => false,
        };
        if taken {
            p.too_many(id, &name.local_name, line_info);
        }

        let role = ConstraintRoleData {
            is_principal,
            ..Default::default()
        };
        let child = p.parse_child(id, NodeKind::ConstraintRole(role), line_info)?;
        if let NodeKind::ReferentialConstraint(data) = &mut p.model[id].kind {
            let slot = if is_principal {
                &mut data.principal
            } else {
                &mut data.dependent
            };
            slot.get_or_insert(child);
        }
        Ok(true)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let (principal, dependent) = match &p.model[id].kind {
            NodeKind::ReferentialConstraint(data) => (data.principal.is_some(), data.dependent.is_some()),
            _ => return,
        };
        let line_info = p.model[id].line_info;
        for (present, element) in [(principal, "Principal"), (dependent, "Dependent")] {
            if !present {
                p.error(
                    line_info,
                    ErrorCode::MissingRequiredElement,
                    format!("A ReferentialConstraint requires a '{}' element", element),
                );
            }
        }
    }
}

/// `Principal` / `Dependent`
pub(crate) struct ConstraintRoleHandler;

impl ElementHandler for ConstraintRoleHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if !attr.is("Role") {
            return false;
        }
        if let NodeKind::ConstraintRole(data) = &mut p.model[id].kind {
            data.role = Some(attr.value.trim().to_string());
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let present = matches!(&p.model[id].kind, NodeKind::ConstraintRole(data) if data.role.is_some());
        p.require(id, present, "Role");
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "PropertyRef") {
            return named_element(p, id, name, line_info);
        }
        let child = p.parse_child(id, NodeKind::PropertyRef(PropertyRefData::default()), line_info)?;
        if let NodeKind::ConstraintRole(data) = &mut p.model[id].kind {
            data.property_refs.push(child);
        }
        Ok(true)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let empty = matches!(&p.model[id].kind, NodeKind::ConstraintRole(data) if data.property_refs.is_empty());
        if empty {
            let line_info = p.model[id].line_info;
            let element = if matches!(&p.model[id].kind, NodeKind::ConstraintRole(d) if d.is_principal) {
                "Principal"
            } else {
                "Dependent"
            };
            p.error(
                line_info,
                ErrorCode::MissingRequiredElement,
                format!("'{}' must contain at least one PropertyRef", element),
            );
        }
    }
}
