//! Functions, parameters and the inline type elements

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::namespaces::{Dialect, QName, SchemaVersion};

use crate::schema::kinds::{NodeKind, ParameterData, ParameterMode, TextRole, TypeUsage};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{
    inline_type_element, named_attribute, named_element, require_name, require_type, require_version,
    text_element, type_usage_attribute,
};
use super::ElementHandler;

const PARAMETER_TYPE_SEMANTICS: &[&str] = &[
    "ExactMatchOnly",
    "AllowImplicitPromotion",
    "AllowImplicitConversion",
];

/// `Function` of all three dialects
pub(crate) struct FunctionHandler;

impl FunctionHandler {
    fn store_attribute(p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let flag = match attr.name.local_name.as_str() {
            "Aggregate" | "BuiltIn" | "NiladicFunction" | "IsComposable" if attr.name.namespace.is_none() => {
                p.parse_bool(attr)
            }
            _ => None,
        };
        let text = Some(attr.value.trim().to_string());

        let NodeKind::Function(data) = &mut p.model[id].kind else {
            return false;
        };
        match attr.name.local_name.as_str() {
            _ if attr.name.namespace.is_some() => return false,
            "Aggregate" => data.is_aggregate = flag.unwrap_or(false),
            "BuiltIn" => data.is_builtin = flag.unwrap_or(false),
            "NiladicFunction" => data.is_niladic = flag.unwrap_or(false),
            "IsComposable" => data.is_composable = flag.unwrap_or(true),
            "Schema" => data.schema = text,
            "StoreFunctionName" => data.store_function_name = text,
            "ParameterTypeSemantics" => {
                let valid = PARAMETER_TYPE_SEMANTICS.contains(&attr.value.trim());
                data.parameter_type_semantics = text;
                if !valid {
                    p.error(
                        attr.line_info,
                        ErrorCode::InvalidValue,
                        format!("'{}' is not a valid parameter type semantics", attr.value),
                    );
                }
            }
            _ => return false,
        }
        true
    }
}

impl ElementHandler for FunctionHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if named_attribute(p, id, attr) {
            return true;
        }
        if p.dialect != Dialect::Conceptual && Self::store_attribute(p, id, attr) {
            return true;
        }
        type_usage_attribute(p, id, attr, "ReturnType")
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
        if p.dialect == Dialect::Conceptual {
            require_version(p, id, SchemaVersion::V2_0);
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        let conceptual = p.dialect == Dialect::Conceptual;
        if p.is_own(name, "Parameter") {
            let child = p.parse_child(id, NodeKind::Parameter(ParameterData::default()), line_info)?;
            p.add_member(id, child);
        } else if p.is_own(name, "ReturnType") {
            let child = p.parse_child(id, NodeKind::ReturnType(TypeUsage::default()), line_info)?;
            if let NodeKind::Function(data) = &mut p.model[id].kind {
                data.return_types.push(child);
            }
        } else if p.is_own(name, "CommandText") && p.dialect == Dialect::Storage {
            let taken = matches!(&p.model[id].kind, NodeKind::Function(d) if d.command_text.is_some());
            if taken {
                p.too_many(id, "CommandText", line_info);
            }
            let text = text_element(p, id, TextRole::CommandText, line_info)?;
            if let NodeKind::Function(data) = &mut p.model[id].kind {
                data.command_text.get_or_insert(text);
            }
        } else if p.is_own(name, "DefiningExpression") && conceptual {
            let taken = matches!(&p.model[id].kind, NodeKind::Function(d) if d.defining_expression.is_some());
            if taken {
                p.too_many(id, "DefiningExpression", line_info);
            }
            let text = text_element(p, id, TextRole::DefiningExpression, line_info)?;
            if let NodeKind::Function(data) = &mut p.model[id].kind {
                data.defining_expression.get_or_insert(text);
            }
        } else {
            return named_element(p, id, name, line_info);
        }
        Ok(true)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let (attribute, elements) = match &p.model[id].kind {
            NodeKind::Function(data) => (data.return_type.is_specified(), data.return_types.len()),
            _ => return,
        };
        if attribute && elements > 0 {
            let line_info = p.model[id].line_info;
            p.error(
                line_info,
                ErrorCode::TooManyElements,
                "A function may declare its return type as an attribute or as ReturnType elements, not both",
            );
        }
    }
}

/// `Parameter`
pub(crate) struct ParameterHandler;

impl ElementHandler for ParameterHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("Mode") {
            let mode = ParameterMode::parse(&attr.value);
            if mode.is_none() {
                p.error(
                    attr.line_info,
                    ErrorCode::InvalidParameterMode,
                    format!("'{}' is not a valid parameter mode; expected In, Out or InOut", attr.value),
                );
            }
            if let NodeKind::Parameter(data) = &mut p.model[id].kind {
                data.mode = mode;
            }
            true
        } else {
            named_attribute(p, id, attr) || type_usage_attribute(p, id, attr, "Type")
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if p.dialect == Dialect::Conceptual && inline_type_element(p, id, name, line_info)? {
            return Ok(true);
        }
        named_element(p, id, name, line_info)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "Type");
    }
}

/// `ReturnType` element
pub(crate) struct ReturnTypeHandler;

impl ElementHandler for ReturnTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        type_usage_attribute(p, id, attr, "Type")
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        inline_type_element(p, id, name, line_info)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "Type");
    }
}

/// `CollectionType`
pub(crate) struct CollectionTypeHandler;

impl ElementHandler for CollectionTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        type_usage_attribute(p, id, attr, "ElementType")
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        inline_type_element(p, id, name, line_info)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "ElementType");
    }
}

/// `RowType`
pub(crate) struct RowTypeHandler;

impl ElementHandler for RowTypeHandler {
    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, "Property") {
            return Ok(false);
        }
        let child = p.parse_child(id, NodeKind::RowProperty(TypeUsage::default()), line_info)?;
        p.add_member(id, child);
        Ok(true)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let empty = p.model[id].kind.member_table().map_or(true, |t| t.is_empty());
        if empty {
            let line_info = p.model[id].line_info;
            p.error(
                line_info,
                ErrorCode::MissingRequiredElement,
                "A RowType must contain at least one Property",
            );
        }
    }
}

/// `Property` of a row type
pub(crate) struct RowPropertyHandler;

impl ElementHandler for RowPropertyHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        named_attribute(p, id, attr) || type_usage_attribute(p, id, attr, "Type")
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_name(p, id);
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        inline_type_element(p, id, name, line_info)
    }

    fn children_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "Type");
    }
}

/// `ReferenceType`
pub(crate) struct ReferenceTypeHandler;

impl ElementHandler for ReferenceTypeHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        if attr.is("Type") {
            type_usage_attribute(p, id, attr, "Type")
        } else {
            false
        }
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "Type");
    }
}

/// `TypeRef`
pub(crate) struct TypeRefHandler;

impl ElementHandler for TypeRefHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        type_usage_attribute(p, id, attr, "Type")
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        require_type(p, id, "Type");
    }
}
