//! Document roots, `Using`, documentation and text holders

use crate::diagnostics::ErrorCode;
use crate::documents::XmlAttribute;
use crate::error::Result;
use crate::locations::LineInfo;
use crate::names::{is_valid_identifier, is_valid_qualified_name};
use crate::namespaces::{is_reserved_namespace, Dialect, QName};

use crate::schema::kinds::{
    AssociationData, EntityContainerData, EnumTypeData, FunctionData, NodeKind, PrimitiveTypeData,
    StructuredTypeData, TextRole, UsingData,
};
use crate::schema::model::NodeId;
use crate::schema::parsing::Parser;

use super::common::{named_element, text_element};
use super::ElementHandler;

/// Root element of all three dialects
pub(crate) struct SchemaHandler;

/// Where a parsed root child is recorded
enum Slot {
    Type,
    Function,
    Container,
    Using,
}

fn schema_mut<'p>(p: &'p mut Parser<'_>, id: NodeId) -> Option<&'p mut crate::schema::kinds::SchemaData> {
    p.model.schema_mut(id)
}

impl ElementHandler for SchemaHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let storage = p.dialect == Dialect::Storage;
        if attr.is("Namespace") {
            let value = attr.value.trim().to_string();
            if !is_valid_qualified_name(&value) {
                p.error(
                    attr.line_info,
                    ErrorCode::InvalidNamespace,
                    format!("'{}' is not a valid namespace name", attr.value),
                );
            }
            if let Some(schema) = schema_mut(p, id) {
                schema.namespace = Some(value);
            }
        } else if attr.is("Alias") && p.dialect != Dialect::ProviderManifest {
            let value = attr.value.trim().to_string();
            if !is_valid_identifier(&value) {
                p.error(
                    attr.line_info,
                    ErrorCode::InvalidName,
                    format!("'{}' is not a valid alias", attr.value),
                );
            }
            if let Some(schema) = schema_mut(p, id) {
                schema.alias = Some(value);
            }
        } else if attr.is("Provider") && storage {
            if let Some(schema) = schema_mut(p, id) {
                schema.provider = Some(attr.value.clone());
            }
        } else if attr.is("ProviderManifestToken") && storage {
            if let Some(schema) = schema_mut(p, id) {
                schema.provider_manifest_token = Some(attr.value.clone());
            }
        } else {
            return false;
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let line_info = p.model[id].line_info;
        let Some(schema) = p.model.schema(id) else {
            return;
        };
        let namespace = schema.namespace.clone();
        let alias = schema.alias.clone();
        let has_provider = schema.provider.is_some();
        let has_token = schema.provider_manifest_token.is_some();

        p.require(id, namespace.is_some(), "Namespace");
        if p.dialect == Dialect::Storage {
            p.require(id, has_provider, "Provider");
            p.require(id, has_token, "ProviderManifestToken");
        }
        let Some(namespace) = namespace else {
            return;
        };

        if is_reserved_namespace(&namespace) {
            p.error(
                line_info,
                ErrorCode::ReservedNamespace,
                format!("The namespace '{}' is reserved for built-in types", namespace),
            );
        }
        if p.dialect == Dialect::ProviderManifest {
            if let Some(schema) = schema_mut(p, id) {
                schema.primitive_namespace = namespace.clone();
            }
        }
        if let Some(alias) = alias {
            let result = match schema_mut(p, id) {
                Some(schema) => schema.aliases.add(&alias, &namespace),
                None => return,
            };
            if let Err(err) = result {
                p.error(
                    line_info,
                    ErrorCode::InvalidAlias,
                    format!("The alias '{}' {}", alias, err),
                );
            }
        }
    }

    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        if !p.is_own(name, &name.local_name) {
            return Ok(false);
        }
        if p.dialect == Dialect::ProviderManifest {
            return match name.local_name.as_str() {
                "Types" => {
                    p.parse_wrapper(id, "Types", manifest_type)?;
                    Ok(true)
                }
                "Functions" => {
                    p.parse_wrapper(id, "Functions", manifest_function)?;
                    Ok(true)
                }
                _ => Ok(false),
            };
        }

        let conceptual = p.dialect == Dialect::Conceptual;
        let (kind, slot) = match name.local_name.as_str() {
            "Using" if conceptual => (NodeKind::Using(UsingData::default()), Slot::Using),
            "EntityType" => (NodeKind::EntityType(StructuredTypeData::default()), Slot::Type),
            "ComplexType" if conceptual => (NodeKind::ComplexType(StructuredTypeData::default()), Slot::Type),
            "EnumType" if conceptual => (NodeKind::EnumType(EnumTypeData::default()), Slot::Type),
            "Association" => (NodeKind::Association(AssociationData::default()), Slot::Type),
            "EntityContainer" => (NodeKind::EntityContainer(EntityContainerData::default()), Slot::Container),
            "Function" => (NodeKind::Function(FunctionData::default()), Slot::Function),
            _ => return named_element(p, id, name, line_info),
        };
        let child = p.parse_child(id, kind, line_info)?;
        if let Some(schema) = schema_mut(p, id) {
            match slot {
                Slot::Type => schema.types.push(child),
                Slot::Function => schema.functions.push(child),
                Slot::Container => schema.containers.push(child),
                Slot::Using => schema.usings.push(child),
            }
        }
        Ok(true)
    }
}

fn manifest_type(p: &mut Parser<'_>, owner: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
    if !p.is_own(name, "Type") {
        return Ok(false);
    }
    let child = p.parse_child(owner, NodeKind::PrimitiveType(PrimitiveTypeData::default()), line_info)?;
    if let Some(schema) = p.model.schema_mut(owner) {
        schema.types.push(child);
    }
    Ok(true)
}

fn manifest_function(p: &mut Parser<'_>, owner: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
    if !p.is_own(name, "Function") {
        return Ok(false);
    }
    let child = p.parse_child(owner, NodeKind::Function(FunctionData::default()), line_info)?;
    if let Some(schema) = p.model.schema_mut(owner) {
        schema.functions.push(child);
    }
    Ok(true)
}

/// `Using`
pub(crate) struct UsingHandler;

impl ElementHandler for UsingHandler {
    fn handle_attribute(&self, p: &mut Parser<'_>, id: NodeId, attr: &XmlAttribute) -> bool {
        let NodeKind::Using(data) = &mut p.model[id].kind else {
            return false;
        };
        if attr.is("Namespace") {
            data.namespace = Some(attr.value.trim().to_string());
        } else if attr.is("Alias") {
            data.alias = Some(attr.value.trim().to_string());
        } else {
            return false;
        }
        true
    }

    fn attributes_complete(&self, p: &mut Parser<'_>, id: NodeId) {
        let line_info = p.model[id].line_info;
        let document = p.model[id].document;
        let (namespace, alias) = match &p.model[id].kind {
            NodeKind::Using(data) => (data.namespace.clone(), data.alias.clone()),
            _ => return,
        };
        p.require(id, namespace.is_some(), "Namespace");
        p.require(id, alias.is_some(), "Alias");
        let Some(namespace) = namespace else {
            return;
        };
        if is_reserved_namespace(&namespace) {
            p.error(
                line_info,
                ErrorCode::ReservedNamespace,
                format!("The namespace '{}' is reserved and cannot be referenced by Using", namespace),
            );
            return;
        }

        let result = match p.model.schema_mut(document) {
            Some(schema) => alias.as_deref().map(|a| schema.aliases.add(a, &namespace)),
            None => None,
        };
        if let (Some(Err(err)), Some(alias)) = (result, alias) {
            p.error(
                line_info,
                ErrorCode::InvalidAlias,
                format!("The alias '{}' {}", alias, err),
            );
        }
    }
}

/// `Documentation`
pub(crate) struct DocumentationHandler;

impl ElementHandler for DocumentationHandler {
    fn handle_element(&self, p: &mut Parser<'_>, id: NodeId, name: &QName, line_info: LineInfo) -> Result<bool> {
        let role = if p.is_own(name, "Summary") {
            TextRole::Summary
        } else if p.is_own(name, "LongDescription") {
            TextRole::LongDescription
        } else {
            return Ok(false);
        };

        let taken = match &p.model[id].kind {
            NodeKind::Documentation(data) => match role {
                TextRole::Summary => data.summary.is_some(),
                _ => data.long_description.is_some(),
            },
            _ => false,
        };
        if taken {
            p.too_many(id, role.as_str(), line_info);
        }

        let text = text_element(p, id, role, line_info)?;
        if let NodeKind::Documentation(data) = &mut p.model[id].kind {
            match role {
                TextRole::Summary => data.summary.get_or_insert(text),
                _ => data.long_description.get_or_insert(text),
            };
        }
        Ok(true)
    }
}

/// Text holders (`Summary`, `DefiningQuery`, `CommandText`, ...)
pub(crate) struct TextHandler;

impl ElementHandler for TextHandler {
    fn handle_text(&self, p: &mut Parser<'_>, id: NodeId, text: &str, _line_info: LineInfo) -> bool {
        match &mut p.model[id].kind {
            NodeKind::Text(data) => {
                data.text.push_str(text);
                true
            }
            _ => false,
        }
    }
}
