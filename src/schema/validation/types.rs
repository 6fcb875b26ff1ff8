//! Entity, complex and enum type rules

use std::collections::HashSet;

use crate::diagnostics::ErrorCode;
use crate::namespaces::{Dialect, SchemaVersion};

use super::super::builtins::PrimitiveKind;
use super::super::context::Context;
use super::super::facets::FacetName;
use super::super::kinds::{ElementKind, NodeKind};
use super::super::model::NodeId;

fn version_of(ctx: &Context<'_>, id: NodeId) -> SchemaVersion {
    ctx.model
        .schema_of(id)
        .map_or(SchemaVersion::V1_0, |schema| schema.version)
}

fn dialect_of(ctx: &Context<'_>, id: NodeId) -> Dialect {
    ctx.model
        .schema_of(id)
        .map_or(Dialect::Conceptual, |schema| schema.dialect)
}

fn primitive_kind(ctx: &Context<'_>, id: NodeId) -> Option<PrimitiveKind> {
    match &ctx.model[id].kind {
        NodeKind::PrimitiveType(data) => data.kind,
        _ => None,
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Root entity types declare a key, derived ones inherit it
pub(super) fn validate_key(ctx: &mut Context<'_>, id: NodeId) {
    let Some(data) = ctx.model[id].kind.structured() else {
        return;
    };
    let has_base = data.base_type.is_some();
    let derived = data.resolved_base.is_some();
    let key = data.key;
    let name = ctx.model.display_name(id);

    match key {
        None if !has_base => {
            ctx.error(
                id,
                ErrorCode::KeyMissingOnEntityType,
                format!("Entity type '{}' has no key defined", name),
            );
        }
        Some(key) if derived => {
            ctx.error(
                key,
                ErrorCode::KeyOnDerivedEntityType,
                format!("Entity type '{}' derives from another type and cannot redefine the key", name),
            );
        }
        Some(key) => validate_key_properties(ctx, key),
        None => {}
    }
}

fn validate_key_properties(ctx: &mut Context<'_>, key: NodeId) {
    let refs = match &ctx.model[key].kind {
        NodeKind::Key(data) => data.property_refs.clone(),
        _ => return,
    };
    let version = version_of(ctx, key);

    for property_ref in refs {
        let property = match &ctx.model[property_ref].kind {
            NodeKind::PropertyRef(data) => data.property,
            _ => None,
        };
        let Some(property) = property else {
            continue;
        };
        let Some(usage) = ctx.model[property].kind.type_usage() else {
            continue;
        };
        let nullable = usage.facets.get_bool(FacetName::Nullable) != Some(false);
        let collection = usage.collection;
        let resolved = usage.resolved;
        let name = ctx.model[property].name_or_empty().to_string();

        if nullable {
            ctx.error(
                property_ref,
                ErrorCode::NullableKeyProperty,
                format!("Key property '{}' must be declared Nullable=\"false\"", name),
            );
        }

        let Some(resolved) = resolved else {
            continue;
        };
        let valid = !collection
            && match (&ctx.model[resolved].kind, primitive_kind(ctx, resolved)) {
                (NodeKind::PrimitiveType(_), Some(kind)) => {
                    !kind.is_spatial() && !(kind == PrimitiveKind::Binary && version < SchemaVersion::V2_0)
                }
                (NodeKind::EnumType(_), _) => version >= SchemaVersion::V3_0,
                _ => false,
            };
        if !valid {
            let type_name = ctx.model.display_name(resolved);
            ctx.error(
                property_ref,
                ErrorCode::InvalidKeyType,
                format!("Key property '{}' has type '{}', which cannot be part of a key", name, type_name),
            );
        }
    }
}

// =============================================================================
// Members and properties
// =============================================================================

/// Members may not redeclare a name found up the base chain
pub(super) fn validate_members(ctx: &mut Context<'_>, id: NodeId) {
    let Some(base) = ctx.model.base_of(id) else {
        return;
    };
    let members: Vec<(String, NodeId)> = match ctx.model[id].kind.member_table() {
        Some(table) => table.iter().map(|(name, member)| (name.to_string(), member)).collect(),
        None => return,
    };
    for (name, member) in members {
        if let Some(inherited) = ctx.model.find_member(base, &name) {
            let owner = ctx.model[inherited].parent.map(|p| ctx.model.display_name(p)).unwrap_or_default();
            ctx.error(
                member,
                ErrorCode::DuplicateMemberInHierarchy,
                format!("Member '{}' is already defined by base type '{}'", name, owner),
            );
        }
    }
}

/// Property types allowed by the declaring dialect
pub(super) fn validate_property_type(ctx: &mut Context<'_>, id: NodeId) {
    let Some(usage) = ctx.model[id].kind.type_usage() else {
        return;
    };
    let Some(resolved) = usage.resolved else {
        return;
    };
    let explicitly_non_nullable = usage.facets.get_bool(FacetName::Nullable) == Some(false);
    let target = ctx.model[resolved].element_kind();
    let dialect = dialect_of(ctx, id);
    let version = version_of(ctx, id);
    let name = ctx.model[id].name_or_empty().to_string();

    let allowed = match dialect {
        Dialect::Conceptual => matches!(
            target,
            ElementKind::PrimitiveType | ElementKind::ComplexType | ElementKind::EnumType
        ),
        _ => target == ElementKind::PrimitiveType,
    };
    if !allowed {
        let type_name = ctx.model.display_name(resolved);
        ctx.error(
            id,
            ErrorCode::InvalidPropertyType,
            format!("Property '{}' cannot have type '{}'", name, type_name),
        );
        return;
    }

    if target == ElementKind::ComplexType && version < SchemaVersion::V2_0 && !explicitly_non_nullable {
        ctx.error(
            id,
            ErrorCode::NullableComplexProperty,
            format!("Complex property '{}' must be declared Nullable=\"false\" before version 2.0", name),
        );
    }
}

fn complex_property_types(ctx: &Context<'_>, complex: NodeId) -> Vec<NodeId> {
    let Some(table) = ctx.model[complex].kind.member_table() else {
        return Vec::new();
    };
    table
        .ids()
        .filter_map(|member| {
            let usage = ctx.model[member].kind.type_usage()?;
            let resolved = usage.resolved?;
            let is_complex = ctx.model[resolved].element_kind() == ElementKind::ComplexType;
            (is_complex && !usage.collection).then_some(resolved)
        })
        .collect()
}

/// A complex type may not contain itself through non-collection properties
pub(super) fn validate_complex_containment(ctx: &mut Context<'_>, id: NodeId) {
    let mut seen = HashSet::new();
    let mut stack = complex_property_types(ctx, id);
    while let Some(current) = stack.pop() {
        if current == id {
            let name = ctx.model.display_name(id);
            ctx.error(
                id,
                ErrorCode::ComplexTypeCycle,
                format!("Complex type '{}' contains itself through its properties", name),
            );
            return;
        }
        if seen.insert(current) {
            stack.extend(complex_property_types(ctx, current));
        }
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Underlying type, member ranges and auto-increment
pub(super) fn validate_enum(ctx: &mut Context<'_>, id: NodeId) {
    let (underlying, members) = match &ctx.model[id].kind {
        NodeKind::EnumType(data) => (data.resolved_underlying, data.members.ids().collect::<Vec<_>>()),
        _ => return,
    };
    let name = ctx.model.display_name(id);

    let range = match underlying {
        Some(underlying) => {
            let range = primitive_kind(ctx, underlying).and_then(|kind| kind.integral_range());
            if range.is_none() {
                let type_name = ctx.model.display_name(underlying);
                ctx.error(
                    id,
                    ErrorCode::InvalidEnumUnderlyingType,
                    format!(
                        "The underlying type '{}' of enum '{}' must be Byte, SByte, Int16, Int32 or Int64",
                        type_name, name
                    ),
                );
            }
            range
        }
        None => None,
    };

    let mut next = Some(0i64);
    for member in members {
        let declared = match &ctx.model[member].kind {
            NodeKind::EnumMember(data) => data.value,
            _ => continue,
        };
        let value = declared.or(next);
        let in_range = match (value, range) {
            (Some(value), Some((min, max))) => value >= min && value <= max,
            (None, Some(_)) => false,
            (_, None) => true,
        };
        if !in_range {
            let member_name = ctx.model[member].name_or_empty().to_string();
            ctx.error(
                member,
                ErrorCode::EnumMemberValueOutOfRange,
                format!("The value of member '{}' is outside the range of the underlying type of '{}'", member_name, name),
            );
        }
        if let NodeKind::EnumMember(data) = &mut ctx.model[member].kind {
            data.resolved_value = value.filter(|_| in_range);
        }
        next = value.and_then(|v| v.checked_add(1));
    }
}
