//! Validation pass
//!
//! Runs once every reference is resolved. Each node is checked by the rules of
//! its kind; checks that need another node validated first (the base of an
//! extended container) validate it eagerly, guarded by the node's
//! [`Progress`](super::model::Progress).
//!
//! The duplicate table check spans documents and runs after every document
//! has been validated.

mod containers;
mod relationships;
mod types;

use indexmap::IndexMap;

use crate::diagnostics::ErrorCode;

use super::context::Context;
use super::kinds::{ElementKind, NodeKind};
use super::model::NodeId;

pub(crate) use containers::check_duplicate_tables;

/// Validate every node of one document
pub(crate) fn validate_document(ctx: &mut Context<'_>, document: NodeId) {
    for id in ctx.model.descendants(document) {
        if ctx.is_halted() {
            return;
        }
        validate_node(ctx, id);
    }
}

pub(crate) fn validate_node(ctx: &mut Context<'_>, id: NodeId) {
    if ctx.model[id].progress.validated {
        return;
    }
    ctx.model[id].progress.validated = true;

    if ctx.model[id].kind.type_usage().is_some() {
        validate_facets(ctx, id);
    }
    match ctx.model[id].element_kind() {
        ElementKind::EntityType => {
            types::validate_key(ctx, id);
            types::validate_members(ctx, id);
        }
        ElementKind::ComplexType => {
            types::validate_members(ctx, id);
            types::validate_complex_containment(ctx, id);
        }
        ElementKind::Property => types::validate_property_type(ctx, id),
        ElementKind::EnumType => types::validate_enum(ctx, id),
        ElementKind::Association => relationships::validate_association(ctx, id),
        ElementKind::Function => containers::validate_function(ctx, id),
        ElementKind::EntityContainer => containers::merge_extended_container(ctx, id),
        ElementKind::FunctionImport => containers::validate_function_import(ctx, id),
        _ => {}
    }
}

// =============================================================================
// Facets
// =============================================================================

/// Check the facets written at a type use site against the resolved type
fn validate_facets(ctx: &mut Context<'_>, id: NodeId) {
    let Some(usage) = ctx.model[id].kind.type_usage() else {
        return;
    };
    let Some(resolved) = usage.resolved else {
        return;
    };

    let descriptions = match &ctx.model[resolved].kind {
        NodeKind::PrimitiveType(data) => data.facets.clone(),
        _ => {
            if usage.facets.has_type_facets() {
                let type_name = ctx.model.display_name(resolved);
                ctx.warning(
                    id,
                    ErrorCode::FacetsOnNonScalarType,
                    format!("Facets are ignored on the non-primitive type '{}'", type_name),
                );
            }
            return;
        }
    };

    let validation = usage.facets.validate(&descriptions);
    let type_name = ctx.model.display_name(resolved);
    for problem in &validation.problems {
        ctx.error_at(id, problem.line_info(), problem.code(), problem.message(&type_name));
    }
    if let Some(usage) = ctx.model[id].kind.type_usage_mut() {
        usage.resolved_facets = validation.facets;
    }
}

/// Key of the first entity type on the base chain that declares one
pub(crate) fn key_properties(ctx: &Context<'_>, entity: NodeId) -> Vec<NodeId> {
    let key = ctx
        .model
        .base_chain(entity)
        .find_map(|id| ctx.model[id].kind.structured().and_then(|d| d.key));
    let Some(key) = key else {
        return Vec::new();
    };
    match &ctx.model[key].kind {
        NodeKind::Key(data) => data
            .property_refs
            .iter()
            .filter_map(|r| match &ctx.model[*r].kind {
                NodeKind::PropertyRef(data) => data.property,
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Whether two property lists name the same properties, in any order
pub(crate) fn same_properties(left: &[NodeId], right: &[NodeId]) -> bool {
    let count = |ids: &[NodeId]| {
        let mut counts: IndexMap<NodeId, usize> = IndexMap::new();
        for id in ids {
            *counts.entry(*id).or_default() += 1;
        }
        counts
    };
    left.len() == right.len() && count(left) == count(right)
}
