//! Association ends and referential constraints
//!
//! Multiplicities omitted on an end are inferred from the association's
//! referential constraint. Declared multiplicities are checked against the
//! same inference:
//!
//! | side      | condition                                  | inferred |
//! |-----------|--------------------------------------------|----------|
//! | principal | dependent properties nullable (see below)  | `0..1`   |
//! | principal | otherwise                                  | `1`      |
//! | dependent | dependent properties are the dependent key | `0..1`   |
//! | dependent | otherwise                                  | `*`      |
//!
//! Up to version 1.1 the principal counts as nullable only when *all*
//! dependent properties are nullable; from 2.0 on *any* nullable dependent
//! property is enough.

use crate::diagnostics::ErrorCode;
use crate::namespaces::SchemaVersion;

use super::super::context::{end_type, Context};
use super::super::kinds::{Multiplicity, NodeKind};
use super::super::model::NodeId;
use super::{key_properties, same_properties};

/// Resolved side of a referential constraint
struct ConstraintSide {
    node: NodeId,
    end: NodeId,
    entity: NodeId,
    properties: Vec<NodeId>,
}

fn constraint_side(ctx: &Context<'_>, role: Option<NodeId>) -> Option<ConstraintSide> {
    let node = role?;
    let NodeKind::ConstraintRole(data) = &ctx.model[node].kind else {
        return None;
    };
    let end = data.end?;
    let entity = end_type(ctx.model, end)?;
    let properties = data
        .property_refs
        .iter()
        .map(|r| match &ctx.model[*r].kind {
            NodeKind::PropertyRef(data) => data.property,
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(ConstraintSide {
        node,
        end,
        entity,
        properties,
    })
}

fn declared_multiplicity(ctx: &Context<'_>, end: NodeId) -> Option<Multiplicity> {
    match &ctx.model[end].kind {
        NodeKind::AssociationEnd(data) => data.multiplicity,
        _ => None,
    }
}

fn set_inferred(ctx: &mut Context<'_>, end: NodeId, multiplicity: Multiplicity) {
    if let NodeKind::AssociationEnd(data) = &mut ctx.model[end].kind {
        if data.multiplicity.is_none() {
            data.inferred_multiplicity = Some(multiplicity);
        }
    }
}

fn is_nullable(ctx: &Context<'_>, property: NodeId) -> bool {
    ctx.model[property]
        .kind
        .type_usage()
        .map_or(true, |usage| usage.is_nullable())
}

fn property_type(ctx: &Context<'_>, property: NodeId) -> Option<NodeId> {
    ctx.model[property].kind.type_usage().and_then(|usage| usage.resolved)
}

// =============================================================================
// Associations
// =============================================================================

/// Constraints first, then end multiplicities and operations
pub(super) fn validate_association(ctx: &mut Context<'_>, id: NodeId) {
    let (constraints, ends) = match &ctx.model[id].kind {
        NodeKind::Association(data) => (data.constraints.clone(), data.ends.ids().collect::<Vec<_>>()),
        _ => return,
    };
    for constraint in constraints {
        validate_constraint(ctx, constraint);
    }

    for end in ends {
        let (multiplicity, on_delete) = match &ctx.model[end].kind {
            NodeKind::AssociationEnd(data) => (data.effective_multiplicity(), data.on_delete),
            _ => continue,
        };
        let role = ctx.model[end].name_or_empty().to_string();
        match multiplicity {
            None => ctx.error(
                end,
                ErrorCode::RequiredAttributeMissing,
                format!("End '{}' requires a Multiplicity unless a referential constraint implies it", role),
            ),
            Some(Multiplicity::Many) if on_delete.is_some() => ctx.error(
                end,
                ErrorCode::OperationOnManyEnd,
                format!("End '{}' has multiplicity '*' and cannot specify an OnDelete operation", role),
            ),
            Some(_) => {}
        }
    }
}

fn validate_constraint(ctx: &mut Context<'_>, id: NodeId) {
    let (principal, dependent) = match &ctx.model[id].kind {
        NodeKind::ReferentialConstraint(data) => (data.principal, data.dependent),
        _ => return,
    };
    let (Some(principal), Some(dependent)) = (constraint_side(ctx, principal), constraint_side(ctx, dependent))
    else {
        return;
    };
    if principal.end == dependent.end {
        return;
    }

    let principal_key = key_properties(ctx, principal.entity);
    if !same_properties(&principal.properties, &principal_key) {
        let role = ctx.model[principal.end].name_or_empty().to_string();
        ctx.error(
            principal.node,
            ErrorCode::InvalidPrincipalProperties,
            format!("The properties of principal role '{}' must be exactly the key of its entity type", role),
        );
    }

    if principal.properties.len() != dependent.properties.len() {
        ctx.error(
            id,
            ErrorCode::MismatchedConstraintPropertyCount,
            format!(
                "The principal role names {} properties and the dependent role names {}",
                principal.properties.len(),
                dependent.properties.len()
            ),
        );
        return;
    }

    for (p, d) in principal.properties.iter().zip(&dependent.properties) {
        let (pt, dt) = (property_type(ctx, *p), property_type(ctx, *d));
        if pt != dt {
            let message = format!(
                "Dependent property '{}' does not have the same type as principal property '{}'",
                ctx.model[*d].name_or_empty(),
                ctx.model[*p].name_or_empty()
            );
            ctx.error(dependent.node, ErrorCode::ConstraintPropertyTypeMismatch, message);
        }
    }

    check_principal_multiplicity(ctx, id, &principal, &dependent);
    check_dependent_multiplicity(ctx, &dependent);
}

fn check_principal_multiplicity(
    ctx: &mut Context<'_>,
    constraint: NodeId,
    principal: &ConstraintSide,
    dependent: &ConstraintSide,
) {
    let version = ctx
        .model
        .schema_of(constraint)
        .map_or(SchemaVersion::V1_0, |schema| schema.version);
    let nullable: Vec<bool> = dependent.properties.iter().map(|p| is_nullable(ctx, *p)).collect();
    let all_nullable = !nullable.is_empty() && nullable.iter().all(|n| *n);
    let any_nullable = nullable.iter().any(|n| *n);
    let nullable_principal = if version.uses_v1_constraint_rules() {
        all_nullable
    } else {
        any_nullable
    };

    let role = ctx.model[principal.end].name_or_empty().to_string();
    let Some(declared) = declared_multiplicity(ctx, principal.end) else {
        let inferred = if nullable_principal {
            Multiplicity::ZeroOrOne
        } else {
            Multiplicity::One
        };
        set_inferred(ctx, principal.end, inferred);
        return;
    };

    let problem = if declared == Multiplicity::Many {
        Some(format!(
            "Principal role '{}' of a referential constraint cannot have multiplicity '*'",
            role
        ))
    } else if all_nullable && declared == Multiplicity::One {
        Some(format!(
            "All dependent properties are nullable, so principal role '{}' must have multiplicity '0..1'",
            role
        ))
    } else if !nullable_principal && declared != Multiplicity::One {
        Some(format!(
            "The dependent properties are not nullable, so principal role '{}' must have multiplicity '1'",
            role
        ))
    } else {
        None
    };
    if let Some(message) = problem {
        ctx.error(principal.node, ErrorCode::InvalidMultiplicityInConstraint, message);
    }
}

fn check_dependent_multiplicity(ctx: &mut Context<'_>, dependent: &ConstraintSide) {
    let dependent_key = key_properties(ctx, dependent.entity);
    let is_key = same_properties(&dependent.properties, &dependent_key);
    let inferred = if is_key {
        Multiplicity::ZeroOrOne
    } else {
        Multiplicity::Many
    };

    let role = ctx.model[dependent.end].name_or_empty().to_string();
    match declared_multiplicity(ctx, dependent.end) {
        None => set_inferred(ctx, dependent.end, inferred),
        Some(Multiplicity::Many) if is_key => ctx.error(
            dependent.node,
            ErrorCode::InvalidMultiplicityInConstraint,
            format!(
                "The dependent properties are the key of role '{}', so its multiplicity must be '1' or '0..1'",
                role
            ),
        ),
        Some(declared) if !is_key && declared != Multiplicity::Many => ctx.error(
            dependent.node,
            ErrorCode::InvalidMultiplicityInConstraint,
            format!(
                "The dependent properties are not the key of role '{}', so its multiplicity must be '*'",
                role
            ),
        ),
        Some(_) => {}
    }
}
