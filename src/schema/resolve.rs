//! Deferred name resolution
//!
//! Parsing records every reference as written. Two passes then turn names into
//! node ids:
//!
//! * the **top-level** pass resolves references to types, relationships and
//!   containers, which are registered globally before it starts, and registers
//!   functions once their parameter types are known;
//! * the **second-level** pass resolves names that live inside resolved
//!   targets: relationship roles, key and constraint properties, and the entity
//!   sets of relationship sets and function imports.
//!
//! A node's [`Progress`](super::model::Progress) flag is set on entry, so a
//! pass may resolve a node eagerly out of document order (a base type before
//! its derived type) without running twice.

use crate::diagnostics::ErrorCode;
use crate::names::{qualify, split_qualified};
use crate::namespaces::{Dialect, EDM_NAMESPACE};

use super::builtins::PrimitiveKind;
use super::context::{
    end_type, enclosing_container, entity_set_type, entity_sets_in_scope, extends_of, find_entity_set, Context,
};
use super::kinds::{ElementKind, EndBinding, NodeKind, ParameterMode, TypeUsage};
use super::model::{Model, NodeId};
use super::table::AddOutcome;

// =============================================================================
// Type names
// =============================================================================

/// Resolve a type name written in the document of `referrer`
///
/// Unqualified names only match primitive types of the document's primitive
/// namespace. Qualified names try the qualifier as an alias first, then as a
/// namespace. Problems are reported at `referrer`.
pub(crate) fn resolve_type_name(ctx: &mut Context<'_>, referrer: NodeId, name: &str) -> Option<NodeId> {
    let document = ctx.model[referrer].document;
    let schema = ctx.model.schema(document)?;
    let dialect = schema.dialect;
    let primitive_namespace = schema.primitive_namespace.clone();

    let (qualifier, simple) = split_qualified(name);
    let Some(qualifier) = qualifier else {
        let found = ctx
            .types
            .get(&qualify(&primitive_namespace, simple))
            .filter(|id| ctx.model[*id].kind.is_primitive());
        if found.is_none() {
            ctx.error(
                referrer,
                ErrorCode::NotNamespaceQualified,
                format!("Type '{}' is not qualified with a namespace or alias", name),
            );
        }
        return found;
    };

    let alias_target = schema.aliases.resolve(qualifier).map(str::to_string);
    let via_alias = alias_target.is_some();
    let namespace = alias_target.unwrap_or_else(|| qualifier.to_string());
    let full_name = qualify(&namespace, simple);

    let Some(found) = ctx.types.get(&full_name) else {
        if !ctx.namespaces.contains(namespace.as_str()) {
            ctx.error(
                referrer,
                ErrorCode::BadNamespace,
                format!(
                    "'{}' in type name '{}' is neither a declared alias nor a known namespace",
                    qualifier, name
                ),
            );
        } else {
            let hint = match ctx.types.get_equivalent(&full_name) {
                Some((key, _)) => format!(" Did you mean '{}'?", key),
                None => String::new(),
            };
            let message = if via_alias {
                format!(
                    "Type '{}' is not defined in namespace '{}' (alias '{}').{}",
                    simple, namespace, qualifier, hint
                )
            } else {
                format!("Type '{}' is not defined in namespace '{}'.{}", simple, namespace, hint)
            };
            ctx.error(referrer, ErrorCode::NotInNamespace, message);
        }
        return None;
    };

    if dialect != Dialect::Conceptual {
        let target = ctx.model[found].document;
        let primitive = ctx.primitive_documents.get(&primitive_namespace).copied();
        if target != document && Some(target) != primitive {
            ctx.error(
                referrer,
                ErrorCode::InvalidTypeReferenceAcrossDocuments,
                format!(
                    "Type '{}' is defined in another document; {} documents may only reference their own and their primitive types",
                    name, dialect
                ),
            );
            return None;
        }
    }
    Some(found)
}

/// Whether following `next` from `start` revisits a node
///
/// Floyd's tortoise and hare over a chain of single links.
pub(crate) fn has_cycle(model: &Model, start: NodeId, next: fn(&Model, NodeId) -> Option<NodeId>) -> bool {
    let mut slow = start;
    let mut fast = start;
    loop {
        let Some(step) = next(model, fast).and_then(|f| next(model, f)) else {
            return false;
        };
        fast = step;
        slow = match next(model, slow) {
            Some(s) => s,
            None => return false,
        };
        if slow == fast {
            return true;
        }
    }
}

// =============================================================================
// Top level
// =============================================================================

/// Run the top-level pass over one document
pub(crate) fn resolve_top_level(ctx: &mut Context<'_>, document: NodeId) {
    for id in ctx.model.descendants(document) {
        if ctx.is_halted() {
            return;
        }
        top_level(ctx, id);
    }
}

fn top_level(ctx: &mut Context<'_>, id: NodeId) {
    if ctx.model[id].progress.top_level {
        return;
    }
    ctx.model[id].progress.top_level = true;
    log::trace!("top-level resolution of {} {}", ctx.model[id].element_kind(), ctx.model.display_name(id));

    match ctx.model[id].element_kind() {
        ElementKind::Schema => check_usings(ctx, id),
        ElementKind::EntityType | ElementKind::ComplexType => resolve_base_type(ctx, id),
        ElementKind::Property
        | ElementKind::Parameter
        | ElementKind::ReturnType
        | ElementKind::CollectionType
        | ElementKind::RowProperty
        | ElementKind::ReferenceType
        | ElementKind::TypeRef
        | ElementKind::FunctionImport => resolve_usage(ctx, id),
        ElementKind::Function => resolve_function(ctx, id),
        ElementKind::AssociationEnd => resolve_end_type(ctx, id),
        ElementKind::EnumType => resolve_underlying_type(ctx, id),
        ElementKind::NavigationProperty => resolve_relationship(ctx, id),
        ElementKind::EntitySet => resolve_entity_set_type(ctx, id),
        ElementKind::AssociationSet => resolve_association(ctx, id),
        ElementKind::EntityContainer => resolve_extends(ctx, id),
        _ => {}
    }
}

fn check_usings(ctx: &mut Context<'_>, document: NodeId) {
    let usings = match ctx.model.schema(document) {
        Some(schema) => schema.usings.clone(),
        None => return,
    };
    for using in usings {
        let namespace = match &ctx.model[using].kind {
            NodeKind::Using(data) => data.namespace.clone(),
            _ => None,
        };
        if let Some(namespace) = namespace {
            if !ctx.namespaces.contains(namespace.as_str()) {
                ctx.error(
                    using,
                    ErrorCode::UnknownUsingNamespace,
                    format!("The namespace '{}' named by Using is not part of the compilation", namespace),
                );
            }
        }
    }
}

fn resolve_base_type(ctx: &mut Context<'_>, id: NodeId) {
    let Some(base_name) = ctx.model[id].kind.structured().and_then(|d| d.base_type.clone()) else {
        return;
    };
    let Some(candidate) = resolve_type_name(ctx, id, &base_name) else {
        return;
    };

    let family = ctx.model[id].element_kind();
    if ctx.model[candidate].element_kind() != family {
        let name = ctx.model.display_name(id);
        ctx.error(
            id,
            ErrorCode::BadType,
            format!("The base type '{}' of '{}' is not a {}", base_name, name, family),
        );
        return;
    }

    if let Some(data) = ctx.model[id].kind.structured_mut() {
        data.resolved_base = Some(candidate);
    }
    // Commit the candidate's own chain first so the check below sees it.
    top_level(ctx, candidate);

    if has_cycle(ctx.model, id, Model::base_of) {
        if let Some(data) = ctx.model[id].kind.structured_mut() {
            data.resolved_base = None;
        }
        let name = ctx.model.display_name(id);
        ctx.error(
            id,
            ErrorCode::CycleInTypeHierarchy,
            format!("Base type '{}' of '{}' creates a cycle in the type hierarchy", base_name, name),
        );
    }
}

fn resolve_usage(ctx: &mut Context<'_>, id: NodeId) {
    let Some(usage) = ctx.model[id].kind.type_usage() else {
        return;
    };
    let Some(name) = usage.type_name.clone() else {
        return;
    };
    let reference = usage.reference;
    let Some(resolved) = resolve_type_name(ctx, id, &name) else {
        return;
    };

    let target = ctx.model[resolved].element_kind();
    if target == ElementKind::Association || (reference && target != ElementKind::EntityType) {
        let expected = if reference { "an entity type" } else { "a type usable here" };
        ctx.error(id, ErrorCode::BadType, format!("'{}' is not {}", name, expected));
        return;
    }
    if let Some(usage) = ctx.model[id].kind.type_usage_mut() {
        usage.resolved = Some(resolved);
    }
}

/// Text of a type usage for signatures, e.g. `Collection(Edm.Int32)`
pub(crate) fn describe_usage(model: &Model, usage: &TypeUsage) -> String {
    let name = match (usage.resolved, &usage.type_name, usage.inline) {
        (Some(resolved), _, _) => model.display_name(resolved),
        (None, Some(written), _) => written.clone(),
        (None, None, Some(inline)) => return describe_inline(model, inline),
        (None, None, None) => return String::new(),
    };
    if usage.collection {
        format!("Collection({})", name)
    } else if usage.reference {
        format!("Ref({})", name)
    } else {
        name
    }
}

fn describe_inline(model: &Model, inline: NodeId) -> String {
    match &model[inline].kind {
        NodeKind::CollectionType(usage) => format!("Collection({})", describe_usage(model, usage)),
        NodeKind::ReferenceType(usage) => format!("Ref({})", describe_usage(model, usage)),
        NodeKind::TypeRef(usage) => describe_usage(model, usage),
        NodeKind::RowType(data) => {
            let columns: Vec<String> = data
                .properties
                .iter()
                .map(|(name, id)| {
                    let column = model[id].kind.type_usage().map(|u| describe_usage(model, u));
                    format!("{} {}", name, column.unwrap_or_default())
                })
                .collect();
            format!("Row({})", columns.join(", "))
        }
        _ => String::new(),
    }
}

fn resolve_function(ctx: &mut Context<'_>, id: NodeId) {
    resolve_usage(ctx, id);
    for child in ctx.model.descendants(id).into_iter().skip(1) {
        top_level(ctx, child);
    }

    let Some(name) = ctx.model[id].name.clone() else {
        return;
    };
    let namespace = ctx.model.namespace_of(id).unwrap_or_default().to_string();
    let parameters: Vec<String> = match &ctx.model[id].kind {
        NodeKind::Function(data) => data
            .parameters
            .ids()
            .filter_map(|param| match &ctx.model[param].kind {
                NodeKind::Parameter(p) => {
                    let mode = p.mode.unwrap_or(ParameterMode::In);
                    Some(format!("{} {}", mode.as_str(), describe_usage(ctx.model, &p.usage)))
                }
                _ => None,
            })
            .collect(),
        _ => return,
    };
    let signature = format!("{}({})", qualify(&namespace, &name), parameters.join(", "));
    log::trace!("registering function {}", signature);

    if let NodeKind::Function(data) = &mut ctx.model[id].kind {
        data.signature = Some(signature.clone());
    }
    if let AddOutcome::Duplicate(_) = ctx.functions.add(Some(&signature), id) {
        ctx.error(
            id,
            ErrorCode::AmbiguousFunctionOverload,
            format!("A function with signature '{}' is already defined", signature),
        );
    }
}

fn resolve_end_type(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::AssociationEnd(data) => data.type_name.clone(),
        _ => None,
    }) else {
        return;
    };
    let Some(resolved) = resolve_type_name(ctx, id, &name) else {
        return;
    };
    if ctx.model[resolved].element_kind() != ElementKind::EntityType {
        let role = ctx.model[id].name_or_empty().to_string();
        ctx.error(
            id,
            ErrorCode::EndTypeNotEntityType,
            format!("The type '{}' of end '{}' is not an entity type", name, role),
        );
        return;
    }
    if let NodeKind::AssociationEnd(data) = &mut ctx.model[id].kind {
        data.resolved_type = Some(resolved);
    }
}

fn resolve_underlying_type(ctx: &mut Context<'_>, id: NodeId) {
    let written = match &ctx.model[id].kind {
        NodeKind::EnumType(data) => data.underlying_type.clone(),
        _ => return,
    };
    let resolved = match written {
        Some(name) => resolve_type_name(ctx, id, &name),
        None => ctx.types.get(&qualify(EDM_NAMESPACE, PrimitiveKind::Int32.as_str())),
    };
    if let NodeKind::EnumType(data) = &mut ctx.model[id].kind {
        data.resolved_underlying = resolved;
    }
}

fn resolve_relationship(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::NavigationProperty(data) => data.relationship.clone(),
        _ => None,
    }) else {
        return;
    };
    let Some(resolved) = resolve_type_name(ctx, id, &name) else {
        return;
    };
    if ctx.model[resolved].element_kind() != ElementKind::Association {
        ctx.error(
            id,
            ErrorCode::BadNavigationProperty,
            format!("The relationship '{}' is not an association", name),
        );
        return;
    }
    if let NodeKind::NavigationProperty(data) = &mut ctx.model[id].kind {
        data.resolved_relationship = Some(resolved);
    }
}

fn resolve_entity_set_type(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::EntitySet(data) => data.entity_type.clone(),
        _ => None,
    }) else {
        return;
    };
    let Some(resolved) = resolve_type_name(ctx, id, &name) else {
        return;
    };
    if ctx.model[resolved].element_kind() != ElementKind::EntityType {
        let set = ctx.model[id].name_or_empty().to_string();
        ctx.error(
            id,
            ErrorCode::InvalidEntitySetType,
            format!("The type '{}' of entity set '{}' is not an entity type", name, set),
        );
        return;
    }
    if let NodeKind::EntitySet(data) = &mut ctx.model[id].kind {
        data.resolved_type = Some(resolved);
    }
}

fn resolve_association(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::AssociationSet(data) => data.association.clone(),
        _ => None,
    }) else {
        return;
    };
    let Some(resolved) = resolve_type_name(ctx, id, &name) else {
        return;
    };
    if ctx.model[resolved].element_kind() != ElementKind::Association {
        ctx.error(id, ErrorCode::BadType, format!("'{}' is not an association", name));
        return;
    }
    if let NodeKind::AssociationSet(data) = &mut ctx.model[id].kind {
        data.resolved_association = Some(resolved);
    }
}

fn resolve_extends(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::EntityContainer(data) => data.extends.clone(),
        _ => None,
    }) else {
        return;
    };
    let own = ctx.model[id].name_or_empty().to_string();
    if own == name {
        ctx.error(
            id,
            ErrorCode::ContainerExtendsItself,
            format!("Entity container '{}' extends itself", own),
        );
        return;
    }
    let Some(base) = ctx.containers.get(&name) else {
        ctx.error(
            id,
            ErrorCode::BadContainer,
            format!("The entity container '{}' extended by '{}' is not defined", name, own),
        );
        return;
    };

    if let NodeKind::EntityContainer(data) = &mut ctx.model[id].kind {
        data.resolved_extends = Some(base);
    }
    top_level(ctx, base);

    if has_cycle(ctx.model, id, extends_of) {
        if let NodeKind::EntityContainer(data) = &mut ctx.model[id].kind {
            data.resolved_extends = None;
        }
        ctx.error(
            id,
            ErrorCode::CyclicContainerExtension,
            format!("Extending '{}' from '{}' creates a cycle of container extensions", own, name),
        );
    }
}

// =============================================================================
// Second level
// =============================================================================

/// Run the second-level pass over one document
pub(crate) fn resolve_second_level(ctx: &mut Context<'_>, document: NodeId) {
    for id in ctx.model.descendants(document) {
        if ctx.is_halted() {
            return;
        }
        if ctx.model[id].progress.second_level {
            continue;
        }
        ctx.model[id].progress.second_level = true;

        match ctx.model[id].element_kind() {
            ElementKind::NavigationProperty => resolve_navigation_roles(ctx, id),
            ElementKind::AssociationSet => bind_association_set_ends(ctx, id),
            ElementKind::ReferentialConstraint => resolve_constraint_roles(ctx, id),
            ElementKind::Key => resolve_key(ctx, id),
            ElementKind::FunctionImport => resolve_import_entity_set(ctx, id),
            _ => {}
        }
    }
}

fn association_end(model: &Model, association: NodeId, role: &str) -> Option<NodeId> {
    model[association].kind.member_table().and_then(|ends| ends.get(role))
}

fn navigation_end(ctx: &mut Context<'_>, id: NodeId, association: NodeId, role: Option<&str>) -> Option<NodeId> {
    let role = role?;
    let end = association_end(ctx.model, association, role);
    if end.is_none() {
        let association_name = ctx.model.display_name(association);
        ctx.error(
            id,
            ErrorCode::InvalidRoleName,
            format!("Role '{}' is not defined in association '{}'", role, association_name),
        );
    }
    end
}

fn resolve_navigation_roles(ctx: &mut Context<'_>, id: NodeId) {
    let (association, from_role, to_role) = match &ctx.model[id].kind {
        NodeKind::NavigationProperty(data) => (data.resolved_relationship, data.from_role.clone(), data.to_role.clone()),
        _ => return,
    };
    let Some(association) = association else {
        return;
    };
    let from_end = navigation_end(ctx, id, association, from_role.as_deref());
    let to_end = navigation_end(ctx, id, association, to_role.as_deref());

    if from_role.is_some() && from_role == to_role {
        let name = ctx.model[id].name_or_empty().to_string();
        ctx.error(
            id,
            ErrorCode::BadNavigationProperty,
            format!("FromRole and ToRole of navigation property '{}' must differ", name),
        );
    }
    if let NodeKind::NavigationProperty(data) = &mut ctx.model[id].kind {
        data.from_end = from_end;
        data.to_end = to_end;
    }

    let declaring = ctx.model[id].parent;
    let from_type = from_end.and_then(|end| end_type(ctx.model, end));
    if let (Some(declaring), Some(from_type)) = (declaring, from_type) {
        if !ctx.model.derives_from(declaring, from_type) {
            let message = format!(
                "The type '{}' of role '{}' is not compatible with the declaring type '{}'",
                ctx.model.display_name(from_type),
                from_role.unwrap_or_default(),
                ctx.model.display_name(declaring)
            );
            ctx.error(id, ErrorCode::BadNavigationProperty, message);
        }
    }
}

fn bind_association_set_ends(ctx: &mut Context<'_>, id: NodeId) {
    let (association, declared) = match &ctx.model[id].kind {
        NodeKind::AssociationSet(data) => (data.resolved_association, data.ends.clone()),
        _ => return,
    };
    let (Some(association), Some(container)) = (association, enclosing_container(ctx.model, id)) else {
        return;
    };
    let ends: Vec<(String, NodeId)> = match ctx.model[association].kind.member_table() {
        Some(table) => table.iter().map(|(role, end)| (role.to_string(), end)).collect(),
        None => return,
    };
    let set_name = ctx.model[id].name_or_empty().to_string();
    let mut bindings: Vec<EndBinding> = Vec::new();

    for declared_end in declared {
        let (role, entity_set_name) = match &ctx.model[declared_end].kind {
            NodeKind::AssociationSetEnd(data) => (data.role.clone(), data.entity_set.clone()),
            _ => continue,
        };
        let Some(entity_set_name) = entity_set_name else {
            continue;
        };
        let Some(entity_set) = find_entity_set(ctx.model, container, &entity_set_name) else {
            ctx.error(
                declared_end,
                ErrorCode::BadEntitySet,
                format!(
                    "The entity set '{}' is not defined in container '{}'",
                    entity_set_name,
                    ctx.model[container].name_or_empty()
                ),
            );
            continue;
        };
        let set_type = entity_set_type(ctx.model, entity_set);

        let end = match &role {
            Some(role) => {
                let end = ends.iter().find(|(r, _)| r == role).map(|(_, e)| *e);
                if end.is_none() {
                    ctx.error(
                        declared_end,
                        ErrorCode::InvalidRoleName,
                        format!("Role '{}' is not defined in association '{}'", role, ctx.model.display_name(association)),
                    );
                }
                end
            }
            None => {
                let candidates: Vec<NodeId> = ends
                    .iter()
                    .map(|(_, e)| *e)
                    .filter(|e| !bindings.iter().any(|b| b.end == *e))
                    .filter(|e| match (end_type(ctx.model, *e), set_type) {
                        (Some(et), Some(st)) => ctx.model.derives_from(et, st),
                        _ => false,
                    })
                    .collect();
                if candidates.len() != 1 {
                    ctx.error(
                        declared_end,
                        ErrorCode::InvalidRoleName,
                        format!(
                            "Cannot determine the role of entity set '{}' in association set '{}'",
                            entity_set_name, set_name
                        ),
                    );
                }
                candidates.first().copied().filter(|_| candidates.len() == 1)
            }
        };
        let Some(end) = end else {
            continue;
        };
        if bindings.iter().any(|b| b.end == end) {
            ctx.error(
                declared_end,
                ErrorCode::InvalidRoleName,
                format!("Role '{}' is bound twice in association set '{}'", ctx.model[end].name_or_empty(), set_name),
            );
            continue;
        }

        if let (Some(et), Some(st)) = (end_type(ctx.model, end), set_type) {
            if !ctx.model.derives_from(et, st) {
                let message = format!(
                    "Entity set '{}' of type '{}' cannot hold role '{}' of type '{}'",
                    entity_set_name,
                    ctx.model.display_name(st),
                    ctx.model[end].name_or_empty(),
                    ctx.model.display_name(et)
                );
                ctx.error(declared_end, ErrorCode::IncompatibleEntitySet, message);
            }
        }
        if let NodeKind::AssociationSetEnd(data) = &mut ctx.model[declared_end].kind {
            data.resolved_end = Some(end);
            data.resolved_entity_set = Some(entity_set);
        }
        bindings.push(EndBinding {
            role: ctx.model[end].name_or_empty().to_string(),
            end,
            entity_set: Some(entity_set),
            declared: Some(declared_end),
        });
    }

    // Ends without a declaration bind to the single compatible entity set.
    let in_scope = entity_sets_in_scope(ctx.model, container);
    for (role, end) in &ends {
        if bindings.iter().any(|b| b.end == *end) {
            continue;
        }
        let entity_set = match end_type(ctx.model, *end) {
            Some(et) => {
                let candidates: Vec<NodeId> = in_scope
                    .iter()
                    .copied()
                    .filter(|set| entity_set_type(ctx.model, *set).map_or(false, |st| ctx.model.derives_from(et, st)))
                    .collect();
                match candidates.as_slice() {
                    [single] => Some(*single),
                    [] => {
                        ctx.error(
                            id,
                            ErrorCode::MissingExtent,
                            format!(
                                "No entity set can hold role '{}' of association set '{}'",
                                role, set_name
                            ),
                        );
                        None
                    }
                    many => {
                        let names: Vec<String> = many
                            .iter()
                            .map(|s| format!("'{}'", ctx.model[*s].name_or_empty()))
                            .collect();
                        ctx.error(
                            id,
                            ErrorCode::AmbiguousExtent,
                            format!(
                                "Role '{}' of association set '{}' could be held by entity sets {}",
                                role,
                                set_name,
                                names.join(", ")
                            ),
                        );
                        None
                    }
                }
            }
            None => None,
        };
        bindings.push(EndBinding {
            role: role.clone(),
            end: *end,
            entity_set,
            declared: None,
        });
    }

    bindings.sort_by_key(|b| ends.iter().position(|(_, e)| *e == b.end));
    if let NodeKind::AssociationSet(data) = &mut ctx.model[id].kind {
        data.bindings = bindings;
    }
}

fn resolve_constraint_roles(ctx: &mut Context<'_>, id: NodeId) {
    let Some(association) = ctx.model[id].parent else {
        return;
    };
    let roles: Vec<NodeId> = match &ctx.model[id].kind {
        NodeKind::ReferentialConstraint(data) => data.principal.into_iter().chain(data.dependent).collect(),
        _ => return,
    };

    let mut ends = Vec::new();
    for role_node in roles {
        let (role, refs) = match &ctx.model[role_node].kind {
            NodeKind::ConstraintRole(data) => (data.role.clone(), data.property_refs.clone()),
            _ => continue,
        };
        let Some(role) = role else {
            continue;
        };
        let Some(end) = association_end(ctx.model, association, &role) else {
            ctx.error(
                role_node,
                ErrorCode::InvalidRoleName,
                format!("Role '{}' is not defined in association '{}'", role, ctx.model.display_name(association)),
            );
            continue;
        };
        if let NodeKind::ConstraintRole(data) = &mut ctx.model[role_node].kind {
            data.end = Some(end);
        }
        ends.push(end);

        let Some(entity) = end_type(ctx.model, end) else {
            continue;
        };
        for property_ref in refs {
            resolve_property_ref(ctx, property_ref, entity, true);
        }
    }

    if let [principal, dependent] = ends.as_slice() {
        if principal == dependent {
            let role = ctx.model[*principal].name_or_empty().to_string();
            ctx.error(
                id,
                ErrorCode::SameRoleReferred,
                format!("Principal and Dependent both refer to role '{}'", role),
            );
        }
    }
}

/// Resolve a `PropertyRef` against a structured type
fn resolve_property_ref(ctx: &mut Context<'_>, property_ref: NodeId, owner: NodeId, inherited: bool) -> Option<NodeId> {
    let name = ctx.model[property_ref].name.clone()?;
    let found = if inherited {
        ctx.model.find_member(owner, &name)
    } else {
        ctx.model[owner].kind.member_table().and_then(|members| members.get(&name))
    }
    .filter(|member| ctx.model[*member].element_kind() == ElementKind::Property);

    match found {
        Some(property) => {
            if let NodeKind::PropertyRef(data) = &mut ctx.model[property_ref].kind {
                data.property = Some(property);
            }
        }
        None => {
            let owner_name = ctx.model.display_name(owner);
            ctx.error(
                property_ref,
                ErrorCode::InvalidPropertyReference,
                format!("'{}' is not a property of type '{}'", name, owner_name),
            );
        }
    }
    found
}

fn resolve_key(ctx: &mut Context<'_>, id: NodeId) {
    let Some(entity) = ctx.model[id].parent else {
        return;
    };
    let refs = match &ctx.model[id].kind {
        NodeKind::Key(data) => data.property_refs.clone(),
        _ => return,
    };
    let mut seen: Vec<NodeId> = Vec::new();
    for property_ref in refs {
        let Some(property) = resolve_property_ref(ctx, property_ref, entity, false) else {
            continue;
        };
        if seen.contains(&property) {
            let name = ctx.model[property].name_or_empty().to_string();
            ctx.error(
                property_ref,
                ErrorCode::DuplicateKeyProperty,
                format!("Property '{}' appears more than once in the key", name),
            );
        } else {
            seen.push(property);
        }
    }
}

fn resolve_import_entity_set(ctx: &mut Context<'_>, id: NodeId) {
    let Some(name) = (match &ctx.model[id].kind {
        NodeKind::FunctionImport(data) => data.entity_set.clone(),
        _ => None,
    }) else {
        return;
    };
    let Some(container) = enclosing_container(ctx.model, id) else {
        return;
    };
    match find_entity_set(ctx.model, container, &name) {
        Some(set) => {
            if let NodeKind::FunctionImport(data) = &mut ctx.model[id].kind {
                data.resolved_entity_set = Some(set);
            }
        }
        None => {
            let container_name = ctx.model[container].name_or_empty().to_string();
            ctx.error(
                id,
                ErrorCode::InvalidFunctionImportEntitySet,
                format!("The entity set '{}' is not defined in container '{}'", name, container_name),
            );
        }
    }
}
