//! Containers, functions and function imports

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::namespaces::Dialect;

use super::super::context::{entity_set_type, extends_of, Context};
use super::super::kinds::{ElementKind, NodeKind};
use super::super::model::{Model, NodeId};
use super::super::table::AddOutcome;
use super::validate_node;

// =============================================================================
// Container extension
// =============================================================================

/// Copy the members of the extended container into `id`
///
/// The base is validated (and so merged with its own base) first. A base
/// member whose name is already taken is reported once and not copied.
pub(super) fn merge_extended_container(ctx: &mut Context<'_>, id: NodeId) {
    let Some(base) = extends_of(ctx.model, id) else {
        return;
    };
    validate_node(ctx, base);

    let inherited: Vec<(String, NodeId)> = match ctx.model[base].kind.member_table() {
        Some(table) => table.iter().map(|(name, member)| (name.to_string(), member)).collect(),
        None => return,
    };
    let container = ctx.model[id].name_or_empty().to_string();
    let base_name = ctx.model[base].name_or_empty().to_string();

    for (name, member) in inherited {
        let taken = ctx.model[id].kind.member_table().map_or(false, |t| t.contains(&name));
        if taken {
            ctx.error(
                id,
                ErrorCode::DuplicateInExtendedContainer,
                format!(
                    "'{}' of container '{}' conflicts with the member of the same name inherited from '{}'",
                    name, container, base_name
                ),
            );
            continue;
        }
        let copy = ctx.model.clone_subtree(member, id);
        log::trace!("container {} inherits {} from {}", container, name, base_name);
        if let Some(table) = ctx.model[id].kind.member_table_mut() {
            if let AddOutcome::Duplicate(_) = table.add(Some(&name), copy) {
                log::debug!("member {} of container {} was added twice", name, container);
            }
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Composability rules of conceptual and store functions
pub(super) fn validate_function(ctx: &mut Context<'_>, id: NodeId) {
    let NodeKind::Function(data) = &ctx.model[id].kind else {
        return;
    };
    let composable = data.is_composable;
    let aggregate = data.is_aggregate;
    let has_return = data.has_return_type();
    let has_command = data.command_text.is_some();
    let store = ctx
        .model
        .schema_of(id)
        .map_or(false, |schema| schema.dialect != Dialect::Conceptual);
    let name = ctx.model.display_name(id);

    if composable && !has_return {
        ctx.error(
            id,
            ErrorCode::ComposableFunctionWithoutReturnType,
            format!("Composable function '{}' must declare a return type", name),
        );
    }
    if store && aggregate && !composable {
        ctx.error(
            id,
            ErrorCode::NonComposableAggregate,
            format!("Aggregate function '{}' must be composable", name),
        );
    }
    if has_command && composable {
        ctx.error(
            id,
            ErrorCode::CommandTextOnComposableFunction,
            format!("Function '{}' has command text and must be declared IsComposable=\"false\"", name),
        );
    }
}

/// Return shape and entity set of a function import
pub(super) fn validate_function_import(ctx: &mut Context<'_>, id: NodeId) {
    let NodeKind::FunctionImport(data) = &ctx.model[id].kind else {
        return;
    };
    let returns = data.return_type.resolved;
    let reference = data.return_type.reference;
    let entity_set_name = data.entity_set.clone();
    let entity_set = data.resolved_entity_set;
    let name = ctx.model[id].name_or_empty().to_string();

    if reference {
        ctx.error(
            id,
            ErrorCode::InvalidFunctionImportReturnType,
            format!(
                "Function import '{}' must return a primitive, complex or entity type or a collection of one",
                name
            ),
        );
        return;
    }

    let returns_entities = returns.map_or(false, |t| ctx.model[t].element_kind() == ElementKind::EntityType);
    match (returns, entity_set_name) {
        (Some(entity), _) if returns_entities => match entity_set {
            Some(set) => {
                let compatible = entity_set_type(ctx.model, set).map_or(true, |st| ctx.model.derives_from(entity, st));
                if !compatible {
                    let message = format!(
                        "The entity set '{}' of function import '{}' cannot hold instances of '{}'",
                        ctx.model[set].name_or_empty(),
                        name,
                        ctx.model.display_name(entity)
                    );
                    ctx.error(id, ErrorCode::InvalidFunctionImportEntitySet, message);
                }
            }
            None => ctx.error(
                id,
                ErrorCode::InvalidFunctionImportEntitySet,
                format!("Function import '{}' returns entities and must specify an EntitySet", name),
            ),
        },
        (_, Some(set_name)) => ctx.error(
            id,
            ErrorCode::InvalidFunctionImportEntitySet,
            format!(
                "Function import '{}' specifies entity set '{}' but does not return entities",
                name, set_name
            ),
        ),
        _ => {}
    }
}

// =============================================================================
// Duplicate table mapping
// =============================================================================

fn table_key(model: &Model, set: NodeId) -> Option<(String, String)> {
    let NodeKind::EntitySet(data) = &model[set].kind else {
        return None;
    };
    if data.defining_query.is_some() || model[set].cloned_from.is_some() {
        return None;
    }
    let container = model[set].parent.map(|c| model[c].name_or_empty().to_string()).unwrap_or_default();
    let schema = data.schema.clone().unwrap_or(container);
    let table = data.table.clone().or_else(|| model[set].name.clone())?;
    Some((schema, table))
}

fn set_label(model: &Model, set: NodeId) -> String {
    match model[set].parent {
        Some(container) => format!("{}.{}", model[container].name_or_empty(), model[set].name_or_empty()),
        None => model[set].name_or_empty().to_string(),
    }
}

/// Two storage entity sets may not map the same `(schema, table)` pair
///
/// Runs over every storage document of the compilation; the second set to
/// claim a table is reported, naming both.
pub(crate) fn check_duplicate_tables(model: &Model, documents: &[NodeId], diagnostics: &mut Diagnostics) {
    let mut claimed: IndexMap<(String, String), NodeId> = IndexMap::new();
    for document in documents {
        let Some(schema) = model.schema(*document) else {
            continue;
        };
        if schema.dialect != Dialect::Storage {
            continue;
        }
        for container in &schema.containers {
            for set in model[*container].children.iter().copied() {
                let Some(key) = table_key(model, set) else {
                    continue;
                };
                match claimed.get(&key) {
                    Some(first) => {
                        let message = format!(
                            "Entity sets '{}' and '{}' both map table '{}.{}'",
                            set_label(model, *first),
                            set_label(model, set),
                            key.0,
                            key.1
                        );
                        let diagnostic = Diagnostic::error(ErrorCode::DuplicateTableMapping, message)
                            .at(schema.source_location.as_deref(), model[set].line_info);
                        if !diagnostics.report(diagnostic) {
                            return;
                        }
                    }
                    None => {
                        claimed.insert(key, set);
                    }
                }
            }
        }
    }
}
