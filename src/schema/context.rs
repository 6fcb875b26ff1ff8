//! State shared by the resolution and validation passes

use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::locations::LineInfo;

use super::kinds::{ElementKind, NodeKind};
use super::model::{Model, NodeId};
use super::table::{FilteredView, NamedTable};

/// Borrowed registry state for one pass over the documents
pub(crate) struct Context<'a> {
    pub(crate) model: &'a mut Model,
    pub(crate) types: &'a NamedTable,
    pub(crate) containers: &'a NamedTable,
    pub(crate) functions: &'a mut NamedTable,
    pub(crate) namespaces: &'a IndexSet<String>,
    pub(crate) primitive_documents: &'a IndexMap<String, NodeId>,
    pub(crate) diagnostics: &'a mut Diagnostics,
}

impl Context<'_> {
    /// Whether the error cap has been reached
    pub(crate) fn is_halted(&self) -> bool {
        self.diagnostics.is_halted()
    }

    fn located(&self, id: NodeId, line_info: LineInfo, diagnostic: Diagnostic) -> Diagnostic {
        let location = self
            .model
            .schema_of(id)
            .and_then(|schema| schema.source_location.as_deref());
        diagnostic.at(location, line_info)
    }

    /// Report an error at the start tag of `id`
    pub(crate) fn error(&mut self, id: NodeId, code: ErrorCode, message: impl Into<String>) {
        let line_info = self.model[id].line_info;
        self.error_at(id, line_info, code, message);
    }

    /// Report an error at an explicit position inside the document of `id`
    pub(crate) fn error_at(&mut self, id: NodeId, line_info: LineInfo, code: ErrorCode, message: impl Into<String>) {
        let diagnostic = self.located(id, line_info, Diagnostic::error(code, message));
        self.diagnostics.report(diagnostic);
    }

    /// Report a warning at the start tag of `id`
    pub(crate) fn warning(&mut self, id: NodeId, code: ErrorCode, message: impl Into<String>) {
        let line_info = self.model[id].line_info;
        let diagnostic = self.located(id, line_info, Diagnostic::warning(code, message));
        self.diagnostics.report(diagnostic);
    }
}

// =============================================================================
// Container scopes
// =============================================================================

fn is_entity_set(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::EntitySet(_))
}

/// Resolved base container
pub(crate) fn extends_of(model: &Model, container: NodeId) -> Option<NodeId> {
    match &model[container].kind {
        NodeKind::EntityContainer(data) => data.resolved_extends,
        _ => None,
    }
}

/// `container` followed by the containers it extends
pub(crate) fn container_chain(model: &Model, container: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(container), move |c| extends_of(model, *c)).take(model.len())
}

/// Entity set visible in `container` by name, searching extended containers
pub(crate) fn find_entity_set(model: &Model, container: NodeId, name: &str) -> Option<NodeId> {
    container_chain(model, container).find_map(|c| {
        let members = model[c].kind.member_table()?;
        FilteredView::new(model, members, is_entity_set).get(name)
    })
}

/// All entity sets visible in `container`, local ones first
pub(crate) fn entity_sets_in_scope(model: &Model, container: NodeId) -> Vec<NodeId> {
    let mut sets = Vec::new();
    for c in container_chain(model, container) {
        if let Some(members) = model[c].kind.member_table() {
            sets.extend(FilteredView::new(model, members, is_entity_set).iter());
        }
    }
    sets
}

/// Entity type of an entity set
pub(crate) fn entity_set_type(model: &Model, set: NodeId) -> Option<NodeId> {
    match &model[set].kind {
        NodeKind::EntitySet(data) => data.resolved_type,
        _ => None,
    }
}

/// Entity type of an association end
pub(crate) fn end_type(model: &Model, end: NodeId) -> Option<NodeId> {
    match &model[end].kind {
        NodeKind::AssociationEnd(data) => data.resolved_type,
        _ => None,
    }
}

/// Enclosing container of a container member
pub(crate) fn enclosing_container(model: &Model, member: NodeId) -> Option<NodeId> {
    model.enclosing(member, ElementKind::EntityContainer)
}
