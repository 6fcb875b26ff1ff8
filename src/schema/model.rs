//! Node arena
//!
//! All documents of one compilation live in a single [`Model`]: an arena of
//! [`Node`]s addressed by [`NodeId`]. Parent and owning-document links are
//! plain ids into the same arena.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::locations::LineInfo;
use crate::names::qualify;
use crate::namespaces::QName;

use super::kinds::{ElementKind, NodeKind, SchemaData};

/// Handle of a node in a [`Model`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Handle for an arena slot
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Arena slot of this handle
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Passes a node has been through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Top-level names resolved
    pub top_level: bool,
    /// Second-level names resolved
    pub second_level: bool,
    /// Validated
    pub validated: bool,
}

impl Progress {
    /// Progress of a node that needs no passes
    pub fn complete() -> Self {
        Self {
            top_level: true,
            second_level: true,
            validated: true,
        }
    }
}

/// An attribute from a foreign namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignAttribute {
    /// Attribute name
    pub name: QName,
    /// Attribute value
    pub value: String,
}

/// An element from a foreign namespace, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignElement {
    /// Element name
    pub name: QName,
    /// Attributes in document order
    pub attributes: Vec<ForeignAttribute>,
    /// Concatenated text content
    pub text: String,
    /// Child elements
    pub children: Vec<ForeignElement>,
    /// Position
    pub line_info: LineInfo,
}

/// Content preserved on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignContent {
    /// Foreign attribute
    Attribute(ForeignAttribute),
    /// Foreign element
    Element(ForeignElement),
}

/// A model node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Name, if the element has one
    pub name: Option<String>,
    /// Parent; `None` only for document roots
    pub parent: Option<NodeId>,
    /// Owning document root
    pub document: NodeId,
    /// Position of the start tag
    pub line_info: LineInfo,
    /// Kind payload
    pub kind: NodeKind,
    /// Child elements in document order
    pub children: Vec<NodeId>,
    /// Preserved foreign-namespace content
    pub foreign: Vec<ForeignContent>,
    /// `Documentation` child
    pub documentation: Option<NodeId>,
    /// Passes completed
    pub progress: Progress,
    /// Node this one was cloned from (container extension)
    pub cloned_from: Option<NodeId>,
}

impl Node {
    /// Kind tag
    pub fn element_kind(&self) -> ElementKind {
        self.kind.element_kind()
    }

    /// Name or an empty string
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Arena of all nodes of a compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    nodes: Vec<Node>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the model is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a document root
    pub(crate) fn add_root(&mut self, kind: NodeKind, line_info: LineInfo) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.push(Node {
            name: None,
            parent: None,
            document: id,
            line_info,
            kind,
            children: Vec::new(),
            foreign: Vec::new(),
            documentation: None,
            progress: Progress::default(),
            cloned_from: None,
        })
    }

    /// Add a child of `parent`
    pub(crate) fn add_child(&mut self, parent: NodeId, kind: NodeKind, line_info: LineInfo) -> NodeId {
        let document = self[parent].document;
        let id = self.push(Node {
            name: None,
            parent: Some(parent),
            document,
            line_info,
            kind,
            children: Vec::new(),
            foreign: Vec::new(),
            documentation: None,
            progress: Progress::default(),
            cloned_from: None,
        });
        self[parent].children.push(id);
        id
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// All nodes with their ids
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }

    /// Name of a node
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self[id].name.as_deref()
    }

    /// Root data of a document node
    pub fn schema(&self, document: NodeId) -> Option<&SchemaData> {
        match &self[document].kind {
            NodeKind::Schema(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable root data of a document node
    pub fn schema_mut(&mut self, document: NodeId) -> Option<&mut SchemaData> {
        match &mut self[document].kind {
            NodeKind::Schema(data) => Some(data),
            _ => None,
        }
    }

    /// Root data of the document owning `id`
    pub fn schema_of(&self, id: NodeId) -> Option<&SchemaData> {
        self.schema(self[id].document)
    }

    /// Namespace of the document owning `id`
    pub fn namespace_of(&self, id: NodeId) -> Option<&str> {
        self.schema_of(id).and_then(|s| s.namespace.as_deref())
    }

    /// Fully qualified name `Namespace.Name` of a named node
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        let name = self.name(id)?;
        match self.namespace_of(id) {
            Some(ns) => Some(qualify(ns, name)),
            None => Some(name.to_string()),
        }
    }

    /// Qualified name for messages, falling back to the element kind
    pub fn display_name(&self, id: NodeId) -> String {
        self.qualified_name(id)
            .unwrap_or_else(|| self[id].element_kind().to_string())
    }

    /// Text of a text-holder node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self[id].kind {
            NodeKind::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self[id].parent, move |p| self[*p].parent)
    }

    /// Nearest ancestor of the given kind
    pub fn enclosing(&self, id: NodeId, kind: ElementKind) -> Option<NodeId> {
        self.ancestors(id).find(|a| self[*a].element_kind() == kind)
    }

    /// `id` and all its descendants in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self[current].children.iter().rev().copied());
        }
        out
    }

    /// Deep copy the subtree at `source` under `parent`
    ///
    /// References between nodes of the subtree are redirected to the copies;
    /// references leaving it are kept. Copies keep the progress of their
    /// originals and record them in `cloned_from`.
    pub(crate) fn clone_subtree(&mut self, source: NodeId, parent: NodeId) -> NodeId {
        let originals = self.descendants(source);
        let document = self[parent].document;
        let start = self.nodes.len();

        let mut map = HashMap::with_capacity(originals.len());
        for (offset, old) in originals.iter().enumerate() {
            map.insert(*old, NodeId::from_index(start + offset));
        }

        for old in &originals {
            let mut node = self[*old].clone();
            node.document = document;
            node.cloned_from = Some(*old);
            self.nodes.push(node);
        }

        let remap = |id: &mut NodeId| {
            if let Some(new) = map.get(id) {
                *id = *new;
            }
        };
        for offset in 0..originals.len() {
            let node = &mut self.nodes[start + offset];
            let mut remap = remap;
            if let Some(p) = node.parent.as_mut() {
                remap(p);
            }
            node.children.iter_mut().for_each(&mut remap);
            if let Some(d) = node.documentation.as_mut() {
                remap(d);
            }
            node.kind.for_each_id_mut(&mut remap);
        }

        let root = NodeId::from_index(start);
        self[root].parent = Some(parent);
        self[parent].children.push(root);
        root
    }
}

// =============================================================================
// Type hierarchy helpers
// =============================================================================

impl Model {
    /// Resolved base type of an entity or complex type
    pub fn base_of(&self, id: NodeId) -> Option<NodeId> {
        self[id].kind.structured().and_then(|data| data.resolved_base)
    }

    /// `id` followed by its resolved base types, nearest first
    ///
    /// Stops after `len()` steps so a malformed chain cannot loop.
    pub fn base_chain(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| self.base_of(*current)).take(self.len())
    }

    /// Whether `derived` is `base` or derives from it
    pub fn derives_from(&self, derived: NodeId, base: NodeId) -> bool {
        self.base_chain(derived).any(|id| id == base)
    }

    /// Member of a structured type by name, searching the base chain
    pub fn find_member(&self, type_id: NodeId, name: &str) -> Option<NodeId> {
        self.base_chain(type_id).find_map(|id| {
            self[id]
                .kind
                .member_table()
                .and_then(|members| members.get(name))
        })
    }
}

impl Index<NodeId> for Model {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Model {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{Dialect, SchemaVersion};
    use crate::schema::kinds::{
        AssociationSetData, DocumentationData, EndBinding, EntityContainerData, EntitySetData,
    };

    fn schema() -> NodeKind {
        let mut data = SchemaData::new(Dialect::Conceptual, SchemaVersion::V2_0, "Edm");
        data.namespace = Some("Model".to_string());
        NodeKind::Schema(data)
    }

    #[test]
    fn test_parent_and_document_links() {
        let mut model = Model::new();
        let doc = model.add_root(schema(), LineInfo::new(1, 1));
        let container = model.add_child(
            doc,
            NodeKind::EntityContainer(EntityContainerData::default()),
            LineInfo::new(2, 3),
        );
        let set = model.add_child(
            container,
            NodeKind::EntitySet(EntitySetData::default()),
            LineInfo::new(3, 5),
        );
        model[set].name = Some("Customers".to_string());

        assert_eq!(model[set].document, doc);
        assert_eq!(model.ancestors(set).collect::<Vec<_>>(), vec![container, doc]);
        assert_eq!(model.enclosing(set, ElementKind::EntityContainer), Some(container));
        assert_eq!(model.qualified_name(set).as_deref(), Some("Model.Customers"));
        assert_eq!(model.descendants(doc), vec![doc, container, set]);
    }

    #[test]
    fn test_clone_subtree_remaps_internal_links() {
        let mut model = Model::new();
        let doc = model.add_root(schema(), LineInfo::unknown());
        let base = model.add_child(
            doc,
            NodeKind::EntityContainer(EntityContainerData::default()),
            LineInfo::unknown(),
        );
        let derived = model.add_child(
            doc,
            NodeKind::EntityContainer(EntityContainerData::default()),
            LineInfo::unknown(),
        );
        let set = model.add_child(base, NodeKind::EntitySet(EntitySetData::default()), LineInfo::unknown());
        let assoc_set = model.add_child(
            base,
            NodeKind::AssociationSet(AssociationSetData::default()),
            LineInfo::unknown(),
        );
        let docs = model.add_child(
            assoc_set,
            NodeKind::Documentation(DocumentationData::default()),
            LineInfo::unknown(),
        );
        model[assoc_set].documentation = Some(docs);
        if let NodeKind::AssociationSet(data) = &mut model[assoc_set].kind {
            data.bindings.push(EndBinding {
                role: "A".to_string(),
                end: set,
                entity_set: Some(set),
                declared: None,
            });
        }

        let copy = model.clone_subtree(assoc_set, derived);
        assert_ne!(copy, assoc_set);
        assert_eq!(model[copy].parent, Some(derived));
        assert_eq!(model[copy].cloned_from, Some(assoc_set));
        assert_eq!(model[derived].children, vec![copy]);

        let copied_docs = model[copy].documentation.unwrap();
        assert_ne!(copied_docs, docs);
        assert_eq!(model[copied_docs].parent, Some(copy));

        match &model[copy].kind {
            NodeKind::AssociationSet(data) => assert_eq!(data.bindings[0].entity_set, Some(set)),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(model[assoc_set].documentation, Some(docs));
    }
}
