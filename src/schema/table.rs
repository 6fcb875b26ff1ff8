//! Named-element tables
//!
//! [`NamedTable`] is the ordered, name-keyed collection behind every member
//! list of the model and behind the global type table of a compilation.
//! [`FilteredView`] projects a table onto one kind of node without copying it.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::kinds::NodeKind;
use super::model::{Model, NodeId};

/// Outcome of adding an element to a [`NamedTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The element was inserted
    Added,
    /// The element has no name; nothing was inserted
    MissingName,
    /// The name is taken by the given element; nothing was inserted
    Duplicate(NodeId),
}

/// Ordered collection of elements keyed by name
///
/// Keys compare ordinally. A case-insensitive index is kept alongside so
/// lookups that fail can suggest the differently cased key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedTable {
    entries: IndexMap<String, NodeId>,
    folded: HashMap<String, String>,
}

impl NamedTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under `key`
    pub fn add(&mut self, key: Option<&str>, id: NodeId) -> AddOutcome {
        let key = match key {
            Some(key) if !key.is_empty() => key,
            _ => return AddOutcome::MissingName,
        };
        if let Some(existing) = self.entries.get(key) {
            return AddOutcome::Duplicate(*existing);
        }
        self.folded
            .entry(key.to_lowercase())
            .or_insert_with(|| key.to_string());
        self.entries.insert(key.to_string(), id);
        AddOutcome::Added
    }

    /// Exact (ordinal) lookup
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    /// Case-insensitive lookup returning the stored key and element
    pub fn get_equivalent(&self, key: &str) -> Option<(&str, NodeId)> {
        let stored = self.folded.get(&key.to_lowercase())?;
        self.entries
            .get_key_value(stored.as_str())
            .map(|(k, id)| (k.as_str(), *id))
    }

    /// Whether `key` is present (ordinal)
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elements in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.entries.iter().map(|(k, id)| (k.as_str(), *id))
    }

    /// Element ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.values().copied()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn for_each_id_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        for id in self.entries.values_mut() {
            f(id);
        }
    }
}

/// Read-only projection of a [`NamedTable`] onto one kind of node
///
/// The filter runs on every enumeration, so the view always reflects the
/// table's current contents.
#[derive(Clone, Copy)]
pub struct FilteredView<'a> {
    model: &'a Model,
    table: &'a NamedTable,
    filter: fn(&NodeKind) -> bool,
}

impl<'a> FilteredView<'a> {
    /// Create a view
    pub fn new(model: &'a Model, table: &'a NamedTable, filter: fn(&NodeKind) -> bool) -> Self {
        Self {
            model,
            table,
            filter,
        }
    }

    /// Matching elements in table order
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + 'a {
        let model = self.model;
        let filter = self.filter;
        self.table.ids().filter(move |id| filter(&model[*id].kind))
    }

    /// Matching element with the given name
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.table
            .get(key)
            .filter(|id| (self.filter)(&self.model[*id].kind))
    }

    /// Number of matching elements
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Whether no element matches
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl std::fmt::Debug for FilteredView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::LineInfo;
    use crate::schema::kinds::{EntitySetData, NodeKind};
    use proptest::prelude::*;

    fn id(n: usize) -> NodeId {
        NodeId::from_index(n)
    }

    #[test]
    fn test_add_outcomes() {
        let mut table = NamedTable::new();
        assert_eq!(table.add(Some("Customer"), id(1)), AddOutcome::Added);
        assert_eq!(table.add(None, id(2)), AddOutcome::MissingName);
        assert_eq!(table.add(Some(""), id(2)), AddOutcome::MissingName);
        assert_eq!(table.add(Some("Customer"), id(3)), AddOutcome::Duplicate(id(1)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Customer"), Some(id(1)));
    }

    #[test]
    fn test_case_variants_are_distinct() {
        let mut table = NamedTable::new();
        table.add(Some("Order"), id(1));
        assert_eq!(table.add(Some("order"), id(2)), AddOutcome::Added);
        assert_eq!(table.get("ORDER"), None);
        assert_eq!(table.get_equivalent("ORDER"), Some(("Order", id(1))));
    }

    #[test]
    fn test_insertion_order() {
        let mut table = NamedTable::new();
        for (i, name) in ["b", "a", "c"].iter().enumerate() {
            table.add(Some(name), id(i));
        }
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_filtered_view_is_live() {
        let mut model = Model::new();
        let root = model.add_root(NodeKind::Documentation(Default::default()), LineInfo::unknown());
        let set = model.add_child(root, NodeKind::EntitySet(EntitySetData::default()), LineInfo::unknown());
        let other = model.add_child(root, NodeKind::Documentation(Default::default()), LineInfo::unknown());

        let mut table = NamedTable::new();
        table.add(Some("Docs"), other);
        {
            let view = FilteredView::new(&model, &table, |k| matches!(k, NodeKind::EntitySet(_)));
            assert!(view.is_empty());
        }
        table.add(Some("Customers"), set);
        let view = FilteredView::new(&model, &table, |k| matches!(k, NodeKind::EntitySet(_)));
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![set]);
        assert_eq!(view.get("Customers"), Some(set));
        assert_eq!(view.get("Docs"), None);
        assert_eq!(view.count(), 1);
    }

    proptest! {
        #[test]
        fn prop_duplicates_never_mutate(names in proptest::collection::vec("[a-cA-C]{1,2}", 1..20)) {
            let mut table = NamedTable::new();
            for (i, name) in names.iter().enumerate() {
                let before = table.len();
                match table.add(Some(name), id(i)) {
                    AddOutcome::Added => prop_assert_eq!(table.len(), before + 1),
                    AddOutcome::Duplicate(existing) => {
                        prop_assert_eq!(table.len(), before);
                        prop_assert_eq!(table.get(name), Some(existing));
                    }
                    AddOutcome::MissingName => prop_assert!(false),
                }
            }
            for name in &names {
                prop_assert!(table.get_equivalent(&name.to_uppercase()).is_some());
            }
        }
    }
}
