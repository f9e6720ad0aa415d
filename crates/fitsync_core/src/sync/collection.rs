//! Normalized record arena used as in-memory container state.
//!
//! # Invariants
//! - Each id appears at most once.
//! - Iteration follows first-insertion order; replacing a record keeps its
//!   position.

use crate::model::{Record, RecordId};
use std::collections::{HashMap, HashSet};

/// Records of one kind keyed by id, remembering insertion order.
#[derive(Debug, Clone)]
pub struct Collection<T: Record> {
    order: Vec<RecordId>,
    items: HashMap<RecordId, T>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        for record in records {
            collection.upsert(record);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.items.get(&id)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.order.clone()
    }

    /// Records whose parent is `parent_id`, in insertion order.
    pub fn children_of(&self, parent_id: RecordId) -> Vec<&T> {
        self.iter()
            .filter(|record| record.parent_id() == Some(parent_id))
            .collect()
    }

    /// Inserts a new record at the end, or replaces an existing one in place.
    pub fn upsert(&mut self, record: T) {
        let id = record.id();
        if self.items.insert(id, record).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: RecordId) -> Option<T> {
        let removed = self.items.remove(&id)?;
        self.order.retain(|value| *value != id);
        Some(removed)
    }

    /// Removes every record whose parent is in `parents`, returning the
    /// removed ids so callers can continue one level down.
    pub fn remove_children_of(&mut self, parents: &HashSet<RecordId>) -> HashSet<RecordId> {
        let removed: HashSet<RecordId> = self
            .iter()
            .filter(|record| {
                record
                    .parent_id()
                    .is_some_and(|parent| parents.contains(&parent))
            })
            .map(Record::id)
            .collect();
        if !removed.is_empty() {
            self.items.retain(|id, _| !removed.contains(id));
            self.order.retain(|id| !removed.contains(id));
        }
        removed
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Collection;
    use crate::model::{Record, RecordId};
    use std::collections::HashSet;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: RecordId,
        parent: Option<RecordId>,
        label: &'static str,
    }

    impl Record for Node {
        fn id(&self) -> RecordId {
            self.id
        }

        fn parent_id(&self) -> Option<RecordId> {
            self.parent
        }
    }

    fn node(parent: Option<RecordId>, label: &'static str) -> Node {
        Node {
            id: Uuid::new_v4(),
            parent,
            label,
        }
    }

    #[test]
    fn upsert_keeps_position_when_replacing() {
        let first = node(None, "a");
        let second = node(None, "b");
        let mut collection = Collection::from_records([first.clone(), second.clone()]);

        collection.upsert(Node {
            label: "a2",
            ..first.clone()
        });

        let labels: Vec<_> = collection.iter().map(|item| item.label).collect();
        assert_eq!(labels, vec!["a2", "b"]);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn children_and_cascading_removal() {
        let parent = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut collection = Collection::from_records([
            node(Some(parent), "x"),
            node(Some(other), "y"),
            node(Some(parent), "z"),
        ]);

        let children: Vec<_> = collection
            .children_of(parent)
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(children, vec!["x", "z"]);

        let removed = collection.remove_children_of(&HashSet::from([parent]));
        assert_eq!(removed.len(), 2);
        assert_eq!(collection.len(), 1);
        assert!(collection.children_of(parent).is_empty());
    }

    #[test]
    fn remove_returns_record_once() {
        let item = node(None, "a");
        let mut collection = Collection::from_records([item.clone()]);
        assert_eq!(collection.remove(item.id), Some(item.clone()));
        assert_eq!(collection.remove(item.id), None);
        assert!(collection.is_empty());
    }
}
