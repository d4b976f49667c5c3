//! Tree nodes with ordered siblings

use std::collections::BTreeMap;

use ahash::RandomState;
use indexmap::IndexMap;

use crate::key::Key;
use crate::lru::EntryId;

/// Value stored under a key: a deeper level, or a leaf entry in the LRU index
#[derive(Debug)]
pub enum Child {
    /// Next level of the tree
    Branch(TreeNode),
    /// Full-depth entry; the handle is the entry's node in the LRU index
    Leaf(EntryId),
}

/// One level of the tree
///
/// Index keys live in a `BTreeMap` (ascending), name keys in an `IndexMap`
/// (insertion order), which together give the sibling iteration order.
#[derive(Debug, Default)]
pub struct TreeNode {
    indexed: BTreeMap<u32, Child>,
    named: IndexMap<String, Child, RandomState>,
}

impl TreeNode {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a child
    pub fn get(&self, key: &Key) -> Option<&Child> {
        match key {
            Key::Index(i) => self.indexed.get(i),
            Key::Name(name) => self.named.get(name),
        }
    }

    /// Look up a child mutably
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Child> {
        match key {
            Key::Index(i) => self.indexed.get_mut(i),
            Key::Name(name) => self.named.get_mut(name),
        }
    }

    /// Get a child, inserting the result of `default` if absent
    pub fn get_or_insert_with(&mut self, key: Key, default: impl FnOnce() -> Child) -> &mut Child {
        match key {
            Key::Index(i) => self.indexed.entry(i).or_insert_with(default),
            Key::Name(name) => self.named.entry(name).or_insert_with(default),
        }
    }

    /// Remove a child, keeping the order of the remaining siblings
    pub fn remove(&mut self, key: &Key) -> Option<Child> {
        match key {
            Key::Index(i) => self.indexed.remove(i),
            Key::Name(name) => self.named.shift_remove(name),
        }
    }

    /// Number of children
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.indexed.len() + self.named.len()
    }

    /// Check if the node has no children
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.named.is_empty()
    }

    /// Iterate children in sibling order
    pub fn children(&self) -> impl Iterator<Item = &Child> + '_ {
        self.indexed.values().chain(self.named.values())
    }

    /// Iterate keys in sibling order
    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.indexed
            .keys()
            .map(|&i| Key::Index(i))
            .chain(self.named.keys().map(|name| Key::Name(name.clone())))
    }
}
