//! Tree storage and the query algorithms
//!
//! [`TreeStore`] owns the root [`TreeNode`] and the [`LruIndex`] holding the
//! records. Tree leaves hold the record's [`EntryId`], so a leaf and its
//! recency node are the same entry: refreshing through the tree and evicting
//! through the index never need a secondary lookup.

use ahash::AHashSet;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::{Condition, Filter, Record};
use crate::key::Key;
use crate::lru::{EntryId, LruIndex};
use crate::node::{Child, TreeNode};
use crate::schema::Schema;

/// Outcome of [`TreeStore::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    /// A new leaf was created
    New,
    /// An existing leaf's record was replaced and refreshed
    Replaced,
}

/// Tree of field values over an LRU index of records
#[derive(Debug, Default)]
pub(crate) struct TreeStore {
    root: TreeNode,
    lru: LruIndex<Record>,
}

impl TreeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of cached records
    pub(crate) fn len(&self) -> usize {
        self.lru.len()
    }

    pub(crate) fn lru(&self) -> &LruIndex<Record> {
        &self.lru
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Store a record at the leaf addressed by its key fields
    pub(crate) fn insert(&mut self, schema: &Schema, record: Record) -> Inserted {
        let path = schema.key_path(&record);
        let Some((last, parents)) = path.split_last() else {
            return Inserted::Replaced;
        };

        let mut node = &mut self.root;
        for key in parents {
            node = match node.get_or_insert_with(key.clone(), || Child::Branch(TreeNode::new())) {
                Child::Branch(next) => next,
                Child::Leaf(_) => unreachable!("leaf above schema depth"),
            };
        }

        if let Some(Child::Leaf(id)) = node.get(last) {
            let id = *id;
            if let Some(payload) = self.lru.get_mut(id) {
                *payload = record;
            }
            self.lru.refresh(id);
            return Inserted::Replaced;
        }

        let id = self.lru.insert(record);
        node.get_or_insert_with(last.clone(), || Child::Leaf(id));
        Inserted::New
    }

    /// Evict the least recently used record and remove its leaf
    pub(crate) fn evict(&mut self, schema: &Schema) -> Option<Record> {
        let (id, record) = self.lru.evict()?;
        let path = schema.key_path(&record);
        remove_leaf(&mut self.root, &path, id);
        Some(record)
    }

    /// Copies of every record matching `filter`, refreshing each one
    pub(crate) fn collect(&mut self, schema: &Schema, filter: &Filter) -> Vec<Record> {
        let mut ids = Vec::new();
        collect_leaves(&self.root, schema.fields(), filter, &mut |id| ids.push(id));

        ids.into_iter()
            .filter_map(|id| {
                self.lru.refresh(id);
                self.lru.get(id).cloned()
            })
            .collect()
    }

    /// Check that every combination of the filter's values is cached
    pub(crate) fn contains(&self, schema: &Schema, filter: &Filter) -> bool {
        contains_all(&self.root, schema.fields(), filter)
    }

    /// Smallest flat filter covering what `filter` asks for but is not cached
    pub(crate) fn diff(&self, schema: &Schema, filter: &Filter) -> Result<Filter> {
        let conds = schema
            .fields()
            .iter()
            .map(|field| {
                filter
                    .get(field)
                    .ok_or_else(|| Error::MissingField(field.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(match diff_level(&self.root, &conds) {
            None => Filter::new(),
            Some(missing) => schema.fields().iter().cloned().zip(missing).collect(),
        })
    }

    /// Drop every record and branch
    pub(crate) fn clear(&mut self) {
        self.root = TreeNode::new();
        self.lru.clear();
    }
}

/// Distinct candidate keys of a condition, in the condition's order
fn candidates(cond: &Condition) -> Vec<(Key, &Value)> {
    let mut seen = AHashSet::new();
    cond.values()
        .iter()
        .map(|value| (Key::from_value(Some(value)), value))
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect()
}

/// Returns `true` when `node` is left empty and can be pruned by its parent
fn remove_leaf(node: &mut TreeNode, path: &[Key], target: EntryId) -> bool {
    let Some((key, rest)) = path.split_first() else {
        return false;
    };

    if rest.is_empty() {
        if matches!(node.get(key), Some(Child::Leaf(id)) if *id == target) {
            node.remove(key);
        }
    } else if let Some(Child::Branch(child)) = node.get_mut(key) {
        if remove_leaf(child, rest, target) {
            node.remove(key);
        }
    }
    node.is_empty()
}

fn collect_leaves(
    node: &TreeNode,
    fields: &[String],
    filter: &Filter,
    emit: &mut dyn FnMut(EntryId),
) {
    let Some((field, rest)) = fields.split_first() else {
        return;
    };

    let mut visit = |child: &Child| match child {
        Child::Leaf(id) if rest.is_empty() => emit(*id),
        Child::Branch(next) if !rest.is_empty() => collect_leaves(next, rest, filter, &mut *emit),
        _ => {}
    };

    match filter.get(field) {
        // Wildcard: every branch present at this level
        None => node.children().for_each(&mut visit),
        Some(cond) => {
            for (key, _) in candidates(cond) {
                if let Some(child) = node.get(&key) {
                    visit(child);
                }
            }
        }
    }
}

fn contains_all(node: &TreeNode, fields: &[String], filter: &Filter) -> bool {
    let Some((field, rest)) = fields.split_first() else {
        return true;
    };

    let keys = match filter.get(field) {
        None => vec![Key::from_value(None)],
        Some(cond) => candidates(cond).into_iter().map(|(key, _)| key).collect(),
    };

    keys.iter().all(|key| match node.get(key) {
        Some(Child::Leaf(_)) => rest.is_empty(),
        Some(Child::Branch(next)) => !rest.is_empty() && contains_all(next, rest, filter),
        None => false,
    })
}

/// Ordered, de-duplicated union of values
#[derive(Default)]
struct ValueUnion {
    values: Vec<Value>,
    seen: AHashSet<Key>,
}

impl ValueUnion {
    fn extend(&mut self, values: &[Value]) {
        for value in values {
            if self.seen.insert(Key::from_value(Some(value))) {
                self.values.push(value.clone());
            }
        }
    }
}

/// Missing part of `conds` (one condition per remaining field) under `node`
///
/// `None` means every combination is cached. Otherwise the first condition
/// holds the active values at this level and each deeper condition the union
/// of what the active values are missing.
fn diff_level(node: &TreeNode, conds: &[&Condition]) -> Option<Vec<Condition>> {
    let (cond, deeper) = conds.split_first()?;

    // An empty deeper condition has no combinations, so nothing is missing
    let vacuous = deeper.iter().any(|c| c.values().is_empty());

    let mut active = Vec::new();
    let mut unions: Vec<ValueUnion> = deeper.iter().map(|_| ValueUnion::default()).collect();

    for (key, value) in candidates(cond) {
        match node.get(&key) {
            None if !vacuous => {
                active.push(value.clone());
                for (union, c) in unions.iter_mut().zip(deeper) {
                    union.extend(c.values());
                }
            }
            Some(Child::Branch(next)) if !deeper.is_empty() => {
                if let Some(missing) = diff_level(next, deeper) {
                    active.push(value.clone());
                    for (union, c) in unions.iter_mut().zip(&missing) {
                        union.extend(c.values());
                    }
                }
            }
            _ => {}
        }
    }

    if active.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(conds.len());
    out.push(cond.reshaped(active));
    out.extend(
        deeper
            .iter()
            .zip(unions)
            .map(|(c, union)| c.reshaped(union.values)),
    );
    Some(out)
}
