//! CacheTree: multi-dimensional result cache with LRU eviction

use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::filter::{Filter, Record};
use crate::schema::Schema;
use crate::stats::CacheStats;
use crate::tree::{Inserted, TreeStore};

/// Records addressed by a fixed tuple of key fields, with LRU eviction
///
/// Records are nested by the schema's fields, outermost first. Each leaf is
/// an entry in a recency list: `set` and `get` mark records as used, and
/// once the cache holds more than `capacity` records the least recently
/// used one is evicted.
///
/// Operations on one handle are serialized by an internal lock; the
/// structure is meant to have a single logical owner issuing calls.
///
/// # Aliasing
///
/// [`clone_cache`](Self::clone_cache) does not copy anything. The returned
/// handle shares this cache's storage, so a `set`, an eviction or a
/// `clear_cache` through either handle is visible through both.
pub struct CacheTree {
    /// Key fields, outermost first
    schema: Arc<Schema>,

    /// Tree and recency index
    store: Arc<RwLock<TreeStore>>,

    /// Cache statistics
    stats: Arc<CacheStats>,

    /// Maximum number of records, `None` for unbounded
    capacity: Option<NonZeroUsize>,
}

impl CacheTree {
    /// Create an unbounded cache keyed by `fields`
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(&CacheConfig::new(fields))
    }

    /// Create a cache keyed by `fields` holding at most `capacity` records
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` - `capacity` is zero
    pub fn with_capacity<I, S>(fields: I, capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(&CacheConfig::new(fields).with_capacity(capacity))
    }

    /// Create a cache from a config
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let schema = config.validate()?;
        let capacity = match config.capacity {
            Some(n) => Some(NonZeroUsize::new(n).ok_or(Error::InvalidCapacity(n))?),
            None => None,
        };

        debug!(fields = ?schema.fields(), capacity = ?config.capacity, "created cache tree");
        Ok(Self {
            schema: Arc::new(schema),
            store: Arc::new(RwLock::new(TreeStore::new())),
            stats: Arc::new(CacheStats::new()),
            capacity,
        })
    }

    /// Insert a record, evicting the least recently used one if over capacity
    ///
    /// A record whose key fields match a cached record replaces it and
    /// becomes the most recently used. A missing key field is keyed as the
    /// literal `undefined`.
    pub fn set(&self, record: Record) {
        let mut store = self.store.write();
        self.insert_locked(&mut store, record);
    }

    /// Insert a sequence of records in order
    pub fn set_many<I>(&self, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut store = self.store.write();
        for record in records {
            self.insert_locked(&mut store, record);
        }
    }

    /// Insert a JSON object or an array of JSON objects
    ///
    /// # Returns
    /// * `Result<usize>` - Number of records inserted
    pub fn set_value(&self, value: Value) -> Result<usize> {
        match value {
            Value::Object(record) => {
                self.set(record);
                Ok(1)
            }
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(record) => Ok(record),
                        other => Err(Error::InvalidRecord(format!(
                            "expected object, got {}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let count = records.len();
                self.set_many(records);
                Ok(count)
            }
            other => Err(Error::InvalidRecord(format!(
                "expected object or array, got {}",
                other
            ))),
        }
    }

    fn insert_locked(&self, store: &mut TreeStore, record: Record) {
        match store.insert(&self.schema, record) {
            Inserted::New => self.stats.record_insert(),
            Inserted::Replaced => trace!("replaced cached record at existing path"),
        }

        let Some(capacity) = self.capacity else {
            return;
        };
        while store.len() > capacity.get() {
            let Some(evicted) = store.evict(&self.schema) else {
                break;
            };
            self.stats.record_eviction();
            trace!(
                path = ?self.schema.key_path(&evicted),
                size = store.len(),
                "evicted least recently used record"
            );
        }
    }

    /// Get copies of every cached record matching `filter`
    ///
    /// Each field of the filter may be a value, an array of values (any of
    /// them), or absent (every value cached at that level). Combinations that
    /// are not cached are skipped. Results come depth-first in schema order;
    /// within a level, listed values keep the filter's order and wildcards
    /// yield integer keys ascending, then other keys in insertion order.
    /// Every returned record becomes the most recently used.
    pub fn get(&self, filter: &Filter) -> Vec<Record> {
        let found = self.store.write().collect(&self.schema, filter);
        if found.is_empty() {
            self.stats.record_miss();
        } else {
            self.stats.record_hits(found.len() as u64);
        }
        found
    }

    /// Check that every combination of the filter's values is cached
    ///
    /// A field absent from the filter is looked up as `undefined`. Recency is
    /// not changed.
    pub fn has(&self, filter: &Filter) -> bool {
        let found = self.store.read().contains(&self.schema, filter);
        self.stats.record_lookup(found);
        found
    }

    /// Describe what must still be fetched to satisfy `filter`
    ///
    /// Returns a filter of the same shape holding only unsatisfied values, or
    /// an empty filter when everything is cached. Where branches disagree on
    /// which deeper values are missing, the union is reported, so fetching
    /// the result may re-fetch some cached combinations.
    ///
    /// # Errors
    /// * `Error::MissingField` - `filter` omits a schema field
    pub fn get_diff(&self, filter: &Filter) -> Result<Filter> {
        let diff = self.store.read().diff(&self.schema, filter)?;
        self.stats.record_lookup(diff.is_empty());
        Ok(diff)
    }

    /// Get the number of cached records
    pub fn get_size(&self) -> usize {
        self.store.read().len()
    }

    /// Check if the cache holds no records
    pub fn is_empty(&self) -> bool {
        self.get_size() == 0
    }

    /// Drop every record and reset statistics
    pub fn clear_cache(&self) {
        let mut store = self.store.write();
        let dropped = store.len();
        store.clear();
        self.stats.reset();
        debug!(dropped, "cleared cache tree");
    }

    /// New handle aliasing this cache's storage (see the type-level docs)
    pub fn clone_cache(&self) -> CacheTree {
        debug!("cloned cache tree handle");
        Self {
            schema: Arc::clone(&self.schema),
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            capacity: self.capacity,
        }
    }

    /// Check whether two handles share the same storage
    pub fn shares_storage_with(&self, other: &CacheTree) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    /// Copies of the cached records, most recently used first
    pub fn recency(&self) -> Vec<Record> {
        self.store.read().lru().iter().cloned().collect()
    }

    /// Key fields, outermost first
    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }

    /// Get cache capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    #[cfg(test)]
    fn leaf_count(&self) -> usize {
        fn count(node: &crate::node::TreeNode) -> usize {
            node.children()
                .map(|child| match child {
                    crate::node::Child::Leaf(_) => 1,
                    crate::node::Child::Branch(next) => count(next),
                })
                .sum()
        }
        count(self.store.read().root())
    }
}

impl std::fmt::Debug for CacheTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTree")
            .field("fields", &self.schema.fields())
            .field("capacity", &self.capacity())
            .field("size", &self.get_size())
            .finish()
    }
}
