//! LRU index: recency list of cache entries
//!
//! Nodes live in a slot arena and are linked by index. Slots 0 and 1 are the
//! permanent `head` and `tail` sentinels, so an empty list is simply
//! `head.next == tail` and `tail.prev == head`. Entries are ordered from most
//! recently used (right after `head`) to least recently used (right before
//! `tail`).
//!
//! ```text
//!   [HEAD] <-> [mru] <-> ... <-> [lru] <-> [TAIL]
//! ```

const HEAD: usize = 0;
const TAIL: usize = 1;

/// Stable handle to an entry linked into an [`LruIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

impl EntryId {
    /// Sentinel handle that precedes the most recently used entry
    pub const HEAD: EntryId = EntryId(HEAD);

    /// Sentinel handle that follows the least recently used entry
    pub const TAIL: EntryId = EntryId(TAIL);
}

/// Slot in the arena; sentinels and free slots carry no payload
#[derive(Debug)]
struct Slot<T> {
    payload: Option<T>,
    prev: usize,
    next: usize,
}

impl<T> Slot<T> {
    fn sentinel() -> Self {
        Self {
            payload: None,
            prev: HEAD,
            next: TAIL,
        }
    }
}

/// Doubly-linked recency list with O(1) insert, refresh and evict
#[derive(Debug)]
pub struct LruIndex<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> Default for LruIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LruIndex<T> {
    /// Create an empty index (sentinels only)
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::sentinel(), Slot::sentinel()],
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Splice a new entry in right after `head` and return its handle
    pub fn insert(&mut self, payload: T) -> EntryId {
        let idx = self.alloc_slot();
        self.slots[idx].payload = Some(payload);
        self.attach_front(idx);
        self.len += 1;
        EntryId(idx)
    }

    /// Move an entry to the most recently used position
    ///
    /// Returns `false` if `id` is not a linked entry.
    pub fn refresh(&mut self, id: EntryId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.slots[HEAD].next == id.0 {
            return true; // Already at front
        }

        self.unlink(id.0);
        self.attach_front(id.0);
        true
    }

    /// Unlink and return the least recently used entry
    pub fn evict(&mut self) -> Option<(EntryId, T)> {
        let idx = self.slots[TAIL].prev;
        if idx == HEAD {
            return None;
        }

        self.unlink(idx);
        let payload = self.slots[idx].payload.take()?;
        self.free_list.push(idx);
        self.len -= 1;
        Some((EntryId(idx), payload))
    }

    /// Get the number of linked entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check whether `id` is a linked, non-sentinel entry
    pub fn contains(&self, id: EntryId) -> bool {
        id.0 > TAIL
            && self
                .slots
                .get(id.0)
                .is_some_and(|slot| slot.payload.is_some())
    }

    /// Get an entry's payload
    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.slots.get(id.0).and_then(|slot| slot.payload.as_ref())
    }

    /// Get an entry's payload mutably (recency is unchanged)
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(|slot| slot.payload.as_mut())
    }

    /// Handle of the node after `id` (may be [`EntryId::TAIL`])
    #[cfg(test)]
    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        if id == EntryId::TAIL {
            return None;
        }
        self.slots.get(id.0).map(|slot| EntryId(slot.next))
    }

    /// Handle of the node before `id` (may be [`EntryId::HEAD`])
    #[cfg(test)]
    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        if id == EntryId::HEAD {
            return None;
        }
        self.slots.get(id.0).map(|slot| EntryId(slot.prev))
    }

    /// Most recently used payload
    pub fn front(&self) -> Option<&T> {
        self.slots[self.slots[HEAD].next].payload.as_ref()
    }

    /// Least recently used payload
    pub fn back(&self) -> Option<&T> {
        self.slots[self.slots[TAIL].prev].payload.as_ref()
    }

    /// Iterate payloads from most to least recently used
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            index: self,
            current: self.slots[HEAD].next,
        }
    }

    /// Drop every entry and relink the sentinels
    pub fn clear(&mut self) {
        self.slots.truncate(2);
        self.slots[HEAD] = Slot::sentinel();
        self.slots[TAIL] = Slot::sentinel();
        self.free_list.clear();
        self.len = 0;
    }

    fn attach_front(&mut self, idx: usize) {
        let first = self.slots[HEAD].next;
        self.slots[idx].prev = HEAD;
        self.slots[idx].next = first;
        self.slots[first].prev = idx;
        self.slots[HEAD].next = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
        self.slots[idx].prev = idx;
        self.slots[idx].next = idx;
    }

    fn alloc_slot(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.slots.len();
            self.slots.push(Slot {
                payload: None,
                prev: idx,
                next: idx,
            });
            idx
        }
    }

    #[cfg(test)]
    fn check_links(&self) {
        let mut count = 0;
        let mut prev = HEAD;
        let mut current = self.slots[HEAD].next;
        while current != TAIL {
            assert_eq!(self.slots[current].prev, prev, "broken back link");
            assert!(self.slots[current].payload.is_some(), "sentinel or free slot linked");
            count += 1;
            prev = current;
            current = self.slots[current].next;
        }
        assert_eq!(self.slots[TAIL].prev, prev);
        assert_eq!(count, self.len);
    }
}

/// Iterator over payloads, most recently used first
pub struct Iter<'a, T> {
    index: &'a LruIndex<T>,
    current: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == TAIL {
            return None;
        }
        let slot = &self.index.slots[self.current];
        self.current = slot.next;
        slot.payload.as_ref()
    }
}
