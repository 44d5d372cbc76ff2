//! Keyed binary heap with O(log n) push/pop/remove/update.
//!
//! Items live in a dense array laid out as a max-heap on serve order.
//! A key -> array position map gives O(1) membership and lookup and is kept
//! in step with every swap, so Export/Import are plain linear scans.

use crate::queue::error::{QueueError, SnapshotError};

use super::{FxHashMap, Item, ItemSnapshot};

pub struct PriorityQueue {
    heap: Vec<Item>,
    /// Key -> position in `heap`
    index: FxHashMap<String, usize>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Push an item - O(log n). Duplicate keys are rejected.
    pub fn push(&mut self, mut item: Item) -> Result<(), QueueError> {
        if self.index.contains_key(item.key()) {
            return Err(QueueError::DuplicateKey {
                key: item.key().to_string(),
            });
        }

        let pos = self.heap.len();
        item.set_index(pos);
        self.index.insert(item.key().to_string(), pos);
        self.heap.push(item);
        self.sift_up(pos);
        Ok(())
    }

    /// Pop the item to serve next - O(log n)
    #[inline]
    pub fn pop(&mut self) -> Option<Item> {
        self.remove_at(0)
    }

    /// Item that `pop` would return, without removing it - O(1)
    #[inline]
    pub fn peek(&self) -> Option<&Item> {
        self.heap.first()
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.index.get(key).map(|&pos| &self.heap[pos])
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Remove a key if present - O(log n)
    #[inline]
    pub fn remove(&mut self, key: &str) -> bool {
        self.take(key).is_some()
    }

    /// Remove a key and hand back the item - O(log n)
    pub fn take(&mut self, key: &str) -> Option<Item> {
        let pos = *self.index.get(key)?;
        self.remove_at(pos)
    }

    /// Change an item's priority and restore the heap - O(log n).
    /// Creation time is left untouched.
    pub fn update_priority(&mut self, key: &str, priority: i64) -> bool {
        let Some(&pos) = self.index.get(key) else {
            return false;
        };
        self.heap[pos].set_priority(priority);
        self.fix(pos);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterate in heap-array order (not serve order)
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.heap.iter()
    }

    /// All items in serve order.
    pub fn sorted(&self) -> Vec<Item> {
        let mut items = self.heap.clone();
        items.sort_by(|a, b| a.serve_order(b));
        items
    }

    #[inline]
    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }

    // ============== Snapshot ==============

    /// Backing array in heap order, one entry per slot.
    pub fn export(&self) -> Vec<ItemSnapshot> {
        self.heap.iter().map(ItemSnapshot::from).collect()
    }

    /// Replace the contents with a snapshot.
    ///
    /// The snapshot is validated into a fresh queue first; on error `self`
    /// is unchanged.
    pub fn import(&mut self, snapshot: Vec<ItemSnapshot>) -> Result<(), SnapshotError> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.export())
    }

    pub fn import_json(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let snapshot: Vec<ItemSnapshot> = serde_json::from_slice(bytes)?;
        self.import(snapshot)
    }

    /// Build a queue from a snapshot.
    ///
    /// Indices must be a permutation of `0..len` and keys must be unique.
    /// Items are placed at their recorded slots and then re-heapified, so a
    /// snapshot whose slots violate heap order still yields a valid queue.
    pub fn from_snapshot(snapshot: Vec<ItemSnapshot>) -> Result<Self, SnapshotError> {
        let len = snapshot.len();
        let mut slots: Vec<Option<Item>> = (0..len).map(|_| None).collect();
        let mut index = FxHashMap::with_capacity_and_hasher(len, Default::default());

        for entry in snapshot {
            if entry.index >= len {
                return Err(SnapshotError::IndexOutOfRange {
                    key: entry.key,
                    index: entry.index,
                    len,
                });
            }
            if index.contains_key(&entry.key) {
                return Err(SnapshotError::DuplicateKey { key: entry.key });
            }
            if slots[entry.index].is_some() {
                return Err(SnapshotError::DuplicateIndex { index: entry.index });
            }

            let mut item = Item::new(entry.key, entry.priority, entry.creation_time);
            item.set_index(entry.index);
            index.insert(item.key().to_string(), entry.index);
            slots[entry.index] = Some(item);
        }

        // Every slot is filled: len entries with distinct in-range indices.
        let mut queue = Self {
            heap: slots.into_iter().flatten().collect(),
            index,
        };
        queue.heapify();
        Ok(queue)
    }

    // ============== Heap internals ==============

    fn remove_at(&mut self, pos: usize) -> Option<Item> {
        if pos >= self.heap.len() {
            return None;
        }
        let last = self.heap.len() - 1;
        if pos != last {
            self.swap(pos, last);
        }
        let item = self.heap.pop()?;
        self.index.remove(item.key());
        if pos < self.heap.len() {
            self.fix(pos);
        }
        Some(item)
    }

    /// Restore heap order around `pos` after its item changed.
    #[inline]
    fn fix(&mut self, pos: usize) {
        if !self.sift_down(pos) {
            self.sift_up(pos);
        }
    }

    fn heapify(&mut self) {
        let len = self.heap.len();
        for pos in (0..len / 2).rev() {
            self.sift_down(pos);
        }
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.heap[pos].precedes(&self.heap[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    /// Returns whether the item moved.
    fn sift_down(&mut self, mut pos: usize) -> bool {
        let len = self.heap.len();
        let start = pos;
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut best = left;
            if right < len && self.heap[right].precedes(&self.heap[left]) {
                best = right;
            }
            if !self.heap[best].precedes(&self.heap[pos]) {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
        pos != start
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        for pos in [a, b] {
            self.heap[pos].set_index(pos);
            if let Some(slot) = self.index.get_mut(self.heap[pos].key()) {
                *slot = pos;
            }
        }
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
