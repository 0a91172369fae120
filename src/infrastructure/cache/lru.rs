//! Capacity-bounded store with least-recently-used eviction
//!
//! A hash map keyed by canonical cache key points into an arena of nodes
//! forming a doubly linked list, head = most recently used, tail = least.
//! Links are arena indices rather than references, with a free list of
//! reclaimed slots, so relinking stays O(1) without reference cycles.
//!
//! Invariants after every operation: the map's key set equals the keys
//! reachable by walking head to tail, list length equals map length, and
//! length never exceeds capacity once `insert` returns.

use std::collections::HashMap;

use crate::domain::cache::ResponseEntry;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: String,
    entry: ResponseEntry,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
pub(crate) struct LruStore {
    map: HashMap<String, usize>,
    arena: Vec<Option<Node>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl LruStore {
    /// Creates a store holding at most `capacity` entries; a capacity of
    /// zero is coerced to 1 rather than rejected.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            map: HashMap::with_capacity(capacity.min(1024)),
            arena: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Reads an entry without touching recency
    pub fn peek(&self, key: &str) -> Option<&ResponseEntry> {
        self.map.get(key).map(|&idx| &self.node(idx).entry)
    }

    /// Reads an entry and promotes it to most recently used
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ResponseEntry> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        Some(&mut self.node_mut(idx).entry)
    }

    /// Inserts or replaces an entry at the most-recently-used position.
    /// Returns the evicted `(key, entry)` when the insert overflowed
    /// capacity.
    pub fn insert(&mut self, key: String, entry: ResponseEntry) -> Option<(String, ResponseEntry)> {
        if let Some(&idx) = self.map.get(&key) {
            self.node_mut(idx).entry = entry;
            self.move_to_front(idx);
            return None;
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            entry,
            prev: NIL,
            next: NIL,
        });
        self.map.insert(key, idx);
        self.push_front(idx);

        if self.map.len() > self.capacity {
            return self.evict_tail();
        }

        None
    }

    /// Detaches and returns the entry for `key`; no-op when absent
    pub fn remove(&mut self, key: &str) -> Option<ResponseEntry> {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        Some(self.release(idx).entry)
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.map.clear();
        self.arena.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Iterates entries most-recently-used first
    pub fn iter_recent(&self) -> impl Iterator<Item = (&str, &ResponseEntry)> {
        RecencyIter {
            store: self,
            cursor: self.head,
        }
    }

    fn evict_tail(&mut self) -> Option<(String, ResponseEntry)> {
        if self.tail == NIL {
            return None;
        }

        let idx = self.tail;
        self.detach(idx);
        let node = self.release(idx);
        self.map.remove(&node.key);
        Some((node.key, node.entry))
    }

    fn node(&self, idx: usize) -> &Node {
        self.arena[idx].as_ref().expect("lru arena slot occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.arena[idx].as_mut().expect("lru arena slot occupied")
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.arena[idx] = Some(node);
                idx
            }
            None => {
                self.arena.push(Some(node));
                self.arena.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Node {
        let node = self.arena[idx].take().expect("lru arena slot occupied");
        self.free.push(idx);
        node
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }

        let node = self.node_mut(idx);
        node.prev = NIL;
        node.next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }

        if old_head == NIL {
            self.tail = idx;
        } else {
            self.node_mut(old_head).prev = idx;
        }

        self.head = idx;
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }

        self.detach(idx);
        self.push_front(idx);
    }

    /// Walks the list and cross-checks it against the map
    #[cfg(test)]
    fn assert_invariants(&self) {
        let mut seen = 0usize;
        let mut cursor = self.head;
        let mut prev = NIL;

        while cursor != NIL {
            let node = self.node(cursor);
            assert_eq!(node.prev, prev, "back link mismatch at {}", node.key);
            assert_eq!(
                self.map.get(&node.key),
                Some(&cursor),
                "map does not point at list node for {}",
                node.key
            );
            prev = cursor;
            cursor = node.next;
            seen += 1;
        }

        assert_eq!(self.tail, prev, "tail does not match last list node");
        assert_eq!(seen, self.map.len(), "list length != map length");
        assert!(self.map.len() <= self.capacity, "store exceeded capacity");
    }
}

struct RecencyIter<'a> {
    store: &'a LruStore,
    cursor: usize,
}

impl<'a> Iterator for RecencyIter<'a> {
    type Item = (&'a str, &'a ResponseEntry);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }

        let node = self.store.node(self.cursor);
        self.cursor = node.next;
        Some((node.key.as_str(), &node.entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> ResponseEntry {
        ResponseEntry::new(key, format!("response for {}", key), "m1", 1_000, 60_000)
    }

    fn store_with(capacity: usize, keys: &[&str]) -> LruStore {
        let mut store = LruStore::new(capacity);
        for key in keys {
            store.insert(key.to_string(), entry(key));
            store.assert_invariants();
        }
        store
    }

    #[test]
    fn test_insert_and_peek() {
        let store = store_with(4, &["a", "b"]);
        assert_eq!(store.len(), 2);
        assert!(store.peek("a").is_some());
        assert!(store.peek("missing").is_none());
    }

    #[test]
    fn test_capacity_floor() {
        let store = LruStore::new(0);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut store = store_with(2, &["a", "b"]);

        let evicted = store.insert("c".to_string(), entry("c"));
        store.assert_invariants();

        assert_eq!(evicted.map(|(k, _)| k), Some("a".to_string()));
        assert_eq!(store.len(), 2);
        assert!(store.peek("a").is_none());
        assert!(store.peek("b").is_some());
        assert!(store.peek("c").is_some());
    }

    #[test]
    fn test_access_refreshes_recency() {
        let mut store = store_with(2, &["a", "b"]);

        // Touch "a"; "b" becomes the eviction candidate
        assert!(store.get_mut("a").is_some());
        store.assert_invariants();

        let evicted = store.insert("c".to_string(), entry("c"));
        assert_eq!(evicted.map(|(k, _)| k), Some("b".to_string()));
        assert!(store.peek("a").is_some());
        assert!(store.peek("c").is_some());
    }

    #[test]
    fn test_replace_moves_to_front() {
        let mut store = store_with(2, &["a", "b"]);

        // Re-setting "a" must not evict anything and must protect "a"
        let evicted = store.insert("a".to_string(), entry("a"));
        assert!(evicted.is_none());
        store.assert_invariants();

        let evicted = store.insert("c".to_string(), entry("c"));
        assert_eq!(evicted.map(|(k, _)| k), Some("b".to_string()));
    }

    #[test]
    fn test_remove_relinks_neighbors() {
        let mut store = store_with(4, &["a", "b", "c"]);

        assert!(store.remove("b").is_some());
        store.assert_invariants();
        assert_eq!(store.len(), 2);
        assert!(store.remove("b").is_none());

        let order: Vec<&str> = store.iter_recent().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["c", "a"]);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut store = store_with(4, &["a", "b", "c"]);

        assert!(store.remove("c").is_some()); // head
        store.assert_invariants();
        assert!(store.remove("a").is_some()); // tail
        store.assert_invariants();

        let order: Vec<&str> = store.iter_recent().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["b"]);
    }

    #[test]
    fn test_iter_recent_order() {
        let mut store = store_with(4, &["a", "b", "c"]);
        assert!(store.get_mut("a").is_some());

        let order: Vec<&str> = store.iter_recent().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_free_slots_are_reused() {
        let mut store = LruStore::new(2);

        // Churn well past capacity; the arena must not grow beyond
        // capacity + 1 slots (one transient slot during overflow insert)
        for i in 0..100 {
            store.insert(format!("k{}", i), entry("x"));
            store.assert_invariants();
        }

        assert!(store.arena.len() <= 3, "arena grew to {}", store.arena.len());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut store = store_with(4, &["a", "b"]);
        store.clear();
        store.assert_invariants();

        assert!(store.is_empty());
        assert!(store.peek("a").is_none());
        assert_eq!(store.iter_recent().count(), 0);

        // Still usable after clear
        store.insert("c".to_string(), entry("c"));
        store.assert_invariants();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_single_slot_store() {
        let mut store = LruStore::new(1);

        store.insert("a".to_string(), entry("a"));
        let evicted = store.insert("b".to_string(), entry("b"));
        store.assert_invariants();

        assert_eq!(evicted.map(|(k, _)| k), Some("a".to_string()));
        assert_eq!(store.len(), 1);
        assert!(store.peek("b").is_some());
    }
}
