//! LRU Map Module
//!
//! Ordered associative structure backing the cache: a key index over a
//! slab-allocated doubly-linked recency list.
//!
//! ```text
//!   index: HashMap<K, usize>          slots: Vec<Option<Node>>
//!
//!   head (oldest) ─► [a] ◄──► [b] ◄──► [c] ◄── tail (newest)
//! ```
//!
//! Lookup, promotion, insertion, removal and eviction of the oldest key are
//! all O(1). Freed slots are recycled through a free list.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Map ==
/// Key→value map that remembers access order.
///
/// The head of the list is the least recently used key and the next eviction
/// candidate; the tail is the most recently used.
#[derive(Debug)]
pub struct LruMap<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> LruMap<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    // == Lookup ==
    /// Returns the value for `key` without changing recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.node(idx).map(|node| &node.value)
    }

    /// Returns a mutable reference to the value without changing recency.
    pub fn peek_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots
            .get_mut(idx)
            .and_then(Option::as_mut)
            .map(|node| &mut node.value)
    }

    // == Promote ==
    /// Moves `key` to the most recently used position.
    ///
    /// Returns false if the key is absent.
    pub fn promote<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => {
                if self.tail != Some(idx) {
                    self.detach(idx);
                    self.attach_tail(idx);
                }
                true
            }
            None => false,
        }
    }

    // == Insert ==
    /// Inserts `key` at the most recently used position.
    ///
    /// If the key already exists its value is replaced, it is promoted, and
    /// the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            let old = self
                .slots
                .get_mut(idx)
                .and_then(Option::as_mut)
                .map(|node| std::mem::replace(&mut node.value, value));
            if self.tail != Some(idx) {
                self.detach(idx);
                self.attach_tail(idx);
            }
            return old;
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.attach_tail(idx);
        None
    }

    // == Remove ==
    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.release(idx).map(|(_, value)| value)
    }

    // == Oldest ==
    /// Returns the least recently used entry without removing it.
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        self.head
            .and_then(|idx| self.node(idx))
            .map(|node| (&node.key, &node.value))
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        let idx = self.head?;
        let (key, value) = self.release(idx)?;
        self.index.remove(&key);
        Some((key, value))
    }

    // == Retain ==
    /// Keeps only the entries for which `keep` returns true, preserving order.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut doomed = Vec::new();
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = self.node(idx) else { break };
            if !keep(&node.key, &node.value) {
                doomed.push(idx);
            }
            cursor = node.next;
        }

        for idx in &doomed {
            if let Some((key, _)) = self.release(*idx) {
                self.index.remove(&key);
            }
        }
        doomed.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    // == Iteration ==
    /// Iterates from least to most recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            cursor: self.head,
        }
    }

    // == Internals ==
    fn node(&self, idx: usize) -> Option<&Node<K, V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_tail(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.slots[t].as_mut() {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Unlinks the slot and frees it. The caller keeps the index in sync.
    fn release(&mut self, idx: usize) -> Option<(K, V)> {
        self.detach(idx);
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some((node.key, node.value))
    }
}

impl<K, V> Default for LruMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over an [`LruMap`] from oldest to newest.
pub struct Iter<'a, K, V> {
    map: &'a LruMap<K, V>,
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let map = self.map;
        let node = map.node(self.cursor?)?;
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &LruMap<&'static str, i32>) -> Vec<&'static str> {
        map.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_lru_new() {
        let lru: LruMap<&str, i32> = LruMap::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert!(lru.peek_oldest().is_none());
    }

    #[test]
    fn test_lru_insert_order() {
        let mut lru = LruMap::new();

        lru.insert("key1", 1);
        lru.insert("key2", 2);
        lru.insert("key3", 3);

        assert_eq!(lru.len(), 3);
        // key1 is oldest (added first)
        assert_eq!(lru.peek_oldest(), Some((&"key1", &1)));
        assert_eq!(keys(&lru), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn test_lru_insert_existing_key_replaces_and_promotes() {
        let mut lru = LruMap::new();

        lru.insert("key1", 1);
        lru.insert("key2", 2);
        lru.insert("key3", 3);

        let old = lru.insert("key1", 10);

        assert_eq!(old, Some(1));
        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek(&"key1"), Some(&10));
        // key2 is now oldest
        assert_eq!(lru.peek_oldest(), Some((&"key2", &2)));
    }

    #[test]
    fn test_lru_pop_oldest() {
        let mut lru = LruMap::new();

        lru.insert("key1", 1);
        lru.insert("key2", 2);
        lru.insert("key3", 3);

        assert_eq!(lru.pop_oldest(), Some(("key1", 1)));
        assert_eq!(lru.len(), 2);
        assert!(!lru.contains_key(&"key1"));

        assert_eq!(lru.pop_oldest(), Some(("key2", 2)));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_pop_empty() {
        let mut lru: LruMap<&str, i32> = LruMap::new();
        assert_eq!(lru.pop_oldest(), None);
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruMap::new();

        lru.insert("key1", 1);
        lru.insert("key2", 2);
        lru.insert("key3", 3);

        assert_eq!(lru.remove(&"key2"), Some(2));
        assert_eq!(lru.remove(&"key2"), None);

        assert_eq!(lru.len(), 2);
        assert_eq!(keys(&lru), vec!["key1", "key3"]);
    }

    #[test]
    fn test_lru_order_after_multiple_promotions() {
        let mut lru = LruMap::new();

        lru.insert("a", 1);
        lru.insert("b", 2);
        lru.insert("c", 3);

        lru.promote(&"a");
        lru.promote(&"c");
        lru.promote(&"b");

        // oldest → newest: a, c, b
        assert_eq!(lru.pop_oldest(), Some(("a", 1)));
        assert_eq!(lru.pop_oldest(), Some(("c", 3)));
        assert_eq!(lru.pop_oldest(), Some(("b", 2)));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_promote_missing_key() {
        let mut lru = LruMap::new();
        lru.insert("a", 1);
        assert!(!lru.promote(&"missing"));
        assert_eq!(keys(&lru), vec!["a"]);
    }

    #[test]
    fn test_lru_peek_does_not_promote() {
        let mut lru = LruMap::new();
        lru.insert("a", 1);
        lru.insert("b", 2);

        assert_eq!(lru.peek(&"a"), Some(&1));
        if let Some(v) = lru.peek_mut(&"a") {
            *v = 5;
        }

        assert_eq!(lru.peek_oldest(), Some((&"a", &5)));
    }

    #[test]
    fn test_lru_slots_are_reused() {
        let mut lru = LruMap::new();
        lru.insert("a", 1);
        lru.insert("b", 2);
        lru.remove(&"a");
        lru.insert("c", 3);

        assert_eq!(lru.slots.len(), 2);
        assert_eq!(keys(&lru), vec!["b", "c"]);
    }

    #[test]
    fn test_lru_retain() {
        let mut lru = LruMap::new();
        for (i, k) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            lru.insert(k, i as i32);
        }

        let removed = lru.retain(|_, v| v % 2 == 0);

        assert_eq!(removed, 2);
        assert_eq!(keys(&lru), vec!["a", "c", "e"]);
        assert_eq!(lru.pop_oldest(), Some(("a", 0)));
    }

    #[test]
    fn test_lru_clear() {
        let mut lru = LruMap::new();
        lru.insert("a", 1);
        lru.insert("b", 2);

        lru.clear();

        assert!(lru.is_empty());
        assert!(lru.peek_oldest().is_none());
        lru.insert("c", 3);
        assert_eq!(keys(&lru), vec!["c"]);
    }

    #[test]
    fn test_lru_borrowed_lookup() {
        let mut lru: LruMap<String, i32> = LruMap::new();
        lru.insert("owned".to_string(), 7);
        assert_eq!(lru.peek("owned"), Some(&7));
        assert!(lru.promote("owned"));
        assert_eq!(lru.remove("owned"), Some(7));
    }
}
