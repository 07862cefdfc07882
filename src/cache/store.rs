//! Frequency-Ordered Store Module
//!
//! Key-addressed entry storage plus a doubly-linked ordering of all entries
//! from highest frequency (head) to lowest (tail). Entries live in an arena
//! and link to each other by `EntryId`, so relinking stays O(1) without
//! shared ownership.

use std::collections::HashMap;

use crate::cache::{CacheEntry, EntryId};

// == Frequency Store ==
/// Entry storage ordered by non-increasing frequency from head to tail.
///
/// Every stored entry owns exactly one arena slot, one key-map slot and one
/// position in the ordering; `remove` and `evict_tail` drop all three.
#[derive(Debug, Default)]
pub struct FrequencyStore {
    /// Arena of entry slots, `None` = free
    slots: Vec<Option<CacheEntry>>,
    /// Reusable slot indices
    free: Vec<usize>,
    /// Key to slot lookup
    index: HashMap<String, EntryId>,
    /// Highest-frequency entry
    head: Option<EntryId>,
    /// Lowest-frequency entry, next eviction candidate
    tail: Option<EntryId>,
}

impl FrequencyStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Lookup ==
    /// Returns the handle of the entry stored under `key`.
    pub fn id_of(&self, key: &str) -> Option<EntryId> {
        self.index.get(key).copied()
    }

    pub fn get(&self, id: EntryId) -> Option<&CacheEntry> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Key of the current tail, i.e. the next entry `evict_tail` would remove.
    pub fn tail_key(&self) -> Option<&str> {
        self.tail
            .and_then(|id| self.get(id))
            .map(|entry| entry.key.as_str())
    }

    /// Keys from head (most frequent) to tail.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let entry = self.entry(id);
            keys.push(entry.key.clone());
            cursor = entry.next;
        }
        keys
    }

    // == Insert ==
    /// Stores a new entry at its frequency position.
    ///
    /// Scans from the tail toward the head past every entry whose frequency
    /// is `<=` the new one and links the entry right behind the first entry
    /// with a strictly greater frequency. Equal frequencies therefore end up
    /// behind the newcomer.
    ///
    /// The key must not already be stored; callers update existing entries
    /// in place.
    pub fn insert(&mut self, entry: CacheEntry) -> EntryId {
        debug_assert!(
            !self.contains(&entry.key),
            "key {:?} is already stored",
            entry.key
        );

        let frequency = entry.frequency;
        let key = entry.key.clone();
        let id = self.allocate(entry);
        self.index.insert(key, id);

        let mut cursor = self.tail;
        while let Some(candidate) = cursor {
            let node = self.entry(candidate);
            if node.frequency > frequency {
                break;
            }
            cursor = node.prev;
        }
        self.link_after(id, cursor);

        id
    }

    // == Promote ==
    /// Raises an entry's frequency and moves it toward the head.
    ///
    /// The entry passes every predecessor whose frequency is `<=` the new
    /// value. No-op when the predecessor already outranks it.
    pub fn promote(&mut self, id: EntryId, frequency: i64) {
        let Some(entry) = self.get_mut(id) else {
            return;
        };
        entry.frequency = frequency;
        let prev_before = entry.prev;

        let mut cursor = prev_before;
        while let Some(candidate) = cursor {
            let node = self.entry(candidate);
            if node.frequency > frequency {
                break;
            }
            cursor = node.prev;
        }

        if cursor != prev_before {
            self.unlink(id);
            self.link_after(id, cursor);
        }
    }

    // == Demote ==
    /// Lowers an entry's frequency and moves it toward the tail.
    ///
    /// The entry falls behind every successor whose frequency is `>=` the
    /// new value. No-op when the successor already ranks below it.
    pub fn demote(&mut self, id: EntryId, frequency: i64) {
        let Some(entry) = self.get_mut(id) else {
            return;
        };
        entry.frequency = frequency;
        let next_before = entry.next;

        let mut cursor = next_before;
        while let Some(candidate) = cursor {
            let node = self.entry(candidate);
            if node.frequency < frequency {
                break;
            }
            cursor = node.next;
        }

        if cursor != next_before {
            self.unlink(id);
            self.link_before(id, cursor);
        }
    }

    // == Remove ==
    /// Removes an entry from the ordering and the key map.
    pub fn remove(&mut self, id: EntryId) -> Option<CacheEntry> {
        self.get(id)?;
        self.unlink(id);
        let entry = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.index.remove(&entry.key);
        Some(entry)
    }

    /// Removes the entry stored under `key`.
    pub fn remove_key(&mut self, key: &str) -> Option<CacheEntry> {
        let id = self.id_of(key)?;
        self.remove(id)
    }

    // == Evict Tail ==
    /// Removes and returns the lowest-ranked entry.
    pub fn evict_tail(&mut self) -> Option<CacheEntry> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Linking ==
    /// Detaches an entry from its neighbors, fixing head and tail.
    fn unlink(&mut self, id: EntryId) {
        let (prev, next) = {
            let entry = self.entry_mut(id);
            (entry.prev.take(), entry.next.take())
        };

        match prev {
            Some(prev) => self.entry_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.entry_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Links a detached entry right behind `anchor`, or at the head when
    /// `anchor` is `None`.
    fn link_after(&mut self, id: EntryId, anchor: Option<EntryId>) {
        let next = match anchor {
            Some(anchor) => self.entry(anchor).next,
            None => self.head,
        };
        {
            let entry = self.entry_mut(id);
            entry.prev = anchor;
            entry.next = next;
        }
        match anchor {
            Some(anchor) => self.entry_mut(anchor).next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(next) => self.entry_mut(next).prev = Some(id),
            None => self.tail = Some(id),
        }
    }

    /// Links a detached entry right in front of `anchor`, or at the tail when
    /// `anchor` is `None`.
    fn link_before(&mut self, id: EntryId, anchor: Option<EntryId>) {
        let prev = match anchor {
            Some(anchor) => self.entry(anchor).prev,
            None => self.tail,
        };
        self.link_after(id, prev);
    }

    fn allocate(&mut self, entry: CacheEntry) -> EntryId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        }
    }

    // Linked ids always point at occupied slots.
    fn entry(&self, id: EntryId) -> &CacheEntry {
        match self.slots[id.0].as_ref() {
            Some(entry) => entry,
            None => unreachable!("ordering links to a free slot {}", id.0),
        }
    }

    fn entry_mut(&mut self, id: EntryId) -> &mut CacheEntry {
        match self.slots[id.0].as_mut() {
            Some(entry) => entry,
            None => unreachable!("ordering links to a free slot {}", id.0),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Payload;

    fn entry(key: &str, frequency: i64) -> CacheEntry {
        CacheEntry::new(key, Payload::new(key.to_string()), frequency, None)
    }

    fn store_with(entries: &[(&str, i64)]) -> FrequencyStore {
        let mut store = FrequencyStore::new();
        for (key, frequency) in entries {
            store.insert(entry(key, *frequency));
        }
        store
    }

    #[test]
    fn test_store_new() {
        let store = FrequencyStore::new();
        assert!(store.is_empty());
        assert_eq!(store.tail_key(), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_insert_orders_by_frequency() {
        let store = store_with(&[("a", 1), ("b", 5), ("c", 3), ("d", 0)]);

        assert_eq!(store.keys(), vec!["b", "c", "a", "d"]);
        assert_eq!(store.tail_key(), Some("d"));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_insert_places_newcomer_ahead_of_ties() {
        let store = store_with(&[("a", 0), ("b", 0), ("c", 0)]);

        // Oldest zero-frequency entry stays the eviction candidate
        assert_eq!(store.keys(), vec!["c", "b", "a"]);
        assert_eq!(store.tail_key(), Some("a"));

        let store = store_with(&[("x", 3), ("y", 2), ("z", 2)]);
        assert_eq!(store.keys(), vec!["x", "z", "y"]);
    }

    #[test]
    fn test_reinsert_after_remove_takes_new_position() {
        let mut store = store_with(&[("a", 1), ("b", 2)]);

        store.remove_key("a");
        store.insert(entry("a", 4));

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "already stored")]
    #[cfg(debug_assertions)]
    fn test_insert_duplicate_key_panics_in_debug() {
        let mut store = store_with(&[("a", 1)]);
        store.insert(entry("a", 2));
    }

    #[test]
    fn test_promote_moves_toward_head() {
        let mut store = store_with(&[("a", 3), ("b", 2), ("c", 1)]);

        let id = store.id_of("c").unwrap();
        store.promote(id, 3);

        assert_eq!(store.keys(), vec!["c", "a", "b"]);
        assert_eq!(store.tail_key(), Some("b"));
        assert_eq!(store.get(id).unwrap().frequency, 3);
    }

    #[test]
    fn test_promote_noop_when_ordered() {
        let mut store = store_with(&[("a", 5), ("b", 2), ("c", 1)]);

        let id = store.id_of("b").unwrap();
        store.promote(id, 4);

        assert_eq!(store.keys(), vec!["a", "b", "c"]);
        assert_eq!(store.get(id).unwrap().frequency, 4);
    }

    #[test]
    fn test_promote_tail_updates_tail() {
        let mut store = store_with(&[("a", 2), ("b", 1)]);

        let id = store.id_of("b").unwrap();
        store.promote(id, 2);

        assert_eq!(store.keys(), vec!["b", "a"]);
        assert_eq!(store.tail_key(), Some("a"));
    }

    #[test]
    fn test_demote_moves_toward_tail() {
        let mut store = store_with(&[("a", 3), ("b", 2), ("c", 1)]);

        let id = store.id_of("a").unwrap();
        store.demote(id, 1);

        // Falls behind "c" as well, since equal frequency yields
        assert_eq!(store.keys(), vec!["b", "c", "a"]);
        assert_eq!(store.tail_key(), Some("a"));
    }

    #[test]
    fn test_demote_stops_before_lower_frequency() {
        let mut store = store_with(&[("a", 5), ("b", 4), ("c", 3), ("d", 1)]);

        let id = store.id_of("a").unwrap();
        store.demote(id, 2);

        assert_eq!(store.keys(), vec!["b", "c", "a", "d"]);
        assert_eq!(store.tail_key(), Some("d"));
    }

    #[test]
    fn test_remove_middle_and_tail() {
        let mut store = store_with(&[("a", 3), ("b", 2), ("c", 1)]);

        let removed = store.remove_key("b").unwrap();
        assert_eq!(removed.key, "b");
        assert!(removed.prev.is_none() && removed.next.is_none());
        assert_eq!(store.keys(), vec!["a", "c"]);

        store.remove_key("c");
        assert_eq!(store.tail_key(), Some("a"));
        assert!(!store.contains("c"));

        store.remove_key("a");
        assert!(store.is_empty());
        assert_eq!(store.tail_key(), None);
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut store = store_with(&[("a", 1)]);
        assert!(store.remove_key("missing").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evict_tail() {
        let mut store = store_with(&[("a", 2), ("b", 0), ("c", 1)]);

        assert_eq!(store.evict_tail().map(|e| e.key), Some("b".to_string()));
        assert_eq!(store.evict_tail().map(|e| e.key), Some("c".to_string()));
        assert_eq!(store.evict_tail().map(|e| e.key), Some("a".to_string()));
        assert!(store.evict_tail().is_none());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut store = store_with(&[("a", 0), ("b", 0)]);

        let old = store.id_of("a").unwrap();
        store.remove(old);
        let new = store.insert(entry("c", 0));

        assert_eq!(old, new);
        assert_eq!(store.keys(), vec!["c", "b"]);
        assert!(store.get(new).is_some());
    }
}
