//! Insertion-ordered associative container
//!
//! The standard container for every modeled mapping. Entries live in a slab
//! and are doubly linked, so iteration runs oldest→newest or newest→oldest
//! without touching the key table. Re-setting an existing key updates the
//! value in place and keeps the entry's position.

use ahash::AHashMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered map with O(1) get/set/delete and bidirectional iteration
#[derive(Clone)]
pub struct OrderedMap<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    index: AHashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: AHashMap::new(),
            head: None,
            tail: None,
            free: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
            head: None,
            tail: None,
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Oldest entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.head.and_then(|slot| self.pair_at(slot))
    }

    /// Newest entry.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tail.and_then(|slot| self.pair_at(slot))
    }

    fn pair_at(&self, slot: usize) -> Option<(&K, &V)> {
        self.slots[slot].as_ref().map(|e| (&e.key, &e.value))
    }

    /// Forward iteration in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Iteration that stops cooperatively once `cancel` is raised.
    ///
    /// Entries already yielded stay yielded; the stream simply ends early.
    pub fn iter_cancellable<'a>(
        &'a self,
        cancel: &'a AtomicBool,
    ) -> impl Iterator<Item = (&'a K, &'a V)> {
        self.iter()
            .take_while(move |_| !cancel.load(Ordering::Relaxed))
    }
}

impl<K: Hash + Eq, V> OrderedMap<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_mut().map(|e| &mut e.value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.pair_at(slot)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Remove an entry, unlinking it from the iteration order.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.index.remove(key)?;
        let entry = self.slots[slot].take()?;
        match entry.prev {
            Some(prev) => {
                if let Some(p) = self.slots[prev].as_mut() {
                    p.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => {
                if let Some(n) = self.slots[next].as_mut() {
                    n.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }
        self.free.push(slot);
        Some(entry.value)
    }
}

impl<K: Hash + Eq + Clone, V> OrderedMap<K, V> {
    /// Insert or update.
    ///
    /// An existing key keeps its position; only the value changes. Returns
    /// the previous value, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            let entry = self.slots[slot].as_mut()?;
            return Some(std::mem::replace(&mut entry.value, value));
        }
        let entry = Entry {
            key: key.clone(),
            value,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        match self.tail {
            Some(tail) => {
                if let Some(t) = self.slots[tail].as_mut() {
                    t.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(key, slot);
        None
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Hash + Eq + Clone, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

impl<K: Hash + Eq + Clone, V> Extend<(K, V)> for OrderedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Double-ended iterator over entries in insertion order
pub struct Iter<'a, K, V> {
    map: &'a OrderedMap<K, V>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        let entry = self.map.slots[slot].as_ref()?;
        self.front = entry.next;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        let entry = self.map.slots[slot].as_ref()?;
        self.back = entry.prev;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor<K, V>(std::marker::PhantomData<(K, V)>);

        impl<'de, K, V> Visitor<'de> for MapVisitor<K, V>
        where
            K: Deserialize<'de> + Hash + Eq + Clone,
            V: Deserialize<'de>,
        {
            type Value = OrderedMap<K, V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry()? {
                    map.set(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor(std::marker::PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> OrderedMap<String, i32> {
        let mut map = OrderedMap::new();
        map.set("one".to_string(), 1);
        map.set("two".to_string(), 2);
        map.set("three".to_string(), 3);
        map
    }

    #[test]
    fn test_insertion_order_survives_iteration() {
        let map = sample();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_reverse_iteration() {
        let map = sample();
        let keys: Vec<_> = map.iter().rev().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_set_existing_keeps_position() {
        let mut map = sample();
        assert_eq!(map.set("two".to_string(), 22), Some(2));
        let entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(
            entries,
            vec![
                ("one".to_string(), 1),
                ("two".to_string(), 22),
                ("three".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_delete_unlinks_and_reuses_slot() {
        let mut map = sample();
        assert_eq!(map.delete("two"), Some(2));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("two"), None);

        map.set("four".to_string(), 4);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["one", "three", "four"]);
    }

    #[test]
    fn test_delete_head_and_tail() {
        let mut map = sample();
        map.delete("one");
        map.delete("three");
        assert_eq!(map.first(), map.last());
        assert_eq!(map.first(), Some((&"two".to_string(), &2)));
    }

    #[test]
    fn test_cancellable_iteration_stops() {
        let map = sample();
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        for (key, _) in map.iter_cancellable(&cancel) {
            seen.push(key.clone());
            cancel.store(true, Ordering::Relaxed);
        }
        assert_eq!(seen, vec!["one"]);
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let map = sample();
        let json = serde_json::to_string(&map).unwrap();
        let back: OrderedMap<String, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
        let keys: Vec<_> = back.keys().cloned().collect();
        assert_eq!(keys, vec!["one", "two", "three"]);
    }
}
