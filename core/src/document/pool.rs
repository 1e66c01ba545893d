//! Creation-ordered entity storage

use slotmap::{Key, SlotMap};

/// A slot map that also remembers insertion order.
///
/// Keys are generational, so a key that outlives its entity never resolves to
/// a newer one.
#[derive(Debug, Clone)]
pub(crate) struct Pool<K: Key, V> {
    items: SlotMap<K, V>,
    order: Vec<K>,
}

impl<K: Key, V> Pool<K, V> {
    pub fn new() -> Self {
        Self {
            items: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: V) -> K {
        let key = self.items.insert(value);
        self.order.push(key);
        key
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let value = self.items.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.items.get_mut(key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.items.contains_key(key)
    }

    /// Live keys in creation order.
    pub fn keys(&self) -> &[K] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
