use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A map bounded by insertion order, per spec.md §9: "LRU bounds, not
/// unbounded maps ... Evict by insertion order; do not pin memory to
/// long-lived ids." Updating an existing key's value does not move it —
/// only the id's first appearance determines eviction order, matching
/// `tracker/tracker.py::check_storages`'s `list(...)[:extra]` truncation
/// of whichever ids were registered first.
pub struct OrderedBoundedMap<K, V> {
    values: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> Default for OrderedBoundedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

impl<K, V> OrderedBoundedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        if !self.values.contains_key(&key) {
            self.order.push_back(key.clone());
            self.values.insert(key.clone(), make());
        }
        self.values.get_mut(&key).unwrap()
    }

    pub fn insert(&mut self, key: K, value: V) {
        if !self.values.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.values.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Evict the oldest-inserted entries until `len() <= cap`.
    pub fn evict_to_cap(&mut self, cap: usize) {
        while self.values.len() > cap {
            if let Some(oldest) = self.order.pop_front() {
                self.values.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut m: OrderedBoundedMap<u64, i32> = OrderedBoundedMap::default();
        for i in 0..5 {
            m.insert(i, i as i32);
        }
        m.evict_to_cap(3);
        assert_eq!(m.len(), 3);
        assert!(m.get(&0).is_none());
        assert!(m.get(&1).is_none());
        assert!(m.get(&4).is_some());
    }

    #[test]
    fn updating_existing_key_does_not_change_its_order() {
        let mut m: OrderedBoundedMap<u64, i32> = OrderedBoundedMap::default();
        m.insert(1, 10);
        m.insert(2, 20);
        m.insert(1, 11); // update, not reinsert
        m.evict_to_cap(1);
        // id 1 was inserted first, so it is evicted first despite the update.
        assert!(m.get(&1).is_none());
        assert_eq!(m.get(&2), Some(&20));
    }
}
