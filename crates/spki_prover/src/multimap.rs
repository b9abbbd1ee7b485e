//! A map from keys to insertion-ordered sets of values.

use indexmap::IndexSet;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Key to set-of-values map. Inserting a value already present under a key
/// is a no-op.
#[derive(Debug, Clone)]
pub struct MultiMap<K, V> {
    map: HashMap<K, IndexSet<V>>,
}

impl<K, V> MultiMap<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Add `value` under `key`. Returns `false` if it was already there.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.map.entry(key).or_default().insert(value)
    }

    /// Values under `key`, in insertion order
    pub fn get<'a, Q>(&'a self, key: &Q) -> impl Iterator<Item = &'a V> + use<'a, K, V, Q>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).into_iter().flatten()
    }

    /// Whether any value is stored under `key`
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).is_some_and(|set| !set.is_empty())
    }

    /// Drop everything stored under `key`
    pub fn remove_key<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> MultiMap<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash + Clone,
{
    /// Owned copy of the values under `key`, for iterating while the map is
    /// being extended
    #[must_use]
    pub fn snapshot<Q>(&self, key: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get(key).cloned().collect()
    }
}

impl<K, V> Default for MultiMap<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
