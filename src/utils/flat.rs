//! Sorted-vector containers that allow duplicate keys.
//!
//! The standard library has no multiset or multimap. These keep their elements
//! in a sorted `Vec`; equal elements stay in insertion order, so iteration is
//! deterministic and serialized forms are stable.

use std::borrow::Borrow;

/// Sorted multiset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMultiSet<T> {
    items: Vec<T>,
}

impl<T> Default for FlatMultiSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Ord> FlatMultiSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after any equal elements
    pub fn insert(&mut self, value: T) {
        let at = self.items.partition_point(|item| item <= &value);
        self.items.insert(at, value);
    }

    /// Number of elements equal to `value`
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let start = self.items.partition_point(|item| Borrow::<Q>::borrow(item) < value);
        let end = self.items.partition_point(|item| Borrow::<Q>::borrow(item) <= value);
        end - start
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.count(value) > 0
    }
}

impl<T> FlatMultiSet<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Ord> FromIterator<T> for FlatMultiSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut items: Vec<T> = iter.into_iter().collect();
        // stable, so equal elements keep their order
        items.sort();
        Self { items }
    }
}

/// Sorted multimap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMultiMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for FlatMultiMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Ord, V> FlatMultiMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after any entries with an equal key
    pub fn insert(&mut self, key: K, value: V) {
        let at = self.entries.partition_point(|(k, _)| k <= &key);
        self.entries.insert(at, (key, value));
    }

    /// All values mapped from `key`, in insertion order
    pub fn get_all<'a, Q>(&'a self, key: &'a Q) -> impl Iterator<Item = &'a V> + 'a
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let start = self.entries.partition_point(|(k, _)| Borrow::<Q>::borrow(k) < key);
        self.entries[start..]
            .iter()
            .take_while(move |(k, _)| Borrow::<Q>::borrow(k) == key)
            .map(|(_, v)| v)
    }
}

impl<K, V> FlatMultiMap<K, V> {
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
