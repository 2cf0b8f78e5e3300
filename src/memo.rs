//! Write-once memo tables.
//!
//! Both engines memoise per `(key, expression)`: an entry, once written, is
//! never overwritten, so a later lookup always observes the first result.
//! Writing the same key twice is a bug in the caller and panics.

use std::collections::HashMap;
use std::hash::Hash;

/// A write-once memo backed by [HashMap].
pub struct Memo<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing was memoised yet.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of successful lookups.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of failed lookups.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash,
{
    /// Looks up an entry, counting the hit or miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let value = self.map.get(key);
        if value.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        value
    }

    /// Records the result for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` already has an entry.
    pub fn insert(&mut self, key: K, value: V) {
        let previous = self.map.insert(key, value);
        assert!(previous.is_none(), "Memo entry written twice");
    }

    /// Forgets an entry. Only used to roll back an aborted top-level call.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }
}
