//! Ordered map keyed by case-folded paths.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::utils;
use crate::error::{LookupError, LookupTarget};

/// A `BTreeMap` whose keys are paths folded to lower case before every lookup or insertion.
///
/// The target storage is case-insensitive, so `/Games/NES` and `/games/nes` are the same
/// entry. Keys iterate in lexicographic order of their folded form.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFoldedMap<V> {
    entries: BTreeMap<String, V>,
    target: LookupTarget, // reported by failed lookups
}

impl<V> CaseFoldedMap<V> {
    /// Creates an empty map whose failed lookups report `target`.
    pub fn new(target: LookupTarget) -> Self {
        Self {
            entries: BTreeMap::new(),
            target,
        }
    }

    /// Inserts `value` at the fold of `key`, replacing any previous value.
    pub fn add<K: AsRef<Path>>(&mut self, key: K, value: V) {
        self.entries.insert(utils::fold(key), value);
    }

    pub fn get<K: AsRef<Path>>(&self, key: K) -> Result<&V, LookupError> {
        let key = utils::fold(key);
        match self.entries.get(&key) {
            Some(value) => Ok(value),
            None => Err(LookupError::new(self.target, key)),
        }
    }

    pub fn get_mut<K: AsRef<Path>>(&mut self, key: K) -> Result<&mut V, LookupError> {
        let key = utils::fold(key);
        match self.entries.get_mut(&key) {
            Some(value) => Ok(value),
            None => Err(LookupError::new(self.target, key)),
        }
    }

    pub fn has<K: AsRef<Path>>(&self, key: K) -> bool {
        self.entries.contains_key(&utils::fold(key))
    }

    /// Removes the entry and returns its value.
    pub fn pop<K: AsRef<Path>>(&mut self, key: K) -> Result<V, LookupError> {
        let key = utils::fold(key);
        match self.entries.remove(&key) {
            Some(value) => Ok(value),
            None => Err(LookupError::new(self.target, key)),
        }
    }

    /// Folded keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for CaseFoldedMap<V> {
    fn default() -> Self {
        Self::new(LookupTarget::Entry)
    }
}
