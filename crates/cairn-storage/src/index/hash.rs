//! Hash index: point lookups only.

use std::collections::HashMap;
use std::sync::Arc;

use cairn_common::types::Tuple;

use crate::key::IndexKey;

/// Unordered index backed by a hash map.
#[derive(Debug, Default)]
pub struct HashIndex {
    map: HashMap<IndexKey, Arc<Tuple>>,
}

impl HashIndex {
    /// Creates an empty hash index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks up a key.
    pub fn get(&self, key: &IndexKey) -> Option<&Arc<Tuple>> {
        self.map.get(key)
    }

    /// Inserts an entry, returning the displaced one.
    pub fn insert(&mut self, key: IndexKey, tuple: Arc<Tuple>) -> Option<Arc<Tuple>> {
        self.map.insert(key, tuple)
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &IndexKey) -> Option<Arc<Tuple>> {
        self.map.remove(key)
    }
}
