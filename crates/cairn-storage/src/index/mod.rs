//! Indexes over tuples of one object space.
//!
//! Every index of a space stores the same `Arc<Tuple>`; two entries refer to
//! the same tuple exactly when the pointers are equal. Index 0 is the
//! primary index and is always unique.
//!
//! Non-unique tree indexes store each entry under the declared key followed
//! by the primary key, so entries stay distinct while a lookup by the
//! declared key is a prefix scan.

mod hash;
mod tree;

pub use hash::HashIndex;
pub use tree::TreeIndex;

use std::sync::Arc;

use cairn_common::config::{IndexConfig, IndexKind};
use cairn_common::types::{Field, Tuple};

use crate::error::{StorageError, StorageResult};
use crate::iterator::Direction;
use crate::key::{IndexKey, KeyDef, KeyPart};

/// Static description of an index.
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Position of the index within its space.
    pub index_no: usize,
    /// Index structure.
    pub kind: IndexKind,
    /// Whether declared keys are unique.
    pub unique: bool,
    /// Declared key.
    pub key_def: KeyDef,
    /// Key entries are stored under.
    entry_def: KeyDef,
}

impl IndexDef {
    /// Builds an index definition. `primary` is the primary key of the space.
    pub fn new(index_no: usize, config: &IndexConfig, primary: &KeyDef) -> Self {
        let key_def = KeyDef::new(config.key_field.iter().map(KeyPart::from).collect());
        let entry_def = if config.unique {
            key_def.clone()
        } else {
            key_def.extended(primary)
        };
        Self {
            index_no,
            kind: config.kind,
            unique: config.unique,
            key_def,
            entry_def,
        }
    }

    /// Returns the key definition entries are stored under.
    pub fn entry_def(&self) -> &KeyDef {
        &self.entry_def
    }
}

#[derive(Debug)]
enum Store {
    Hash(HashIndex),
    Tree(TreeIndex),
}

/// An index of an object space.
#[derive(Debug)]
pub struct Index {
    def: IndexDef,
    store: Store,
}

impl Index {
    /// Creates an empty index.
    pub fn new(def: IndexDef) -> Self {
        let store = match def.kind {
            IndexKind::Hash => Store::Hash(HashIndex::new()),
            IndexKind::Tree => Store::Tree(TreeIndex::new()),
        };
        Self { def, store }
    }

    /// Returns the index definition.
    pub fn def(&self) -> &IndexDef {
        &self.def
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        match &self.store {
            Store::Hash(h) => h.len(),
            Store::Tree(t) => t.len(),
        }
    }

    /// Returns true if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extracts the entry key of `tuple`.
    pub fn entry_key(&self, tuple: &Tuple) -> StorageResult<IndexKey> {
        self.def.entry_def.extract(tuple)
    }

    /// Returns the entry stored under exactly `key`.
    pub fn get(&self, key: &IndexKey) -> Option<&Arc<Tuple>> {
        match &self.store {
            Store::Hash(h) => h.get(key),
            Store::Tree(t) => t.get(key),
        }
    }

    /// Stores `tuple` under `key`, returning the entry it displaced.
    pub fn insert(&mut self, key: IndexKey, tuple: Arc<Tuple>) -> Option<Arc<Tuple>> {
        match &mut self.store {
            Store::Hash(h) => h.insert(key, tuple),
            Store::Tree(t) => t.insert(key, tuple),
        }
    }

    /// Removes the entry stored under `key`.
    pub fn remove(&mut self, key: &IndexKey) -> Option<Arc<Tuple>> {
        match &mut self.store {
            Store::Hash(h) => h.remove(key),
            Store::Tree(t) => t.remove(key),
        }
    }

    /// Returns every tuple whose declared key matches `key`.
    ///
    /// Tree indexes accept a prefix of the declared key; hash indexes need
    /// the full key.
    pub fn find(&self, key: &[Field]) -> StorageResult<Vec<Arc<Tuple>>> {
        match &self.store {
            Store::Hash(h) => {
                self.def.key_def.validate_key(key, false)?;
                Ok(h.get(&IndexKey::new(key.to_vec())).cloned().into_iter().collect())
            }
            Store::Tree(t) => {
                self.def.key_def.validate_key(key, true)?;
                Ok(t.prefix(key))
            }
        }
    }

    /// Collects tuples in key order starting at `start`.
    ///
    /// Fails on hash indexes, which have no order.
    pub fn scan(
        &self,
        start: &[Field],
        direction: Direction,
        offset: usize,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Arc<Tuple>>> {
        match &self.store {
            Store::Hash(_) => Err(StorageError::not_supported(format!(
                "range iteration over HASH index {}",
                self.def.index_no
            ))),
            Store::Tree(t) => {
                if !start.is_empty() {
                    self.def.key_def.validate_key(start, true)?;
                }
                Ok(t.scan(start, direction, offset, limit))
            }
        }
    }
}
