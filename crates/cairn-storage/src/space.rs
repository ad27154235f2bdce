//! Object spaces.
//!
//! An [`ObjectSpace`] owns the tuples of one space and all of its indexes.
//! Every mutation is planned against the current index state and then
//! applied to every index under one write lock, so readers observe either
//! the state before or after a mutation, never a partial one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use cairn_common::config::SpaceConfig;
use cairn_common::constants::{MAX_FIELD_SIZE, MAX_TUPLE_FIELDS};
use cairn_common::types::{Field, InsertMode, SpaceId, Tuple, UpdateOp};

use crate::error::{StorageError, StorageResult};
use crate::index::{Index, IndexDef};
use crate::iterator::{IteratorOptions, TupleIterator};
use crate::key::{IndexKey, KeyDef, KeyPart};
use crate::update::apply_ops;

/// Point-in-time statistics of a space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceStats {
    /// Number of live tuples.
    pub tuples: usize,
    /// Entry count of each index, by index number.
    pub index_entries: Vec<usize>,
    /// Successful inserts (any mode).
    pub inserts: u64,
    /// Successful field updates.
    pub updates: u64,
    /// Successful deletes.
    pub deletes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// A tuple with its entry key in every index.
struct Located {
    tuple: Arc<Tuple>,
    keys: Vec<IndexKey>,
}

/// A planned change: remove `old`, then add `new`.
struct Change {
    old: Option<Located>,
    new: Option<Located>,
}

/// A set of tuples with a schema and indexes.
pub struct ObjectSpace {
    id: SpaceId,
    cardinality: Option<usize>,
    indexes: RwLock<Vec<Index>>,
    counters: Counters,
}

impl ObjectSpace {
    /// Creates an empty space from a validated definition.
    pub fn new(config: &SpaceConfig) -> StorageResult<Self> {
        config.validate()?;
        let primary = config
            .primary()
            .ok_or_else(|| StorageError::malformed("space has no primary index"))?;
        let primary_def = KeyDef::new(primary.key_field.iter().map(KeyPart::from).collect());
        let indexes = config
            .index
            .iter()
            .enumerate()
            .map(|(no, ic)| Index::new(IndexDef::new(no, ic, &primary_def)))
            .collect();
        Ok(Self {
            id: config.id,
            cardinality: config.cardinality,
            indexes: RwLock::new(indexes),
            counters: Counters::default(),
        })
    }

    /// Returns the space id.
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// Returns the number of indexes.
    pub fn index_count(&self) -> usize {
        self.indexes.read().len()
    }

    /// Returns the number of live tuples.
    pub fn len(&self) -> usize {
        self.indexes.read().first().map_or(0, Index::len)
    }

    /// Returns true if the space holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks a tuple against the space schema.
    pub fn validate(&self, tuple: &Tuple) -> StorageResult<()> {
        let indexes = self.indexes.read();
        self.locate(&indexes, Arc::new(tuple.clone())).map(|_| ())
    }

    /// Checks the primary key shape of `key`.
    pub fn validate_key(&self, key: &[Field]) -> StorageResult<()> {
        let indexes = self.indexes.read();
        primary(&indexes)?.def().key_def.validate_key(key, false)
    }

    /// Checks that an insert would succeed against the current state.
    pub fn check_insert(&self, tuple: &Tuple, mode: InsertMode) -> StorageResult<()> {
        let indexes = self.indexes.read();
        self.plan_insert(&indexes, tuple.clone(), mode).map(|_| ())
    }

    /// Checks that an update would succeed against the current state.
    pub fn check_update(&self, key: &[Field], ops: &[UpdateOp]) -> StorageResult<()> {
        let indexes = self.indexes.read();
        self.plan_update(&indexes, key, ops).map(|_| ())
    }

    /// Checks that a delete would remove a tuple.
    pub fn check_delete(&self, key: &[Field]) -> StorageResult<()> {
        let indexes = self.indexes.read();
        match self.plan_delete(&indexes, key)? {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound),
        }
    }

    /// Inserts a tuple.
    ///
    /// `Add` fails with `DuplicateKey` if the primary key exists, `Replace`
    /// fails with `NotFound` if it does not, and `Upsert` does either. Any
    /// other unique index holding the key for a different tuple is a
    /// conflict in every mode. Returns the stored tuple.
    pub fn insert(&self, tuple: Tuple, mode: InsertMode) -> StorageResult<Arc<Tuple>> {
        let mut indexes = self.indexes.write();
        let change = self.plan_insert(&indexes, tuple, mode)?;
        let stored = apply(&mut indexes, change);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        debug!(space = %self.id, %mode, "tuple inserted");
        stored.ok_or_else(|| StorageError::malformed("insert produced no tuple"))
    }

    /// Applies field operations to the tuple at primary key `key`.
    ///
    /// Returns the new tuple version, or `NotFound`.
    pub fn update_fields(&self, key: &[Field], ops: &[UpdateOp]) -> StorageResult<Arc<Tuple>> {
        let mut indexes = self.indexes.write();
        let change = self.plan_update(&indexes, key, ops)?;
        let stored = apply(&mut indexes, change);
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        debug!(space = %self.id, ops = ops.len(), "tuple updated");
        stored.ok_or_else(|| StorageError::malformed("update produced no tuple"))
    }

    /// Removes the tuple at primary key `key` from every index.
    pub fn delete(&self, key: &[Field]) -> StorageResult<Option<Arc<Tuple>>> {
        let mut indexes = self.indexes.write();
        let Some(old) = self.plan_delete(&indexes, key)? else {
            return Ok(None);
        };
        let tuple = Arc::clone(&old.tuple);
        apply(
            &mut indexes,
            Change {
                old: Some(old),
                new: None,
            },
        );
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        debug!(space = %self.id, "tuple deleted");
        Ok(Some(tuple))
    }

    /// Returns the tuple at primary key `key`.
    pub fn get(&self, key: &[Field]) -> StorageResult<Option<Arc<Tuple>>> {
        self.lookup(0, key)
    }

    /// Returns the first tuple matching the full key `key` in `index`.
    pub fn lookup(&self, index: usize, key: &[Field]) -> StorageResult<Option<Arc<Tuple>>> {
        let indexes = self.indexes.read();
        let index = self.index(&indexes, index)?;
        index.def().key_def.validate_key(key, false)?;
        Ok(index.find(key)?.into_iter().next())
    }

    /// Returns tuples matching any of `keys` in `index`, in argument order.
    ///
    /// On tree indexes a key may be a prefix of the index key.
    pub fn select(&self, index: usize, keys: &[Vec<Field>]) -> StorageResult<Vec<Arc<Tuple>>> {
        let indexes = self.indexes.read();
        let index = self.index(&indexes, index)?;
        let mut out = Vec::new();
        for key in keys {
            out.extend(index.find(key)?);
        }
        Ok(out)
    }

    /// Opens an iterator over an ordered index.
    ///
    /// Clones an `Arc` for every tuple in the window while holding the read
    /// lock. Cost is linear in `offset` plus the window size.
    pub fn iterator(&self, options: &IteratorOptions) -> StorageResult<TupleIterator> {
        let indexes = self.indexes.read();
        let index = self.index(&indexes, options.index)?;
        let tuples = index.scan(
            &options.start_key,
            options.direction,
            options.offset,
            options.limit,
        )?;
        Ok(TupleIterator::new(tuples, options.direction))
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> SpaceStats {
        let indexes = self.indexes.read();
        SpaceStats {
            tuples: indexes.first().map_or(0, Index::len),
            index_entries: indexes.iter().map(Index::len).collect(),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    fn index<'a>(&self, indexes: &'a [Index], no: usize) -> StorageResult<&'a Index> {
        indexes.get(no).ok_or(StorageError::IndexNotFound {
            space_id: self.id,
            index: no,
        })
    }

    /// Validates `tuple` and extracts its key in every index.
    fn locate(&self, indexes: &[Index], tuple: Arc<Tuple>) -> StorageResult<Located> {
        if tuple.is_empty() {
            return Err(StorageError::malformed("tuple has no fields"));
        }
        if tuple.len() > MAX_TUPLE_FIELDS {
            return Err(StorageError::malformed(format!(
                "tuple has {} fields, limit is {MAX_TUPLE_FIELDS}",
                tuple.len()
            )));
        }
        if let Some(cardinality) = self.cardinality {
            if tuple.len() != cardinality {
                return Err(StorageError::malformed(format!(
                    "tuple has {} fields, space {} requires {cardinality}",
                    tuple.len(),
                    self.id
                )));
            }
        }
        if let Some(pos) = tuple.fields().iter().position(|f| f.size() > MAX_FIELD_SIZE) {
            return Err(StorageError::malformed(format!(
                "field {pos} exceeds {MAX_FIELD_SIZE} bytes"
            )));
        }
        let keys = indexes
            .iter()
            .map(|index| index.entry_key(&tuple))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Located { tuple, keys })
    }

    /// Finds the stored tuple at primary key `key`.
    fn find_primary(&self, indexes: &[Index], key: &[Field]) -> StorageResult<Option<Located>> {
        let pk = primary(indexes)?;
        pk.def().key_def.validate_key(key, false)?;
        match pk.get(&IndexKey::new(key.to_vec())) {
            Some(tuple) => self.locate(indexes, Arc::clone(tuple)).map(Some),
            None => Ok(None),
        }
    }

    /// Fails if a unique index maps the new tuple's key to a tuple other
    /// than the one being replaced.
    fn check_unique(
        &self,
        indexes: &[Index],
        new: &Located,
        old: Option<&Located>,
    ) -> StorageResult<()> {
        for (index, key) in indexes.iter().zip(&new.keys) {
            if !index.def().unique {
                continue;
            }
            if let Some(existing) = index.get(key) {
                let replaced = old.is_some_and(|o| Arc::ptr_eq(&o.tuple, existing));
                if !replaced {
                    return Err(StorageError::DuplicateKey {
                        index: index.def().index_no,
                    });
                }
            }
        }
        Ok(())
    }

    fn plan_insert(
        &self,
        indexes: &[Index],
        tuple: Tuple,
        mode: InsertMode,
    ) -> StorageResult<Change> {
        let new = self.locate(indexes, Arc::new(tuple))?;
        let pk_fields = new.keys[0].fields().to_vec();
        let old = self.find_primary(indexes, &pk_fields)?;
        match (mode, &old) {
            (InsertMode::Add, Some(_)) => return Err(StorageError::DuplicateKey { index: 0 }),
            (InsertMode::Replace, None) => return Err(StorageError::NotFound),
            _ => {}
        }
        self.check_unique(indexes, &new, old.as_ref())?;
        Ok(Change {
            old,
            new: Some(new),
        })
    }

    fn plan_update(&self, indexes: &[Index], key: &[Field], ops: &[UpdateOp]) -> StorageResult<Change> {
        let old = self
            .find_primary(indexes, key)?
            .ok_or(StorageError::NotFound)?;
        let updated = apply_ops(&old.tuple, ops)?;
        let new = self.locate(indexes, Arc::new(updated))?;
        self.check_unique(indexes, &new, Some(&old))?;
        Ok(Change {
            old: Some(old),
            new: Some(new),
        })
    }

    fn plan_delete(&self, indexes: &[Index], key: &[Field]) -> StorageResult<Option<Located>> {
        self.find_primary(indexes, key)
    }
}

fn primary(indexes: &[Index]) -> StorageResult<&Index> {
    indexes
        .first()
        .ok_or_else(|| StorageError::malformed("space has no primary index"))
}

/// Applies a planned change to every index. Returns the new tuple.
fn apply(indexes: &mut [Index], change: Change) -> Option<Arc<Tuple>> {
    if let Some(old) = change.old {
        for (index, key) in indexes.iter_mut().zip(&old.keys) {
            index.remove(key);
        }
    }
    let new = change.new?;
    for (index, key) in indexes.iter_mut().zip(new.keys) {
        index.insert(key, Arc::clone(&new.tuple));
    }
    Some(new.tuple)
}

impl fmt::Debug for ObjectSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpace")
            .field("id", &self.id)
            .field("cardinality", &self.cardinality)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::Direction;
    use cairn_common::config::IndexConfig;
    use cairn_common::error::ErrorCode;
    use cairn_common::tuple;
    use cairn_common::types::FieldType;

    fn space() -> ObjectSpace {
        let config = SpaceConfig::new(0, IndexConfig::hash(0, FieldType::Num))
            .with_index(IndexConfig::tree(1, FieldType::Str));
        ObjectSpace::new(&config).unwrap()
    }

    fn key(id: u64) -> Vec<Field> {
        vec![Field::num(id)]
    }

    #[test]
    fn test_insert_and_get() {
        let s = space();
        s.insert(tuple![3u64, "baz"], InsertMode::Add).unwrap();
        let got = s.get(&key(3)).unwrap().unwrap();
        assert_eq!(got.to_string(), r#"[3, "baz"]"#);
        assert!(s.get(&key(4)).unwrap().is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_insert_modes() {
        let s = space();
        assert!(matches!(
            s.insert(tuple![1u64, "a"], InsertMode::Replace),
            Err(StorageError::NotFound)
        ));
        s.insert(tuple![1u64, "a"], InsertMode::Add).unwrap();
        assert!(matches!(
            s.insert(tuple![1u64, "b"], InsertMode::Add),
            Err(StorageError::DuplicateKey { index: 0 })
        ));
        s.insert(tuple![1u64, "b"], InsertMode::Replace).unwrap();
        s.insert(tuple![1u64, "c"], InsertMode::Upsert).unwrap();
        s.insert(tuple![2u64, "d"], InsertMode::Upsert).unwrap();

        assert_eq!(s.len(), 2);
        // The replaced secondary key is gone
        assert!(s.select(1, &[vec![Field::str("a")]]).unwrap().is_empty());
        assert_eq!(s.select(1, &[vec![Field::str("c")]]).unwrap().len(), 1);
        assert_eq!(s.stats().index_entries, vec![2, 2]);
    }

    #[test]
    fn test_secondary_unique_conflict() {
        let s = space();
        s.insert(tuple![1u64, "same"], InsertMode::Add).unwrap();
        let err = s.insert(tuple![2u64, "same"], InsertMode::Add).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { index: 1 }));
        // A failed insert leaves no entries behind
        assert_eq!(s.stats().index_entries, vec![1, 1]);
        assert!(s.check_insert(&tuple![2u64, "other"], InsertMode::Add).is_ok());
    }

    #[test]
    fn test_validation() {
        let s = space();
        assert!(matches!(
            s.insert(tuple![1u64], InsertMode::Add),
            Err(StorageError::FieldMissing { fieldno: 1 })
        ));
        let err = s.insert(tuple!["x", "y"], InsertMode::Add).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
        assert!(s.insert(Tuple::default(), InsertMode::Add).is_err());
        assert!(s.get(&[Field::str("1")]).is_err());
        assert!(s.validate(&tuple![1u64, "ok", 5u64]).is_ok());

        let config = SpaceConfig::new(1, IndexConfig::tree(0, FieldType::Num)).with_cardinality(2);
        let fixed = ObjectSpace::new(&config).unwrap();
        assert!(fixed.insert(tuple![1u64], InsertMode::Add).is_err());
        assert!(fixed.insert(tuple![1u64, 2u64, 3u64], InsertMode::Add).is_err());
        assert!(fixed.insert(tuple![1u64, 2u64], InsertMode::Add).is_ok());
    }

    #[test]
    fn test_delete_then_lookup() {
        let s = space();
        s.insert(tuple![1u64, "a"], InsertMode::Add).unwrap();
        let removed = s.delete(&key(1)).unwrap().unwrap();
        assert_eq!(removed[1], Field::str("a"));
        assert!(s.get(&key(1)).unwrap().is_none());
        assert!(s.select(1, &[vec![Field::str("a")]]).unwrap().is_empty());
        assert!(s.delete(&key(1)).unwrap().is_none());
        assert!(matches!(s.check_delete(&key(1)), Err(StorageError::NotFound)));
        assert_eq!(s.stats().deletes, 1);
    }

    #[test]
    fn test_update_fields() {
        let s = space();
        s.insert(tuple![3u64, "bar"], InsertMode::Add).unwrap();
        let updated = s
            .update_fields(&key(3), &[UpdateOp::splice(1, 0, 3, "baz")])
            .unwrap();
        assert_eq!(updated.to_string(), r#"[3, "baz"]"#);
        assert!(matches!(
            s.update_fields(&key(9), &[UpdateOp::set(1, "x")]),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn test_update_moves_primary_key() {
        let s = space();
        s.insert(tuple![3u64, "bar"], InsertMode::Add).unwrap();
        let moved = s.update_fields(&key(3), &[UpdateOp::set(0, 1u64)]).unwrap();
        assert_eq!(moved[0], Field::num(1));
        assert!(s.get(&key(3)).unwrap().is_none());
        assert!(s.get(&key(1)).unwrap().is_some());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_update_key_conflict() {
        let s = space();
        s.insert(tuple![1u64, "foo"], InsertMode::Add).unwrap();
        s.insert(tuple![3u64, "bar"], InsertMode::Add).unwrap();
        let err = s.update_fields(&key(3), &[UpdateOp::set(0, 1u64)]).unwrap_err();
        assert!(err.is_conflict());
        let err = s.update_fields(&key(3), &[UpdateOp::set(1, "foo")]).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { index: 1 }));
        // Rewriting a tuple's own key is not a conflict
        assert!(s.update_fields(&key(3), &[UpdateOp::set(1, "bar")]).is_ok());
        assert_eq!(s.get(&key(3)).unwrap().unwrap()[1], Field::str("bar"));
    }

    #[test]
    fn test_update_revalidates() {
        let s = space();
        s.insert(tuple![1u64, "a"], InsertMode::Add).unwrap();
        assert!(matches!(
            s.update_fields(&key(1), &[UpdateOp::delete(1)]),
            Err(StorageError::FieldMissing { fieldno: 1 })
        ));
        assert!(matches!(
            s.check_update(&key(1), &[UpdateOp::add(1, 1)]),
            Err(StorageError::InvalidArgument { .. })
        ));
        assert_eq!(s.get(&key(1)).unwrap().unwrap()[1], Field::str("a"));
    }

    #[test]
    fn test_select_multi_key_order() {
        let s = space();
        for (id, name) in [(1u64, "foo"), (2, "bar"), (3, "baz")] {
            s.insert(tuple![id, name], InsertMode::Add).unwrap();
        }
        let got = s.select(0, &[key(3), key(7), key(1)]).unwrap();
        let ids: Vec<_> = got.iter().map(|t| t[0].clone()).collect();
        assert_eq!(ids, vec![Field::num(3), Field::num(1)]);
        assert!(matches!(
            s.select(5, &[key(1)]),
            Err(StorageError::IndexNotFound { index: 5, .. })
        ));
        assert_eq!(s.lookup(1, &[Field::str("bar")]).unwrap().unwrap()[0], Field::num(2));
    }

    #[test]
    fn test_non_unique_secondary() {
        let config = SpaceConfig::new(2, IndexConfig::tree(0, FieldType::Num))
            .with_index(IndexConfig::tree(1, FieldType::Str).with_unique(false));
        let s = ObjectSpace::new(&config).unwrap();
        for (id, group) in [(1u64, "x"), (2, "y"), (3, "x")] {
            s.insert(tuple![id, group], InsertMode::Add).unwrap();
        }
        let xs = s.select(1, &[vec![Field::str("x")]]).unwrap();
        assert_eq!(xs.len(), 2);
        s.update_fields(&key(1), &[UpdateOp::set(1, "y")]).unwrap();
        assert_eq!(s.select(1, &[vec![Field::str("y")]]).unwrap().len(), 2);
        assert_eq!(s.stats().index_entries, vec![3, 3]);
    }

    #[test]
    fn test_iterator_over_digits() {
        let config = SpaceConfig::new(3, IndexConfig::tree(0, FieldType::Num))
            .with_index(IndexConfig::tree(1, FieldType::Str));
        let s = ObjectSpace::new(&config).unwrap();
        for i in 0..10u64 {
            s.insert(tuple![i, i.to_string()], InsertMode::Add).unwrap();
        }
        let collect = |opts: IteratorOptions| -> Vec<u64> {
            s.iterator(&opts)
                .unwrap()
                .filter_map(|t| t[0].as_num())
                .collect()
        };
        let start = vec![Field::str("5")];
        assert_eq!(
            collect(IteratorOptions::new(1).with_start_key(start.clone()).with_limit(5)),
            vec![5, 6, 7, 8, 9]
        );
        assert_eq!(
            collect(
                IteratorOptions::new(1)
                    .with_start_key(start.clone())
                    .with_direction(Direction::Backward)
                    .with_limit(5)
            ),
            vec![5, 4, 3, 2, 1]
        );
        assert_eq!(
            collect(
                IteratorOptions::new(1)
                    .with_start_key(start)
                    .with_direction(Direction::Backward)
                    .with_offset(3)
                    .with_limit(5)
            ),
            vec![2, 1, 0]
        );
        assert!(s
            .iterator(&IteratorOptions::new(1).with_start_key(vec![Field::num(5)]))
            .is_err());
    }

    #[test]
    fn test_iterator_snapshot_survives_delete() {
        let config = SpaceConfig::new(4, IndexConfig::tree(0, FieldType::Num));
        let s = ObjectSpace::new(&config).unwrap();
        for i in 0..3u64 {
            s.insert(tuple![i, "v"], InsertMode::Add).unwrap();
        }
        let mut it = s.iterator(&IteratorOptions::new(0)).unwrap();
        let first = it.next().unwrap();
        s.delete(&key(0)).unwrap();
        s.delete(&key(1)).unwrap();
        assert_eq!(first[0], Field::num(0));
        assert_eq!(it.next().unwrap()[0], Field::num(1));
        assert_eq!(it.next().unwrap()[0], Field::num(2));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_iterator_clones_only_its_window() {
        let config = SpaceConfig::new(6, IndexConfig::tree(0, FieldType::Num));
        let s = ObjectSpace::new(&config).unwrap();
        for i in 0..100u64 {
            s.insert(tuple![i, "v"], InsertMode::Add).unwrap();
        }
        let skipped = s.get(&key(10)).unwrap().unwrap();
        let inside = s.get(&key(90)).unwrap().unwrap();
        let (skipped_refs, inside_refs) = (Arc::strong_count(&skipped), Arc::strong_count(&inside));

        let it = s
            .iterator(&IteratorOptions::new(0).with_offset(90).with_limit(5))
            .unwrap();
        assert_eq!(it.len(), 5);
        assert_eq!(Arc::strong_count(&skipped), skipped_refs);
        assert_eq!(Arc::strong_count(&inside), inside_refs + 1);
        drop(it);
        assert_eq!(Arc::strong_count(&inside), inside_refs);

        // Without a limit the window runs to the end of the index
        let it = s.iterator(&IteratorOptions::new(0).with_offset(90)).unwrap();
        assert_eq!(it.len(), 10);
    }

    #[test]
    fn test_iterator_empty_space() {
        let config = SpaceConfig::new(5, IndexConfig::tree(0, FieldType::Num));
        let s = ObjectSpace::new(&config).unwrap();
        let mut it = s
            .iterator(&IteratorOptions::new(0).with_direction(Direction::Backward))
            .unwrap();
        assert!(it.next().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SpaceConfig::new(0, IndexConfig::hash(0, FieldType::Num).with_unique(false));
        assert!(matches!(ObjectSpace::new(&config), Err(StorageError::Config { .. })));
    }

    #[test]
    fn test_random_ops_match_model() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::BTreeMap;

        let config = SpaceConfig::new(6, IndexConfig::tree(0, FieldType::Num))
            .with_index(IndexConfig::tree(1, FieldType::Num).with_unique(false));
        let s = ObjectSpace::new(&config).unwrap();
        let mut model: BTreeMap<u64, u64> = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..2000 {
            let id = rng.gen_range(0..64u64);
            let group = rng.gen_range(0..8u64);
            match rng.gen_range(0..3) {
                0 => {
                    let res = s.insert(tuple![id, group], InsertMode::Add);
                    assert_eq!(res.is_ok(), !model.contains_key(&id));
                    model.entry(id).or_insert(group);
                }
                1 => {
                    let res = s.delete(&key(id)).unwrap();
                    assert_eq!(res.is_some(), model.remove(&id).is_some());
                }
                _ => {
                    let res = s.update_fields(&key(id), &[UpdateOp::set(1, group)]);
                    match model.get_mut(&id) {
                        Some(g) => {
                            assert!(res.is_ok());
                            *g = group;
                        }
                        None => assert!(matches!(res, Err(StorageError::NotFound))),
                    }
                }
            }
        }

        assert_eq!(s.stats().index_entries, vec![model.len(), model.len()]);
        let all: Vec<u64> = s
            .iterator(&IteratorOptions::new(0))
            .unwrap()
            .filter_map(|t| t[0].as_num())
            .collect();
        assert_eq!(all, model.keys().copied().collect::<Vec<_>>());
        for g in 0..8u64 {
            let expected = model.values().filter(|&&v| v == g).count();
            assert_eq!(s.select(1, &[vec![Field::num(g)]]).unwrap().len(), expected);
        }
    }
}
