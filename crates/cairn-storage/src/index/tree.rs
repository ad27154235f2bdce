//! Ordered index backed by a B-tree map.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use cairn_common::types::{Field, Tuple};

use crate::iterator::Direction;
use crate::key::IndexKey;

/// Ordered index supporting prefix lookups and directional scans.
#[derive(Debug, Default)]
pub struct TreeIndex {
    map: BTreeMap<IndexKey, Arc<Tuple>>,
}

impl TreeIndex {
    /// Creates an empty tree index.
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

    /// Looks up an exact entry key.
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

    /// Returns all tuples whose key starts with `prefix`, in key order.
    pub fn prefix(&self, prefix: &[Field]) -> Vec<Arc<Tuple>> {
        let start = IndexKey::new(prefix.to_vec());
        self.map
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, t)| Arc::clone(t))
            .collect()
    }

    /// Collects up to `limit` tuples after skipping `offset`.
    ///
    /// Forward scans start at the first key not less than `start`. Backward
    /// scans start at the last key that is not greater than `start` or has
    /// it as a prefix. An empty `start` means the first or last entry.
    pub fn scan(
        &self,
        start: &[Field],
        direction: Direction,
        offset: usize,
        limit: Option<usize>,
    ) -> Vec<Arc<Tuple>> {
        let take = limit.unwrap_or(usize::MAX);
        if take == 0 {
            return Vec::new();
        }
        let start = IndexKey::new(start.to_vec());
        match direction {
            Direction::Forward => {
                let lower = if start.fields().is_empty() {
                    Bound::Unbounded
                } else {
                    Bound::Included(start)
                };
                self.map
                    .range((lower, Bound::Unbounded))
                    .skip(offset)
                    .take(take)
                    .map(|(_, t)| Arc::clone(t))
                    .collect()
            }
            Direction::Backward => {
                let upper = match start.prefix_successor() {
                    Some(succ) => Bound::Excluded(succ),
                    None => Bound::Unbounded,
                };
                self.map
                    .range((Bound::Unbounded, upper))
                    .rev()
                    .skip(offset)
                    .take(take)
                    .map(|(_, t)| Arc::clone(t))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits() -> TreeIndex {
        let mut index = TreeIndex::new();
        for i in 0..10 {
            let s = i.to_string();
            let t = Arc::new(Tuple::new(vec![Field::str(&s), Field::num(i)]));
            index.insert(IndexKey::new(vec![Field::str(&s)]), t);
        }
        index
    }

    fn nums(tuples: &[Arc<Tuple>]) -> Vec<u64> {
        tuples.iter().filter_map(|t| t[1].as_num()).collect()
    }

    #[test]
    fn test_scan_forward_and_backward() {
        let index = digits();
        let five = [Field::str("5")];
        assert_eq!(
            nums(&index.scan(&five, Direction::Forward, 0, Some(5))),
            vec![5, 6, 7, 8, 9]
        );
        assert_eq!(
            nums(&index.scan(&five, Direction::Backward, 0, Some(5))),
            vec![5, 4, 3, 2, 1]
        );
        assert_eq!(nums(&index.scan(&five, Direction::Forward, 3, Some(5))), vec![8, 9]);
        assert_eq!(
            nums(&index.scan(&five, Direction::Backward, 3, Some(5))),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn test_scan_without_start() {
        let index = digits();
        assert_eq!(nums(&index.scan(&[], Direction::Forward, 0, Some(2))), vec![0, 1]);
        assert_eq!(nums(&index.scan(&[], Direction::Backward, 0, Some(2))), vec![9, 8]);
        assert_eq!(index.scan(&[], Direction::Forward, 0, None).len(), 10);
        assert!(index.scan(&[], Direction::Forward, 0, Some(0)).is_empty());
        assert!(index.scan(&[], Direction::Forward, 10, None).is_empty());
    }

    #[test]
    fn test_scan_missing_start_key() {
        let mut index = TreeIndex::new();
        for i in [10u64, 20, 30] {
            let t = Arc::new(Tuple::new(vec![Field::num(i)]));
            index.insert(IndexKey::new(vec![Field::num(i)]), t);
        }
        let start = [Field::num(25)];
        let fwd: Vec<u64> = index
            .scan(&start, Direction::Forward, 0, None)
            .iter()
            .filter_map(|t| t[0].as_num())
            .collect();
        let back: Vec<u64> = index
            .scan(&start, Direction::Backward, 0, None)
            .iter()
            .filter_map(|t| t[0].as_num())
            .collect();
        assert_eq!(fwd, vec![30]);
        assert_eq!(back, vec![20, 10]);
    }

    #[test]
    fn test_backward_partial_key_includes_prefix_group() {
        let mut index = TreeIndex::new();
        for (a, b) in [(1u64, 1u64), (1, 2), (2, 1), (2, 2), (3, 1)] {
            let t = Arc::new(Tuple::new(vec![Field::num(a), Field::num(b)]));
            index.insert(IndexKey::new(vec![Field::num(a), Field::num(b)]), t);
        }
        let got: Vec<(u64, u64)> = index
            .scan(&[Field::num(2)], Direction::Backward, 0, None)
            .iter()
            .map(|t| (t[0].as_num().unwrap(), t[1].as_num().unwrap()))
            .collect();
        assert_eq!(got, vec![(2, 2), (2, 1), (1, 2), (1, 1)]);

        assert_eq!(index.prefix(&[Field::num(1)]).len(), 2);
        assert!(index.prefix(&[Field::num(9)]).is_empty());
    }
}
