//! Directional iteration with offset and limit over a tree index.

use std::sync::Arc;

use cairn_common::tuple;
use cairn_common::types::{Field, Tuple};
use cairn_common::ErrorCode;
use cairn_server::Database;
use cairn_storage::{Direction, IteratorOptions};
use cairn_test::utils::{box_schema, memory_db, tree_str_schema, SPACE};

fn digits() -> Arc<Database> {
    let db = memory_db(&tree_str_schema());
    for d in 0..10 {
        db.insert(SPACE, tuple![d.to_string()]).unwrap();
    }
    db
}

fn scan(db: &Database, options: IteratorOptions) -> Vec<String> {
    db.iterator(SPACE, &options)
        .unwrap()
        .map(|t| t[0].as_str().unwrap().to_owned())
        .collect()
}

fn from(start: &str) -> IteratorOptions {
    IteratorOptions::new(0).with_start_key(vec![Field::str(start)])
}

#[test]
fn test_forward_from_key_with_limit() {
    let db = digits();
    let got = scan(&db, from("5").with_limit(5));
    assert_eq!(got, ["5", "6", "7", "8", "9"]);
}

#[test]
fn test_backward_from_key_with_limit() {
    let db = digits();
    let got = scan(&db, from("5").with_direction(Direction::Backward).with_limit(5));
    assert_eq!(got, ["5", "4", "3", "2", "1"]);
}

#[test]
fn test_offset_skips_from_start_key() {
    let db = digits();
    let forward = scan(&db, from("5").with_offset(3).with_limit(5));
    assert_eq!(forward, ["8", "9"]);

    let backward = scan(
        &db,
        from("5")
            .with_direction(Direction::Backward)
            .with_offset(3)
            .with_limit(5),
    );
    assert_eq!(backward, ["2", "1", "0"]);
}

#[test]
fn test_whole_index_both_directions() {
    let db = digits();
    let all: Vec<String> = (0..10).map(|d| d.to_string()).collect();
    assert_eq!(scan(&db, IteratorOptions::new(0)), all);

    let mut reversed = all;
    reversed.reverse();
    let got = scan(&db, IteratorOptions::new(0).with_direction(Direction::Backward));
    assert_eq!(got, reversed);
}

#[test]
fn test_start_key_between_entries() {
    let db = digits();
    // "45" sorts after "4" and before "5"
    assert_eq!(scan(&db, from("45").with_limit(2)), ["5", "6"]);
    assert_eq!(
        scan(&db, from("45").with_direction(Direction::Backward).with_limit(2)),
        ["4", "3"]
    );
    assert!(scan(&db, from("a")).is_empty());
}

#[test]
fn test_empty_index_and_zero_limit() {
    let db = memory_db(&tree_str_schema());
    assert!(scan(&db, IteratorOptions::new(0)).is_empty());
    assert!(scan(&db, from("5").with_direction(Direction::Backward)).is_empty());

    let db = digits();
    assert!(scan(&db, IteratorOptions::new(0).with_limit(0)).is_empty());
    assert!(scan(&db, IteratorOptions::new(0).with_offset(10)).is_empty());
}

#[test]
fn test_iterator_is_a_snapshot() {
    let db = digits();
    let iter = db.iterator(SPACE, &IteratorOptions::new(0)).unwrap();
    assert_eq!(iter.len(), 10);

    db.delete(SPACE, vec![Field::str("3")]).unwrap();
    db.insert(SPACE, tuple!["33"]).unwrap();

    let seen: Vec<Arc<Tuple>> = iter.collect();
    assert_eq!(seen.len(), 10);
    assert!(seen.iter().any(|t| t[0] == Field::str("3")));
    assert_eq!(db.iterator(SPACE, &IteratorOptions::new(0)).unwrap().len(), 10);
}

#[test]
fn test_iterator_option_errors() {
    let db = digits();
    let err = db.iterator(SPACE, &IteratorOptions::new(4)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexNotFound);

    let err = db
        .iterator(SPACE, &IteratorOptions::new(0).with_start_key(vec![Field::num(5)]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeMismatch);

    let hashed = memory_db(&box_schema());
    hashed.insert(SPACE, tuple![1u64, "a"]).unwrap();
    let err = hashed.iterator(SPACE, &IteratorOptions::new(0)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotSupported);
}
