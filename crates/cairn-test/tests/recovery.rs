//! Restart behavior over segment files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::thread;

use cairn_common::config::SpaceConfig;
use cairn_common::tuple;
use cairn_common::types::{Field, UpdateOp};
use cairn_server::{Database, ServerConfig};
use cairn_test::utils::{box_schema, wait_for_queued, SPACE};
use tempfile::TempDir;

fn key(n: u64) -> Vec<Field> {
    vec![Field::num(n)]
}

fn file_config(tmp: &TempDir, schema: Vec<SpaceConfig>) -> ServerConfig {
    let mut config = ServerConfig::builder()
        .data_dir(tmp.path())
        .segment_size(64 * 1024)
        .build();
    config.object_space = schema;
    config
}

#[test]
fn test_logged_survive_unlogged_do_not() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Database::open(&config).unwrap();
        db.insert(SPACE, tuple![1u64, "logged"]).unwrap();
        db.insert_nolog(SPACE, tuple![2u64, "unlogged"]).unwrap();
        db.upsert(SPACE, tuple![1u64, "logged again"]).unwrap();
        db.close();
    }

    let db = Database::open(&config).unwrap();
    assert_eq!(db.recovery_stats().applied, 2);
    assert_eq!(db.get(SPACE, &key(1)).unwrap().unwrap()[1], Field::str("logged again"));
    assert!(db.get(SPACE, &key(2)).unwrap().is_none());
}

#[test]
fn test_replay_skips_records_that_depended_on_unlogged_state() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Database::open(&config).unwrap();
        db.insert_nolog(SPACE, tuple![1u64, "unlogged"]).unwrap();
        db.update_fields(SPACE, key(1), vec![UpdateOp::set(1, "touched")]).unwrap();
        db.insert(SPACE, tuple![2u64, "kept"]).unwrap();
        db.close();
    }

    let db = Database::open(&config).unwrap();
    let recovery = db.recovery_stats();
    assert_eq!(recovery.applied, 1);
    assert_eq!(recovery.skipped, 1);
    assert_eq!(recovery.last_seq.as_u64(), 2);
    assert!(db.get(SPACE, &key(1)).unwrap().is_none());
    assert!(db.get(SPACE, &key(2)).unwrap().is_some());
}

#[test]
fn test_stalled_records_replay_in_commit_order() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Arc::new(Database::open(&config).unwrap());
        db.pause_wal();
        let mut handles = Vec::new();
        for (i, value) in ["a", "b", "c"].into_iter().enumerate() {
            let d = Arc::clone(&db);
            handles.push(thread::spawn(move || d.upsert(SPACE, tuple![7u64, value])));
            wait_for_queued(&db, i + 1);
        }
        db.resume_wal();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        db.close();
    }

    let db = Database::open(&config).unwrap();
    assert_eq!(db.recovery_stats().applied, 3);
    assert_eq!(db.get(SPACE, &key(7)).unwrap().unwrap()[1], Field::str("c"));
}

#[test]
fn test_torn_tail_is_dropped_on_restart() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Database::open(&config).unwrap();
        for n in 0..5u64 {
            db.insert(SPACE, tuple![n, "v"]).unwrap();
        }
        db.close();
    }

    let wal_dir = config.effective_wal_dir();
    let mut segments: Vec<_> = fs::read_dir(&wal_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    segments.sort();
    let last = segments.last().unwrap();
    let mut file = OpenOptions::new().append(true).open(last).unwrap();
    file.write_all(&[0xAB; 19]).unwrap();
    drop(file);

    let db = Database::open(&config).unwrap();
    assert_eq!(db.recovery_stats().applied, 5);
    assert_eq!(db.stats().tuples, 5);

    // The writer continues after the surviving records
    db.insert(SPACE, tuple![5u64, "v"]).unwrap();
    db.close();
    drop(db);
    let db = Database::open(&config).unwrap();
    assert_eq!(db.recovery_stats().applied, 6);
    assert_eq!(db.recovery_stats().last_seq.as_u64(), 6);
}

#[test]
fn test_insert_rejected_at_apply_stays_rejected_after_restart() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Arc::new(Database::open(&config).unwrap());
        db.pause_wal();
        let d = Arc::clone(&db);
        let logged = thread::spawn(move || d.insert(SPACE, tuple![7u64, "logged"]));
        wait_for_queued(&db, 1);
        db.insert_nolog(SPACE, tuple![7u64, "unlogged"]).unwrap();
        db.resume_wal();
        assert!(logged.join().unwrap().unwrap_err().is_conflict());
        db.close();
    }

    let db = Database::open(&config).unwrap();
    let recovery = db.recovery_stats();
    assert_eq!(recovery.applied, 0);
    assert_eq!(recovery.aborted, 1);
    assert!(db.get(SPACE, &key(7)).unwrap().is_none());
}

#[test]
fn test_update_rejected_at_apply_stays_rejected_after_restart() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    {
        let db = Arc::new(Database::open(&config).unwrap());
        db.insert(SPACE, tuple![1u64, "a"]).unwrap();
        db.pause_wal();

        // Moving the tuple to key 2 passes the check, then loses the key
        let d = Arc::clone(&db);
        let update = thread::spawn(move || {
            d.update_fields(SPACE, key(1), vec![UpdateOp::set(0, 2u64)])
        });
        wait_for_queued(&db, 1);
        db.insert_nolog(SPACE, tuple![2u64, "unlogged"]).unwrap();
        db.resume_wal();
        assert!(update.join().unwrap().unwrap_err().is_conflict());
        assert_eq!(db.get(SPACE, &key(1)).unwrap().unwrap()[1], Field::str("a"));
        db.close();
    }

    // Without the unlogged tuple the update would now succeed on replay
    let db = Database::open(&config).unwrap();
    let recovery = db.recovery_stats();
    assert_eq!(recovery.applied, 1);
    assert_eq!(recovery.aborted, 1);
    assert_eq!(db.get(SPACE, &key(1)).unwrap().unwrap()[1], Field::str("a"));
    assert!(db.get(SPACE, &key(2)).unwrap().is_none());
}

#[test]
fn test_acknowledged_outcomes_match_restarted_state() {
    let tmp = TempDir::new().unwrap();
    let config = file_config(&tmp, box_schema());
    let before: Vec<Option<String>>;
    {
        let db = Arc::new(Database::open(&config).unwrap());
        db.insert(SPACE, tuple![1u64, "one"]).unwrap();
        db.insert(SPACE, tuple![2u64, "two"]).unwrap();
        db.pause_wal();

        let d = Arc::clone(&db);
        let delete = thread::spawn(move || d.delete(SPACE, key(1)));
        wait_for_queued(&db, 1);
        let d = Arc::clone(&db);
        let update = thread::spawn(move || d.update_fields(SPACE, key(1), vec![UpdateOp::set(1, "x")]));
        wait_for_queued(&db, 2);
        let d = Arc::clone(&db);
        let replace = thread::spawn(move || d.replace(SPACE, tuple![2u64, "TWO"]));
        wait_for_queued(&db, 3);
        db.resume_wal();

        delete.join().unwrap().unwrap();
        assert!(update.join().unwrap().unwrap_err().is_not_found());
        replace.join().unwrap().unwrap();

        before = (1..=2u64)
            .map(|k| db.get(SPACE, &key(k)).unwrap().map(|t| t.to_string()))
            .collect();
        db.close();
    }

    let db = Database::open(&config).unwrap();
    let after: Vec<Option<String>> = (1..=2u64)
        .map(|k| db.get(SPACE, &key(k)).unwrap().map(|t| t.to_string()))
        .collect();
    assert_eq!(after, before);
    assert_eq!(db.recovery_stats().aborted, 1);
}
