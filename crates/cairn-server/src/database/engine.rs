//! Main database engine.
//!
//! The `Database` struct is the top-level entry point for Cairn. It owns
//! the object spaces and the WAL writer and runs the mutation pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use cairn_common::config::SpaceConfig;
use cairn_common::types::{CommitSeq, Field, InsertMode, SpaceId, Tuple, UpdateOp};
use cairn_storage::{IteratorOptions, ObjectSpace, SpaceStats, TupleIterator};
use cairn_wal::{
    LogStore, MemoryLog, SegmentedLog, WalConfig, WalError, WalRecord, WalWriter, WriterState,
    WriterStats,
};

use super::error::{DatabaseError, DatabaseResult};
use super::mutation::{LogMode, Mutation};
use super::recovery::{self, RecoveryStats};
use super::sequencer::ApplySequencer;
use crate::config::ServerConfig;

/// Database statistics.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    /// Number of object spaces.
    pub spaces: usize,
    /// Live tuples across all spaces.
    pub tuples: usize,
    /// Logged mutations applied.
    pub logged: u64,
    /// Unlogged mutations applied.
    pub unlogged: u64,
    /// Mutations rejected or failed.
    pub failed: u64,
    /// Abort markers written for logged mutations that failed after
    /// their record was submitted.
    pub aborted: u64,
    /// Records replayed at startup.
    pub recovery: RecoveryStats,
    /// Uptime.
    pub uptime: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    logged: AtomicU64,
    unlogged: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
}

/// The main database engine.
pub struct Database {
    /// Object spaces by id. Fixed after open.
    spaces: HashMap<SpaceId, Arc<ObjectSpace>>,
    /// WAL writer thread.
    writer: WalWriter,
    /// Admits logged mutations to apply in commit order.
    sequencer: ApplySequencer,
    counters: Counters,
    recovery: RecoveryStats,
    started_at: Instant,
}

impl Database {
    /// Opens a database with the given configuration.
    ///
    /// With a file-backed WAL, existing records are replayed before the
    /// writer starts, and numbering continues after the last of them.
    pub fn open(config: &ServerConfig) -> DatabaseResult<Self> {
        config.validate()?;
        let spaces: Vec<SpaceConfig> = config.enabled_spaces().cloned().collect();
        let wal_config = config.wal_config();
        if config.wal.memory {
            Self::with_store(&spaces, Box::new(MemoryLog::new()), &wal_config)
        } else {
            let store = SegmentedLog::open(wal_config.clone())?;
            Self::with_store(&spaces, Box::new(store), &wal_config)
        }
    }

    /// Opens a database over an in-memory log.
    pub fn open_memory(spaces: &[SpaceConfig]) -> DatabaseResult<Self> {
        Self::with_store(spaces, Box::new(MemoryLog::new()), &WalConfig::default())
    }

    /// Opens a database over an existing log store.
    ///
    /// Records already in `store` are replayed first.
    pub fn with_store(
        spaces: &[SpaceConfig],
        store: Box<dyn LogStore>,
        wal_config: &WalConfig,
    ) -> DatabaseResult<Self> {
        let mut map = HashMap::with_capacity(spaces.len());
        for config in spaces {
            let space = ObjectSpace::new(config)?;
            if map.insert(config.id, Arc::new(space)).is_some() {
                return Err(cairn_common::CairnError::invalid_config(format!(
                    "object_space {} defined twice",
                    config.id
                ))
                .into());
            }
        }

        let records = store.read_all()?;
        let recovery = recovery::replay(&map, records);

        let writer = WalWriter::start(store, wal_config)?;
        let sequencer = ApplySequencer::new(writer.next_seq().prev());
        info!(
            spaces = map.len(),
            next_seq = %writer.next_seq(),
            "database opened"
        );

        Ok(Self {
            spaces: map,
            writer,
            sequencer,
            counters: Counters::default(),
            recovery,
            started_at: Instant::now(),
        })
    }

    /// Returns an object space.
    pub fn space(&self, space_id: SpaceId) -> DatabaseResult<&Arc<ObjectSpace>> {
        self.spaces
            .get(&space_id)
            .ok_or(DatabaseError::SpaceNotFound { space_id })
    }

    /// Returns the ids of all object spaces, sorted.
    pub fn space_ids(&self) -> Vec<SpaceId> {
        let mut ids: Vec<SpaceId> = self.spaces.keys().copied().collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Logged mutations
    // =========================================================================

    /// Inserts a tuple; fails with a conflict if the primary key exists.
    ///
    /// Blocks while the WAL writer is stalled.
    pub fn insert(&self, space_id: SpaceId, tuple: Tuple) -> DatabaseResult<Arc<Tuple>> {
        self.insert_with_mode(space_id, tuple, InsertMode::Add)
    }

    /// Replaces the tuple with the same primary key; fails if absent.
    pub fn replace(&self, space_id: SpaceId, tuple: Tuple) -> DatabaseResult<Arc<Tuple>> {
        self.insert_with_mode(space_id, tuple, InsertMode::Replace)
    }

    /// Inserts or replaces a tuple.
    pub fn upsert(&self, space_id: SpaceId, tuple: Tuple) -> DatabaseResult<Arc<Tuple>> {
        self.insert_with_mode(space_id, tuple, InsertMode::Upsert)
    }

    /// Inserts a tuple with an explicit insert mode.
    pub fn insert_with_mode(
        &self,
        space_id: SpaceId,
        tuple: Tuple,
        mode: InsertMode,
    ) -> DatabaseResult<Arc<Tuple>> {
        self.execute(space_id, Mutation::Insert { mode, tuple }, LogMode::Logged)
    }

    /// Applies field operations to the tuple at primary key `key`.
    ///
    /// Fails with not found if the tuple is gone by the time the update
    /// is applied.
    pub fn update_fields(
        &self,
        space_id: SpaceId,
        key: Vec<Field>,
        ops: Vec<UpdateOp>,
    ) -> DatabaseResult<Arc<Tuple>> {
        self.execute(space_id, Mutation::Update { key, ops }, LogMode::Logged)
    }

    /// Deletes the tuple at primary key `key` and returns it.
    pub fn delete(&self, space_id: SpaceId, key: Vec<Field>) -> DatabaseResult<Arc<Tuple>> {
        self.execute(space_id, Mutation::Delete { key }, LogMode::Logged)
    }

    // =========================================================================
    // Unlogged mutations
    // =========================================================================

    /// Inserts a tuple without writing the WAL.
    ///
    /// Never blocks on the writer, including while it is stalled. The tuple
    /// is lost on restart.
    pub fn insert_nolog(&self, space_id: SpaceId, tuple: Tuple) -> DatabaseResult<Arc<Tuple>> {
        self.execute(
            space_id,
            Mutation::Insert {
                mode: InsertMode::Add,
                tuple,
            },
            LogMode::Unlogged,
        )
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the tuple at primary key `key`.
    pub fn get(&self, space_id: SpaceId, key: &[Field]) -> DatabaseResult<Option<Arc<Tuple>>> {
        Ok(self.space(space_id)?.get(key)?)
    }

    /// Returns the tuples matching `keys` in `index`, in argument order.
    pub fn select(
        &self,
        space_id: SpaceId,
        index: usize,
        keys: &[Vec<Field>],
    ) -> DatabaseResult<Vec<Arc<Tuple>>> {
        Ok(self.space(space_id)?.select(index, keys)?)
    }

    /// Opens an iterator over an ordered index.
    ///
    /// The result window is copied when the iterator opens: one `Arc` clone
    /// per tuple, taken under the space read lock, so concurrent writers to
    /// the space wait for the copy. Skipped `offset` entries are walked but
    /// not cloned. Without a `limit` the window runs to the end of the index,
    /// so large scans should set one.
    pub fn iterator(
        &self,
        space_id: SpaceId,
        options: &IteratorOptions,
    ) -> DatabaseResult<TupleIterator> {
        Ok(self.space(space_id)?.iterator(options)?)
    }

    // =========================================================================
    // WAL control
    // =========================================================================

    /// Stalls the WAL writer. Logged mutations block until resumed.
    pub fn pause_wal(&self) {
        self.writer.pause();
    }

    /// Resumes the WAL writer.
    pub fn resume_wal(&self) {
        self.writer.resume();
    }

    /// Returns the writer state.
    pub fn wal_state(&self) -> WriterState {
        self.writer.state()
    }

    /// Returns true while the writer thread is running.
    pub fn is_wal_alive(&self) -> bool {
        self.writer.is_alive()
    }

    /// Returns the number of records waiting for the writer.
    pub fn wal_queued(&self) -> usize {
        self.writer.queued()
    }

    /// Shuts the writer down after draining its queue.
    ///
    /// Later logged mutations fail with `WriterUnavailable`.
    pub fn close(&self) {
        self.writer.shutdown();
        info!("database closed");
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns statistics of one space.
    pub fn space_stats(&self, space_id: SpaceId) -> DatabaseResult<SpaceStats> {
        Ok(self.space(space_id)?.stats())
    }

    /// Returns the writer statistics.
    pub fn writer_stats(&self) -> &WriterStats {
        self.writer.stats()
    }

    /// Returns the startup replay outcome.
    pub fn recovery_stats(&self) -> RecoveryStats {
        self.recovery
    }

    /// Returns database statistics.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            spaces: self.spaces.len(),
            tuples: self.spaces.values().map(|s| s.len()).sum(),
            logged: self.counters.logged.load(Ordering::Relaxed),
            unlogged: self.counters.unlogged.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            aborted: self.counters.aborted.load(Ordering::Relaxed),
            recovery: self.recovery,
            uptime: self.started_at.elapsed(),
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn execute(
        &self,
        space_id: SpaceId,
        mutation: Mutation,
        mode: LogMode,
    ) -> DatabaseResult<Arc<Tuple>> {
        let result = self.run(space_id, &mutation, mode);
        match &result {
            Ok(_) => {
                let counter = match mode {
                    LogMode::Logged => &self.counters.logged,
                    LogMode::Unlogged => &self.counters.unlogged,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    space = %space_id,
                    op = mutation.name(),
                    %mode,
                    error = %e,
                    "mutation failed"
                );
            }
        }
        result
    }

    fn run(&self, space_id: SpaceId, mutation: &Mutation, mode: LogMode) -> DatabaseResult<Arc<Tuple>> {
        let space = self.space(space_id)?;
        mutation.check(space)?;

        if mode == LogMode::Unlogged {
            return Ok(mutation.apply(space)?);
        }

        let seq = match self.writer.submit(mutation.to_record(space_id)) {
            Ok(seq) => seq,
            Err(WalError::PersistFailed { seq, reason }) => {
                // The sequence is burned; let later ones through.
                drop(self.sequencer.wait_turn(seq));
                error!(%seq, space = %space_id, op = mutation.name(), %reason, "WAL persist failed");
                // A failed sync can leave the record readable in the log
                self.abort(space_id, seq);
                return Err(WalError::PersistFailed { seq, reason }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let turn = self.sequencer.wait_turn(seq);
        let applied = mutation.apply(space);
        debug!(
            seq = %turn.seq(),
            space = %space_id,
            op = mutation.name(),
            ok = applied.is_ok(),
            "applied logged mutation"
        );
        drop(turn);

        match applied {
            Ok(tuple) => Ok(tuple),
            Err(e) => {
                self.abort(space_id, seq);
                Err(e.into())
            }
        }
    }

    /// Persists an abort marker so replay never applies the record at `seq`.
    ///
    /// Returns once the marker is durable, or after logging why it is not.
    /// The marker consumes a sequence number of its own, whose apply turn
    /// is passed on here.
    fn abort(&self, space_id: SpaceId, seq: CommitSeq) {
        let marker = match self.writer.submit(WalRecord::abort(space_id, seq)) {
            Ok(marker) => marker,
            Err(WalError::PersistFailed { seq: marker, reason }) => {
                drop(self.sequencer.wait_turn(marker));
                error!(%seq, %marker, %reason, "abort marker not persisted; record may replay after restart");
                return;
            }
            Err(e) => {
                warn!(%seq, error = %e, "abort marker not written; record may replay after restart");
                return;
            }
        };
        drop(self.sequencer.wait_turn(marker));
        self.counters.aborted.fetch_add(1, Ordering::Relaxed);
        debug!(%seq, %marker, space = %space_id, "recorded abort marker");
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("spaces", &self.space_ids())
            .field("writer", &self.writer)
            .field("applied", &self.sequencer.applied())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_common::config::IndexConfig;
    use cairn_common::tuple;
    use cairn_common::types::FieldType;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    const S0: SpaceId = SpaceId::new(0);

    fn schema() -> Vec<SpaceConfig> {
        vec![SpaceConfig::new(0, IndexConfig::hash(0, FieldType::Num))
            .with_index(IndexConfig::tree(1, FieldType::Str).with_unique(false))]
    }

    fn key(n: u64) -> Vec<Field> {
        vec![Field::num(n)]
    }

    fn wait_for_queued(db: &Database, n: usize) {
        for _ in 0..500 {
            if db.wal_queued() >= n {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("writer queue never reached {n}");
    }

    #[test]
    fn test_logged_crud() {
        let db = Database::open_memory(&schema()).unwrap();
        db.insert(S0, tuple![1u64, "foo"]).unwrap();
        assert!(db.insert(S0, tuple![1u64, "dup"]).unwrap_err().is_conflict());
        db.replace(S0, tuple![1u64, "bar"]).unwrap();
        db.upsert(S0, tuple![2u64, "baz"]).unwrap();
        let updated = db
            .update_fields(S0, key(2), vec![UpdateOp::splice(1, 2, 1, "r")])
            .unwrap();
        assert_eq!(updated[1], Field::str("bar"));
        assert_eq!(db.select(S0, 1, &[vec![Field::str("bar")]]).unwrap().len(), 2);

        let removed = db.delete(S0, key(1)).unwrap();
        assert_eq!(removed[0], Field::num(1));
        assert!(db.get(S0, &key(1)).unwrap().is_none());
        assert!(db.delete(S0, key(1)).unwrap_err().is_not_found());

        let stats = db.stats();
        assert_eq!(stats.logged, 5);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.tuples, 1);
        assert_eq!(db.writer_stats().records_written.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_rejected_mutations_skip_the_wal() {
        let log = MemoryLog::new();
        let db = Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap();
        db.insert(S0, tuple![1u64, "a"]).unwrap();
        assert!(db.insert(S0, tuple![1u64, "a"]).is_err());
        assert!(db.insert(S0, tuple!["bad", "a"]).is_err());
        assert!(db.update_fields(S0, key(9), vec![UpdateOp::add(0, 1)]).is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_unknown_space() {
        let db = Database::open_memory(&schema()).unwrap();
        let err = db.insert(SpaceId::new(9), tuple![1u64, "a"]).unwrap_err();
        assert!(matches!(err, DatabaseError::SpaceNotFound { .. }));
        assert!(db.get(SpaceId::new(9), &key(1)).is_err());
    }

    #[test]
    fn test_unlogged_insert_proceeds_while_stalled() {
        let db = Database::open_memory(&schema()).unwrap();
        db.pause_wal();
        assert_eq!(db.wal_state(), WriterState::Stalled);
        db.insert_nolog(S0, tuple![1u64, "nolog"]).unwrap();
        assert!(db.get(S0, &key(1)).unwrap().is_some());
        assert!(db.insert_nolog(S0, tuple![1u64, "again"]).unwrap_err().is_conflict());
        db.resume_wal();
        assert_eq!(db.stats().unlogged, 1);
    }

    #[test]
    fn test_logged_insert_blocks_until_resume() {
        let db = Arc::new(Database::open_memory(&schema()).unwrap());
        db.pause_wal();

        let d = Arc::clone(&db);
        let handle = thread::spawn(move || d.insert(S0, tuple![5u64, "late"]));
        wait_for_queued(&db, 1);
        assert!(!handle.is_finished());
        assert!(db.get(S0, &key(5)).unwrap().is_none());

        db.resume_wal();
        handle.join().unwrap().unwrap();
        assert!(db.get(S0, &key(5)).unwrap().is_some());
    }

    #[test]
    fn test_unlogged_insert_wins_over_queued_logged_insert() {
        let db = Arc::new(Database::open_memory(&schema()).unwrap());
        db.pause_wal();

        let d = Arc::clone(&db);
        let handle = thread::spawn(move || d.insert(S0, tuple![7u64, "logged"]));
        wait_for_queued(&db, 1);
        db.insert_nolog(S0, tuple![7u64, "unlogged"]).unwrap();
        db.resume_wal();

        let err = handle.join().unwrap().unwrap_err();
        assert!(err.is_conflict());
        let live = db.get(S0, &key(7)).unwrap().unwrap();
        assert_eq!(live[1], Field::str("unlogged"));
        assert_eq!(db.space_stats(S0).unwrap().tuples, 1);
    }

    #[test]
    fn test_close_makes_writer_unavailable() {
        let db = Database::open_memory(&schema()).unwrap();
        db.insert(S0, tuple![1u64, "a"]).unwrap();
        db.close();
        assert!(!db.is_wal_alive());
        assert_eq!(db.wal_state(), WriterState::Shutdown);
        let err = db.insert(S0, tuple![2u64, "b"]).unwrap_err();
        assert!(matches!(err, DatabaseError::WriterUnavailable));
        // Unlogged writes and reads keep working
        db.insert_nolog(S0, tuple![3u64, "c"]).unwrap();
        assert_eq!(db.get(S0, &key(1)).unwrap().unwrap()[1], Field::str("a"));
    }

    #[test]
    fn test_persist_failure_does_not_block_later_mutations() {
        let log = MemoryLog::new();
        let db = Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap();
        log.fail_next_appends(1);
        let err = db.insert(S0, tuple![1u64, "lost"]).unwrap_err();
        assert!(matches!(err, DatabaseError::Wal { .. }));
        assert!(db.get(S0, &key(1)).unwrap().is_none());

        db.insert(S0, tuple![1u64, "kept"]).unwrap();
        assert_eq!(db.get(S0, &key(1)).unwrap().unwrap()[1], Field::str("kept"));
    }

    #[test]
    fn test_failed_apply_writes_abort_marker() {
        let log = MemoryLog::new();
        let db = Arc::new(
            Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap(),
        );
        db.pause_wal();
        let d = Arc::clone(&db);
        let handle = thread::spawn(move || d.insert(S0, tuple![7u64, "logged"]));
        wait_for_queued(&db, 1);
        db.insert_nolog(S0, tuple![7u64, "unlogged"]).unwrap();
        db.resume_wal();
        assert!(handle.join().unwrap().unwrap_err().is_conflict());

        assert_eq!(db.stats().aborted, 1);
        assert_eq!(log.len(), 2);
        // Later logged mutations are not held up by the marker
        db.insert(S0, tuple![8u64, "next"]).unwrap();
        db.close();

        let db = Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap();
        let recovery = db.recovery_stats();
        assert_eq!(recovery.aborted, 1);
        assert_eq!(recovery.applied, 1);
        assert!(db.get(S0, &key(7)).unwrap().is_none());
        assert!(db.get(S0, &key(8)).unwrap().is_some());
    }

    #[test]
    fn test_failed_sync_writes_abort_marker() {
        let log = MemoryLog::new();
        let db = Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap();
        log.fail_next_syncs(1);
        let err = db.insert(S0, tuple![1u64, "unsynced"]).unwrap_err();
        assert!(matches!(err, DatabaseError::Wal { .. }));
        assert!(db.get(S0, &key(1)).unwrap().is_none());
        // The record reached the log before its sync failed
        assert_eq!(log.len(), 2);
        db.close();

        let db = Database::with_store(&schema(), Box::new(log.clone()), &WalConfig::default()).unwrap();
        assert_eq!(db.recovery_stats().aborted, 1);
        assert!(db.get(S0, &key(1)).unwrap().is_none());
    }

    #[test]
    fn test_recovery_from_segment_files() {
        let tmp = TempDir::new().unwrap();
        let config = ServerConfig::builder()
            .data_dir(tmp.path())
            .segment_size(64 * 1024)
            .build();
        let mut config = config;
        config.object_space = schema();

        {
            let db = Database::open(&config).unwrap();
            db.insert(S0, tuple![1u64, "a"]).unwrap();
            db.insert(S0, tuple![2u64, "b"]).unwrap();
            db.update_fields(S0, key(1), vec![UpdateOp::set(1, "z")]).unwrap();
            db.delete(S0, key(2)).unwrap();
            db.insert_nolog(S0, tuple![3u64, "gone"]).unwrap();
            db.close();
        }

        let db = Database::open(&config).unwrap();
        let recovery = db.recovery_stats();
        assert_eq!(recovery.applied, 4);
        assert_eq!(recovery.skipped, 0);
        assert_eq!(db.get(S0, &key(1)).unwrap().unwrap()[1], Field::str("z"));
        assert!(db.get(S0, &key(2)).unwrap().is_none());
        assert!(db.get(S0, &key(3)).unwrap().is_none());

        // Numbering continues after the replayed records
        db.insert(S0, tuple![4u64, "d"]).unwrap();
        drop(db);
        let db = Database::open(&config).unwrap();
        assert_eq!(db.recovery_stats().applied, 5);
        assert_eq!(db.stats().tuples, 2);
    }

    #[test]
    fn test_open_memory_config() {
        let mut config = ServerConfig::builder().memory_wal(true).build();
        config.object_space = schema();
        let db = Database::open(&config).unwrap();
        db.insert(S0, tuple![1u64, "a"]).unwrap();
        assert_eq!(db.space_ids(), vec![S0]);
    }
}
