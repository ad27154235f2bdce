//! WAL writer: the single serialization point for logged mutations.
//!
//! Callers [`submit`](WalWriter::submit) records from any thread. The writer
//! stamps each record with the next commit sequence number while holding the
//! queue lock, so queue order and sequence order are the same thing. A
//! dedicated `wal-writer` thread drains the queue in batches, appends each
//! batch to the [`LogStore`], syncs according to the [`SyncPolicy`], and then
//! wakes every submitter whose record is now resolved.
//!
//! ```text
//!            submit()                      wal-writer thread
//!  caller ──► assign seq ──► queue ──► drain batch ──► append ──► sync
//!    ▲                                                              │
//!    └──────────────── resolved_seq advanced, notify_all ◄──────────┘
//! ```
//!
//! # Stalls
//!
//! [`pause`](WalWriter::pause) moves the writer to `Stalled`: submissions are
//! still accepted and numbered, but nothing is drained until
//! [`resume`](WalWriter::resume). Submitters simply stay blocked; a stall is
//! never reported as an error. [`shutdown`](WalWriter::shutdown) is terminal:
//! it drains whatever is queued (even from a stall), acknowledges it, and
//! stops the thread. Later submissions fail with [`WalError::Closed`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use cairn_common::types::CommitSeq;

use crate::config::{SyncPolicy, WalConfig};
use crate::error::{WalError, WalResult};
use crate::record::types::WalRecord;
use crate::store::LogStore;

/// Running state of the WAL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Draining and persisting submitted records.
    Running,
    /// Accepting submissions but not persisting them.
    Stalled,
    /// Terminal: no new submissions are accepted.
    Shutdown,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// WAL writer statistics.
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Total bytes written.
    pub bytes_written: AtomicU64,
    /// Total records written.
    pub records_written: AtomicU64,
    /// Records that could not be persisted.
    pub records_failed: AtomicU64,
    /// Number of batches drained.
    pub batches: AtomicU64,
    /// Largest batch drained so far.
    pub max_batch: AtomicU64,
    /// Number of syncs performed.
    pub syncs: AtomicU64,
}

/// Queue state shared between submitters and the writer thread.
#[derive(Debug)]
struct Queue {
    state: WriterState,
    /// Sequenced records waiting to be persisted.
    pending: VecDeque<WalRecord>,
    /// Next sequence number to hand out.
    next_seq: CommitSeq,
    /// Every sequence up to and including this one is persisted or failed.
    resolved_seq: CommitSeq,
    /// Failure reasons for resolved sequences, removed by their submitter.
    failures: HashMap<CommitSeq, String>,
    /// Set once the writer thread has returned.
    exited: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    /// Wakes the writer thread.
    work: Condvar,
    /// Wakes submitters waiting for resolution.
    resolved: Condvar,
    stats: WriterStats,
    sync_policy: SyncPolicy,
    batch_size: usize,
}

/// The WAL writer.
pub struct WalWriter {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WalWriter {
    /// Starts the writer thread over `store`.
    ///
    /// Numbering continues after the last record already in the store.
    pub fn start(store: Box<dyn LogStore>, config: &WalConfig) -> WalResult<Self> {
        let last_seq = store.last_seq();
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                state: WriterState::Running,
                pending: VecDeque::new(),
                next_seq: last_seq.next(),
                resolved_seq: last_seq,
                failures: HashMap::new(),
                exited: false,
            }),
            work: Condvar::new(),
            resolved: Condvar::new(),
            stats: WriterStats::default(),
            sync_policy: config.sync_policy,
            batch_size: config.group_commit_batch_size.max(1),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("wal-writer".into())
            .spawn(move || run(thread_shared, store))?;

        info!(
            next_seq = %last_seq.next(),
            sync_policy = ?config.sync_policy,
            "WAL writer started"
        );

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Submits a record and blocks until it is persisted.
    ///
    /// Returns the commit sequence number assigned to the record. While the
    /// writer is stalled this call does not return until it is resumed (or
    /// shut down, which drains the queue first).
    pub fn submit(&self, mut record: WalRecord) -> WalResult<CommitSeq> {
        let shared = &self.shared;
        let mut queue = shared.queue.lock();

        if queue.state == WriterState::Shutdown {
            return Err(WalError::Closed);
        }

        let seq = queue.next_seq;
        queue.next_seq = seq.next();
        record.assign_seq(seq);
        queue.pending.push_back(record);
        shared.work.notify_one();

        while queue.resolved_seq < seq {
            shared.resolved.wait(&mut queue);
        }

        match queue.failures.remove(&seq) {
            Some(reason) => Err(WalError::PersistFailed { seq, reason }),
            None => Ok(seq),
        }
    }

    /// Stalls the writer. Queued and newly submitted records wait.
    ///
    /// A batch already being written when this is called still completes.
    pub fn pause(&self) {
        let mut queue = self.shared.queue.lock();
        if queue.state == WriterState::Running {
            queue.state = WriterState::Stalled;
            info!(queued = queue.pending.len(), "WAL writer paused");
        }
    }

    /// Resumes a stalled writer, which then drains the backlog in order.
    pub fn resume(&self) {
        let mut queue = self.shared.queue.lock();
        if queue.state == WriterState::Stalled {
            queue.state = WriterState::Running;
            info!(queued = queue.pending.len(), "WAL writer resumed");
            self.shared.work.notify_one();
        }
    }

    /// Shuts the writer down after draining the queue.
    ///
    /// Idempotent. Blocks until the writer thread has exited.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.state != WriterState::Shutdown {
                info!(queued = queue.pending.len(), "WAL writer shutting down");
                queue.state = WriterState::Shutdown;
            }
            self.shared.work.notify_one();
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("WAL writer thread panicked");
                self.fail_pending("WAL writer thread panicked");
            }
        }
    }

    /// Resolves everything still queued as failed.
    fn fail_pending(&self, reason: &str) {
        let mut queue = self.shared.queue.lock();
        let pending: Vec<WalRecord> = queue.pending.drain(..).collect();
        for record in pending {
            queue.failures.insert(record.seq(), reason.to_string());
        }
        queue.resolved_seq = queue.next_seq.prev();
        queue.exited = true;
        self.shared.resolved.notify_all();
    }

    /// Returns the current state.
    pub fn state(&self) -> WriterState {
        self.shared.queue.lock().state
    }

    /// Returns true while the writer thread is running.
    pub fn is_alive(&self) -> bool {
        !self.shared.queue.lock().exited
    }

    /// Returns the number of records waiting to be persisted.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }

    /// Returns the highest sequence number that has been resolved.
    pub fn resolved_seq(&self) -> CommitSeq {
        self.shared.queue.lock().resolved_seq
    }

    /// Returns the sequence number the next submission will get.
    pub fn next_seq(&self) -> CommitSeq {
        self.shared.queue.lock().next_seq
    }

    /// Returns writer statistics.
    pub fn stats(&self) -> &WriterStats {
        &self.shared.stats
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WalWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("WalWriter")
            .field("state", &queue.state)
            .field("queued", &queue.pending.len())
            .field("next_seq", &queue.next_seq)
            .field("resolved_seq", &queue.resolved_seq)
            .finish()
    }
}

/// Writer thread body.
fn run(shared: Arc<Shared>, mut store: Box<dyn LogStore>) {
    loop {
        let batch: Vec<WalRecord> = {
            let mut queue = shared.queue.lock();
            loop {
                match queue.state {
                    WriterState::Shutdown if queue.pending.is_empty() => {
                        queue.exited = true;
                        shared.resolved.notify_all();
                        info!(last_seq = %queue.resolved_seq, "WAL writer stopped");
                        return;
                    }
                    WriterState::Stalled => shared.work.wait(&mut queue),
                    _ if queue.pending.is_empty() => shared.work.wait(&mut queue),
                    _ => break,
                }
            }
            let n = queue.pending.len().min(shared.batch_size);
            queue.pending.drain(..n).collect()
        };

        let failures = persist_batch(&shared, store.as_mut(), &batch);

        let mut queue = shared.queue.lock();
        for (seq, reason) in failures {
            queue.failures.insert(seq, reason);
        }
        if let Some(last) = batch.last() {
            queue.resolved_seq = last.seq();
        }
        shared.resolved.notify_all();
    }
}

/// Writes one batch, returning the sequences that failed and why.
fn persist_batch(
    shared: &Shared,
    store: &mut dyn LogStore,
    batch: &[WalRecord],
) -> Vec<(CommitSeq, String)> {
    let stats = &shared.stats;
    let mut failures = Vec::new();
    let mut written = Vec::with_capacity(batch.len());

    for record in batch {
        let result = store.append(record).and_then(|bytes| {
            if shared.sync_policy.syncs_each_record() {
                store.sync()?;
                stats.syncs.fetch_add(1, Ordering::Relaxed);
            }
            Ok(bytes)
        });
        match result {
            Ok(bytes) => {
                stats.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
                written.push(record.seq());
            }
            Err(e) => {
                error!(seq = %record.seq(), error = %e, "failed to persist WAL record");
                failures.push((record.seq(), e.to_string()));
            }
        }
    }

    if shared.sync_policy.syncs_each_batch() && !written.is_empty() {
        match store.sync() {
            Ok(()) => {
                stats.syncs.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(records = written.len(), error = %e, "WAL group sync failed");
                let reason = format!("sync failed: {}", e);
                failures.extend(written.drain(..).map(|seq| (seq, reason.clone())));
            }
        }
    }

    stats
        .records_written
        .fetch_add(written.len() as u64, Ordering::Relaxed);
    stats
        .records_failed
        .fetch_add(failures.len() as u64, Ordering::Relaxed);
    stats.batches.fetch_add(1, Ordering::Relaxed);
    stats
        .max_batch
        .fetch_max(batch.len() as u64, Ordering::Relaxed);

    debug!(
        records = batch.len(),
        failed = failures.len(),
        "WAL batch persisted"
    );
    failures
}
