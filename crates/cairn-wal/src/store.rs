//! Log stores: where the WAL writer puts records.
//!
//! The writer thread owns exactly one [`LogStore`]. [`SegmentedLog`] keeps
//! records in segment files on disk; [`MemoryLog`] keeps them in memory for
//! embedded use and tests, and can inject write failures.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info};

use cairn_common::types::CommitSeq;

use crate::config::WalConfig;
use crate::error::{WalError, WalResult};
use crate::reader::WalReader;
use crate::record::types::WalRecord;
use crate::segment::WalSegment;

/// Durable destination for WAL records.
pub trait LogStore: Send {
    /// Appends a sequenced record, returning the number of bytes written.
    fn append(&mut self, record: &WalRecord) -> WalResult<usize>;

    /// Makes every appended record durable.
    fn sync(&mut self) -> WalResult<()>;

    /// Returns the sequence number of the last appended record.
    fn last_seq(&self) -> CommitSeq;

    /// Reads back every stored record in commit order.
    fn read_all(&self) -> WalResult<Vec<WalRecord>>;
}

// =============================================================================
// SegmentedLog
// =============================================================================

/// File-backed log made of fixed-size segments.
pub struct SegmentedLog {
    config: WalConfig,
    /// Sealed segments followed by the active one.
    segments: Vec<WalSegment>,
    last_seq: CommitSeq,
}

impl SegmentedLog {
    /// Opens the log in `config.dir`, creating the directory if needed.
    ///
    /// Existing segments are scanned and a torn tail is truncated. New
    /// records continue in the last segment.
    pub fn open(config: WalConfig) -> WalResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.dir)?;

        let reader = WalReader::open(&config)?;
        let last_seq = reader.last_seq();
        let segments = reader.into_segments();

        info!(
            dir = %config.dir.display(),
            segments = segments.len(),
            last_seq = %last_seq,
            "opened segmented WAL"
        );

        Ok(Self {
            config,
            segments,
            last_seq,
        })
    }

    /// Returns the number of segment files.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    fn rotate(&mut self, first_seq: CommitSeq) -> WalResult<()> {
        let segment_id = match self.segments.last_mut() {
            Some(active) => {
                active.sync()?;
                active.seal();
                active.segment_id() + 1
            }
            None => 0,
        };
        let path = self.config.segment_path(segment_id);
        let segment = WalSegment::create(segment_id, &path, &self.config, first_seq)?;
        debug!(segment_id, first_seq = %first_seq, "rotated WAL segment");
        self.segments.push(segment);
        Ok(())
    }
}

impl LogStore for SegmentedLog {
    fn append(&mut self, record: &WalRecord) -> WalResult<usize> {
        let bytes = record.serialize()?;
        if bytes.len() > self.config.max_record_size {
            return Err(WalError::record_too_large(
                bytes.len(),
                self.config.max_record_size,
            ));
        }

        let needs_rotation = match self.segments.last() {
            None => true,
            Some(active) => !active.has_space_for(bytes.len()),
        };
        if needs_rotation {
            // Start after the last persisted record so sequences burned by
            // failed appends do not read back as a gap between segments.
            self.rotate(self.last_seq.next())?;
        }

        let active = self
            .segments
            .last_mut()
            .ok_or_else(|| WalError::segment_corrupted(record.seq(), "no active segment"))?;
        active.append(record.seq(), &bytes)?;
        self.last_seq = record.seq();
        Ok(bytes.len())
    }

    fn sync(&mut self) -> WalResult<()> {
        if let Some(active) = self.segments.last() {
            active.sync()?;
        }
        Ok(())
    }

    fn last_seq(&self) -> CommitSeq {
        self.last_seq
    }

    fn read_all(&self) -> WalResult<Vec<WalRecord>> {
        WalReader::read_segments(&self.segments, self.config.verify_checksums)
    }
}

impl std::fmt::Debug for SegmentedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedLog")
            .field("dir", &self.config.dir)
            .field("segments", &self.segments.len())
            .field("last_seq", &self.last_seq)
            .finish()
    }
}

// =============================================================================
// MemoryLog
// =============================================================================

#[derive(Debug, Default)]
struct MemoryLogInner {
    records: Vec<Bytes>,
    last_seq: CommitSeq,
    syncs: u64,
    /// Outcomes for upcoming appends; `true` fails the append.
    injected: VecDeque<bool>,
    /// Upcoming syncs that fail. The records stay in the log.
    failing_syncs: usize,
}

/// In-memory log.
///
/// Cloning yields another handle to the same storage, so a test can keep
/// one handle while the writer thread owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<MemoryLogInner>>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` appends fail with an I/O error.
    pub fn fail_next_appends(&self, count: usize) {
        let mut inner = self.inner.lock();
        inner.injected.extend(std::iter::repeat(true).take(count));
    }

    /// Makes the next `count` syncs fail with an I/O error.
    ///
    /// Records appended before a failed sync stay readable, like data that
    /// reached the page cache but was never confirmed on disk.
    pub fn fail_next_syncs(&self, count: usize) {
        self.inner.lock().failing_syncs += count;
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many times the log was synced.
    pub fn sync_count(&self) -> u64 {
        self.inner.lock().syncs
    }
}

impl LogStore for MemoryLog {
    fn append(&mut self, record: &WalRecord) -> WalResult<usize> {
        let mut inner = self.inner.lock();
        if inner.injected.pop_front().unwrap_or(false) {
            return Err(WalError::Io {
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }
        let bytes = record.serialize()?;
        let len = bytes.len();
        inner.records.push(bytes);
        inner.last_seq = record.seq();
        Ok(len)
    }

    fn sync(&mut self) -> WalResult<()> {
        let mut inner = self.inner.lock();
        if inner.failing_syncs > 0 {
            inner.failing_syncs -= 1;
            return Err(WalError::Io {
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected sync failure"),
            });
        }
        inner.syncs += 1;
        Ok(())
    }

    fn last_seq(&self) -> CommitSeq {
        self.inner.lock().last_seq
    }

    fn read_all(&self) -> WalResult<Vec<WalRecord>> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .map(|bytes| WalRecord::deserialize(bytes.as_ref()))
            .collect()
    }
}
