//! Commit log settings.
//!
//! [`WalConfig`] is shared by the segment store and the writer thread. The
//! store reads the layout fields (directory, segment and record sizes); the
//! writer reads the durability fields (sync policy, batch size).

use std::path::{Path, PathBuf};

use cairn_common::constants::{
    DEFAULT_WAL_SEGMENT_SIZE, GROUP_COMMIT_BATCH_SIZE, MAX_WAL_RECORD_SIZE,
};

use crate::error::{WalError, WalResult};

/// Smallest accepted segment file.
pub const MIN_SEGMENT_SIZE: usize = 64 * 1024;

const SEGMENT_PREFIX: &str = "wal_";
const SEGMENT_EXTENSION: &str = "log";

/// When the writer forces persisted records to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// fsync after each record, before the next one is appended.
    EveryWrite,
    /// One fsync per drained batch, before any submitter in it is released.
    #[default]
    GroupCommit,
    /// Leave flushing to the OS. Acknowledged records may be lost on crash.
    Never,
}

impl SyncPolicy {
    /// Returns true if every append is followed by its own sync.
    #[inline]
    pub fn syncs_each_record(self) -> bool {
        self == Self::EveryWrite
    }

    /// Returns true if a batch ends with a single sync.
    #[inline]
    pub fn syncs_each_batch(self) -> bool {
        self == Self::GroupCommit
    }
}

/// Layout and durability settings of the commit log.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Directory holding `wal_<id>.log` segment files.
    pub dir: PathBuf,
    /// A segment is rotated once an append would push it past this size.
    pub segment_size: usize,
    /// Largest encoded payload a single mutation may produce.
    pub max_record_size: usize,
    /// See [`SyncPolicy`].
    pub sync_policy: SyncPolicy,
    /// Records the writer takes off its queue per batch.
    pub group_commit_batch_size: usize,
    /// Checks record CRCs when segments are read back.
    pub verify_checksums: bool,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/wal"),
            segment_size: DEFAULT_WAL_SEGMENT_SIZE,
            max_record_size: MAX_WAL_RECORD_SIZE,
            sync_policy: SyncPolicy::default(),
            group_commit_batch_size: GROUP_COMMIT_BATCH_SIZE,
            verify_checksums: true,
        }
    }
}

impl WalConfig {
    /// Creates a configuration rooted at `dir` with default sizes.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Sets the segment size.
    #[must_use]
    pub fn with_segment_size(mut self, size: usize) -> Self {
        self.segment_size = size;
        self
    }

    /// Sets the maximum record size.
    #[must_use]
    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    /// Sets the sync policy.
    #[must_use]
    pub fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    /// Sets how many queued records one batch may take.
    #[must_use]
    pub fn with_group_commit_batch_size(mut self, size: usize) -> Self {
        self.group_commit_batch_size = size;
        self
    }

    /// Sets whether checksums are verified on read.
    #[must_use]
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Checks that the sizes fit together.
    ///
    /// A record must fit in half a segment so rotation always makes room.
    pub fn validate(&self) -> WalResult<()> {
        if self.segment_size < MIN_SEGMENT_SIZE {
            return Err(WalError::config_error(format!(
                "segment_size {} is below the minimum of {} bytes",
                self.segment_size, MIN_SEGMENT_SIZE
            )));
        }
        if self.max_record_size == 0 || self.max_record_size > self.segment_size / 2 {
            return Err(WalError::config_error(format!(
                "max_record_size {} must be between 1 and half of segment_size {}",
                self.max_record_size, self.segment_size
            )));
        }
        if self.group_commit_batch_size == 0 {
            return Err(WalError::config_error(
                "group_commit_batch_size must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Returns the file path of a segment.
    pub fn segment_path(&self, segment_id: u64) -> PathBuf {
        self.dir
            .join(format!("{SEGMENT_PREFIX}{segment_id:016x}.{SEGMENT_EXTENSION}"))
    }

    /// Recovers the segment id from a path built by [`segment_path`].
    ///
    /// Returns `None` for any other file found in the directory.
    ///
    /// [`segment_path`]: WalConfig::segment_path
    pub fn segment_id(path: &Path) -> Option<u64> {
        if path.extension()?.to_str()? != SEGMENT_EXTENSION {
            return None;
        }
        let hex = path.file_stem()?.to_str()?.strip_prefix(SEGMENT_PREFIX)?;
        u64::from_str_radix(hex, 16).ok()
    }
}
