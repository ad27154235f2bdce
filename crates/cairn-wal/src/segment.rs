//! WAL segment management.
//!
//! This module handles individual WAL segment files. A segment starts with
//! a fixed preamble followed by back-to-back records:
//!
//! ```text
//! +-----------+-------------+----------------+-----------------+
//! | magic (4) | version (4) | segment id (8) | first seq (8)   |
//! +-----------+-------------+----------------+-----------------+
//! | record | record | ...                                      |
//! +------------------------------------------------------------+
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use cairn_common::constants::{WAL_MAGIC, WAL_VERSION};
use cairn_common::types::CommitSeq;
use tracing::warn;

use crate::config::WalConfig;
use crate::error::{WalError, WalResult};
use crate::record::header::RecordHeader;
use crate::record::types::WalRecord;

/// Size of the segment preamble in bytes.
pub const SEGMENT_PREAMBLE_SIZE: usize = 24;

/// Segment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Segment is open for writing.
    Active,
    /// Segment is sealed (no more writes).
    Sealed,
}

/// A single WAL segment file.
pub struct WalSegment {
    /// Segment ID.
    segment_id: u64,
    /// Path to the segment file.
    path: PathBuf,
    /// File handle.
    file: File,
    /// Current write position.
    write_pos: u64,
    /// Segment size limit.
    size_limit: usize,
    /// First commit sequence this segment may hold.
    first_seq: CommitSeq,
    /// Last commit sequence written to this segment.
    last_seq: CommitSeq,
    /// Segment state.
    state: SegmentState,
}

impl WalSegment {
    /// Creates a new segment file.
    pub fn create(
        segment_id: u64,
        path: impl AsRef<Path>,
        config: &WalConfig,
        first_seq: CommitSeq,
    ) -> WalResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut preamble = Vec::with_capacity(SEGMENT_PREAMBLE_SIZE);
        preamble.put_u32(WAL_MAGIC);
        preamble.put_u32(WAL_VERSION);
        preamble.put_u64(segment_id);
        preamble.put_u64(first_seq.as_u64());
        file.write_all(&preamble)?;
        file.flush()?;

        Ok(Self {
            segment_id,
            path,
            file,
            write_pos: SEGMENT_PREAMBLE_SIZE as u64,
            size_limit: config.segment_size,
            first_seq,
            last_seq: first_seq.prev(),
            state: SegmentState::Active,
        })
    }

    /// Opens an existing segment file.
    ///
    /// The file is scanned up to the last intact record. Anything after it
    /// (a torn write, or a record failing its checksum) is cut off so that
    /// new appends continue from a clean tail.
    pub fn open(segment_id: u64, path: impl AsRef<Path>, config: &WalConfig) -> WalResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut preamble = [0u8; SEGMENT_PREAMBLE_SIZE];
        file.read_exact(&mut preamble)?;
        let mut buf = &preamble[..];

        let magic = buf.get_u32();
        if magic != WAL_MAGIC {
            return Err(WalError::InvalidMagic {
                expected: WAL_MAGIC,
                found: magic,
            });
        }
        let version = buf.get_u32();
        if version != WAL_VERSION {
            return Err(WalError::UnsupportedVersion {
                expected: WAL_VERSION,
                found: version,
            });
        }
        let found_id = buf.get_u64();
        if found_id != segment_id {
            return Err(WalError::segment_corrupted(
                CommitSeq::INVALID,
                format!(
                    "Segment ID mismatch: expected {}, found {}",
                    segment_id, found_id
                ),
            ));
        }
        let first_seq = CommitSeq::new(buf.get_u64());

        let (write_pos, last_seq) = Self::find_end_position(&mut file, config, first_seq)?;

        let file_len = file.metadata()?.len();
        if file_len > write_pos {
            warn!(
                segment_id,
                valid_bytes = write_pos,
                dropped_bytes = file_len - write_pos,
                "truncating torn WAL segment tail"
            );
            file.set_len(write_pos)?;
        }

        Ok(Self {
            segment_id,
            path,
            file,
            write_pos,
            size_limit: config.segment_size,
            first_seq,
            last_seq,
            state: SegmentState::Active,
        })
    }

    /// Finds the end of the valid record prefix and the last sequence in it.
    fn find_end_position(
        file: &mut File,
        config: &WalConfig,
        first_seq: CommitSeq,
    ) -> WalResult<(u64, CommitSeq)> {
        let mut data = Vec::new();
        file.seek(SeekFrom::Start(SEGMENT_PREAMBLE_SIZE as u64))?;
        file.read_to_end(&mut data)?;

        let mut pos = 0usize;
        let mut last_seq = first_seq.prev();

        while pos + RecordHeader::SIZE <= data.len() {
            let header = match RecordHeader::from_bytes(&data[pos..pos + RecordHeader::SIZE]) {
                Ok(h) => h,
                Err(_) => break,
            };
            let total = header.total_size();
            if header.seq <= last_seq
                || total > config.max_record_size + RecordHeader::SIZE
                || pos + total > data.len()
            {
                break;
            }
            if config.verify_checksums
                && !header.verify_checksum(&data[pos + RecordHeader::SIZE..pos + total])
            {
                break;
            }
            last_seq = header.seq;
            pos += total;
        }

        Ok(((SEGMENT_PREAMBLE_SIZE + pos) as u64, last_seq))
    }

    /// Returns the segment ID.
    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    /// Returns the first sequence this segment may hold.
    pub fn first_seq(&self) -> CommitSeq {
        self.first_seq
    }

    /// Returns the last sequence written, or `first_seq - 1` if empty.
    pub fn last_seq(&self) -> CommitSeq {
        self.last_seq
    }

    /// Returns the current write position.
    pub fn write_position(&self) -> u64 {
        self.write_pos
    }

    /// Returns true if the segment holds no records.
    pub fn is_empty(&self) -> bool {
        self.write_pos == SEGMENT_PREAMBLE_SIZE as u64
    }

    /// Returns the remaining space in this segment.
    pub fn remaining_space(&self) -> usize {
        self.size_limit.saturating_sub(self.write_pos as usize)
    }

    /// Returns true if the segment has space for a record of the given size.
    pub fn has_space_for(&self, record_size: usize) -> bool {
        self.remaining_space() >= record_size
    }

    /// Returns the segment state.
    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Seals the segment, preventing further writes.
    pub fn seal(&mut self) {
        self.state = SegmentState::Sealed;
    }

    /// Appends a serialized record with the given sequence number.
    pub fn append(&mut self, seq: CommitSeq, record_bytes: &[u8]) -> WalResult<()> {
        if self.state != SegmentState::Active {
            return Err(WalError::segment_corrupted(
                seq,
                format!("segment {} is sealed", self.segment_id),
            ));
        }
        if !self.has_space_for(record_bytes.len()) && !self.is_empty() {
            return Err(WalError::record_too_large(
                record_bytes.len(),
                self.remaining_space(),
            ));
        }

        self.file.seek(SeekFrom::Start(self.write_pos))?;
        self.file.write_all(record_bytes)?;

        self.write_pos += record_bytes.len() as u64;
        self.last_seq = seq;
        Ok(())
    }

    /// Syncs the segment to disk.
    pub fn sync(&self) -> WalResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Reads every record in the segment, in order.
    pub fn read_records(&self, verify_checksums: bool) -> WalResult<Vec<WalRecord>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(SEGMENT_PREAMBLE_SIZE as u64))?;
        let len = self.write_pos as usize - SEGMENT_PREAMBLE_SIZE;
        let mut data = vec![0u8; len];
        file.read_exact(&mut data)?;

        let mut buf = &data[..];
        let mut records = Vec::new();
        while buf.has_remaining() {
            records.push(WalRecord::deserialize_checked(&mut buf, verify_checksums)?);
        }
        Ok(records)
    }

    /// Returns the path to this segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WalSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalSegment")
            .field("segment_id", &self.segment_id)
            .field("path", &self.path)
            .field("first_seq", &self.first_seq)
            .field("last_seq", &self.last_seq)
            .field("write_pos", &self.write_pos)
            .field("state", &self.state)
            .finish()
    }
}
