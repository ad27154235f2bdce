//! WAL reader for recovery.
//!
//! This module provides the reader component for:
//! - Discovering segment files in the WAL directory
//! - Reading records back in commit order
//! - Detecting gaps between segments

use cairn_common::types::CommitSeq;
use tracing::debug;

use crate::config::WalConfig;
use crate::error::{WalError, WalResult};
use crate::record::types::WalRecord;
use crate::segment::WalSegment;

/// WAL reader for recovery operations.
#[derive(Debug)]
pub struct WalReader {
    /// Segments in ascending id order.
    segments: Vec<WalSegment>,
    /// Whether to verify checksums while reading.
    verify_checksums: bool,
}

impl WalReader {
    /// Opens all segments in the WAL directory.
    pub fn open(config: &WalConfig) -> WalResult<Self> {
        let dir = &config.dir;
        let mut segments = Vec::new();

        if dir.exists() {
            let mut ids: Vec<u64> = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .filter_map(|e| WalConfig::segment_id(&e.path()))
                .collect();
            ids.sort_unstable();

            for segment_id in ids {
                let segment = WalSegment::open(segment_id, config.segment_path(segment_id), config)?;
                debug!(
                    segment_id,
                    first_seq = %segment.first_seq(),
                    last_seq = %segment.last_seq(),
                    "opened WAL segment"
                );
                segments.push(segment);
            }
        }

        Ok(Self {
            segments,
            verify_checksums: config.verify_checksums,
        })
    }

    /// Reads every record across all segments in commit order.
    ///
    /// Sequence numbers must continue without gaps from one segment to the
    /// next; a gap means a segment lost records in the middle of the log.
    pub fn read_all(&self) -> WalResult<Vec<WalRecord>> {
        Self::read_segments(&self.segments, self.verify_checksums)
    }

    pub(crate) fn read_segments(
        segments: &[WalSegment],
        verify_checksums: bool,
    ) -> WalResult<Vec<WalRecord>> {
        let mut records = Vec::new();
        let mut expected: Option<CommitSeq> = None;

        for segment in segments {
            if let Some(expected) = expected {
                if segment.first_seq() != expected {
                    return Err(WalError::segment_corrupted(
                        expected,
                        format!(
                            "segment {} starts at {} but {} was expected",
                            segment.segment_id(),
                            segment.first_seq(),
                            expected
                        ),
                    ));
                }
            }
            records.extend(segment.read_records(verify_checksums)?);
            expected = Some(segment.last_seq().next());
        }

        Ok(records)
    }

    /// Returns the highest sequence number found in the log.
    pub fn last_seq(&self) -> CommitSeq {
        self.segments
            .last()
            .map(WalSegment::last_seq)
            .unwrap_or(CommitSeq::INVALID)
    }

    /// Consumes the reader, returning the opened segments.
    pub fn into_segments(self) -> Vec<WalSegment> {
        self.segments
    }

    /// Returns the segments being managed.
    pub fn segments(&self) -> &[WalSegment] {
        &self.segments
    }
}
