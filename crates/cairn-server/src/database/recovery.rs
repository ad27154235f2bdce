//! WAL replay at startup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use cairn_common::types::{CommitSeq, SpaceId};
use cairn_storage::ObjectSpace;
use cairn_wal::WalRecord;

use super::mutation::Mutation;

/// Outcome of a WAL replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Records applied.
    pub applied: u64,
    /// Records that could not be applied and were skipped.
    pub skipped: u64,
    /// Records cancelled by an abort marker. Markers themselves are not counted.
    pub aborted: u64,
    /// Highest replayed sequence number.
    pub last_seq: CommitSeq,
}

/// Replays `records` in commit order through the normal apply path.
///
/// Records named by an abort marker were reported as failed to their
/// submitter and are never applied. A record that no longer applies, e.g.
/// an update of a tuple that only existed as an unlogged write before the
/// restart, is logged and skipped.
pub(crate) fn replay(
    spaces: &HashMap<SpaceId, Arc<ObjectSpace>>,
    records: Vec<WalRecord>,
) -> RecoveryStats {
    let mut stats = RecoveryStats::default();
    if records.is_empty() {
        info!("No WAL records to replay");
        return stats;
    }
    info!(records = records.len(), "replaying WAL");

    // Markers always follow the record they cancel
    let aborted: HashSet<CommitSeq> = records.iter().filter_map(WalRecord::aborted_seq).collect();

    for record in records {
        let seq = record.seq();
        stats.last_seq = seq;

        if record.aborted_seq().is_some() {
            continue;
        }
        if aborted.contains(&seq) {
            debug!(%seq, "skipping aborted WAL record");
            stats.aborted += 1;
            continue;
        }

        let (space_id, mutation) = match Mutation::from_record(record) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(%seq, error = %e, "skipping undecodable WAL record");
                stats.skipped += 1;
                continue;
            }
        };
        let Some(space) = spaces.get(&space_id) else {
            warn!(%seq, space = %space_id, "skipping WAL record for unknown space");
            stats.skipped += 1;
            continue;
        };
        match mutation.apply(space) {
            Ok(_) => {
                debug!(%seq, op = mutation.name(), space = %space_id, "replayed");
                stats.applied += 1;
            }
            Err(e) => {
                warn!(%seq, op = mutation.name(), space = %space_id, error = %e, "skipping WAL record");
                stats.skipped += 1;
            }
        }
    }

    info!(
        applied = stats.applied,
        skipped = stats.skipped,
        aborted = stats.aborted,
        last_seq = %stats.last_seq,
        "WAL replay complete"
    );
    stats
}
