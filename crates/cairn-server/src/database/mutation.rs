//! Mutations and their WAL representation.

use std::fmt;
use std::sync::Arc;

use cairn_common::types::{Field, InsertMode, SpaceId, Tuple, UpdateOp};
use cairn_storage::{ObjectSpace, StorageResult};
use cairn_wal::{WalError, WalPayload, WalRecord, WalResult};

/// Whether a mutation goes through the WAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogMode {
    /// Persisted before it is applied.
    Logged,
    /// Applied immediately; never persisted.
    Unlogged,
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogMode::Logged => write!(f, "logged"),
            LogMode::Unlogged => write!(f, "unlogged"),
        }
    }
}

/// A change to one object space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mutation {
    Insert { mode: InsertMode, tuple: Tuple },
    Update { key: Vec<Field>, ops: Vec<UpdateOp> },
    Delete { key: Vec<Field> },
}

impl Mutation {
    /// Checks the mutation against the current state of `space`.
    pub(crate) fn check(&self, space: &ObjectSpace) -> StorageResult<()> {
        match self {
            Mutation::Insert { mode, tuple } => space.check_insert(tuple, *mode),
            Mutation::Update { key, ops } => space.check_update(key, ops),
            Mutation::Delete { key } => space.check_delete(key),
        }
    }

    /// Applies the mutation, re-checking it against the state of `space`.
    ///
    /// Returns the inserted or updated tuple, or the deleted one.
    pub(crate) fn apply(&self, space: &ObjectSpace) -> StorageResult<Arc<Tuple>> {
        match self {
            Mutation::Insert { mode, tuple } => space.insert(tuple.clone(), *mode),
            Mutation::Update { key, ops } => space.update_fields(key, ops),
            Mutation::Delete { key } => space
                .delete(key)?
                .ok_or(cairn_storage::StorageError::NotFound),
        }
    }

    /// Builds the WAL record for this mutation.
    pub(crate) fn to_record(&self, space_id: SpaceId) -> WalRecord {
        match self {
            Mutation::Insert { mode, tuple } => WalRecord::insert(space_id, *mode, tuple.clone()),
            Mutation::Update { key, ops } => WalRecord::update(space_id, key.clone(), ops.clone()),
            Mutation::Delete { key } => WalRecord::delete(space_id, key.clone()),
        }
    }

    /// Rebuilds a mutation from a replayed WAL record.
    pub(crate) fn from_record(record: WalRecord) -> WalResult<(SpaceId, Mutation)> {
        let space_id = record.space_id();
        let mutation = match record.payload {
            WalPayload::Insert(p) => Mutation::Insert {
                mode: record.header.flags.insert_mode()?,
                tuple: p.tuple,
            },
            WalPayload::Update(p) => Mutation::Update {
                key: p.key,
                ops: p.ops,
            },
            WalPayload::Delete(p) => Mutation::Delete { key: p.key },
            WalPayload::Abort(p) => {
                return Err(WalError::deserialization_error(format!(
                    "abort marker for {} is not a mutation",
                    p.aborted
                )))
            }
        };
        Ok((space_id, mutation))
    }

    /// Returns the operation name.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Mutation::Insert { mode, .. } => match mode {
                InsertMode::Add => "insert",
                InsertMode::Replace => "replace",
                InsertMode::Upsert => "upsert",
            },
            Mutation::Update { .. } => "update_fields",
            Mutation::Delete { .. } => "delete",
        }
    }
}
