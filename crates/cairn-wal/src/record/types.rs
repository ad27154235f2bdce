//! WAL record types and flags.
//!
//! This module defines the record types and the main WalRecord struct.

use bytes::{Buf, Bytes, BytesMut};
use cairn_common::types::{CommitSeq, Field, InsertMode, SpaceId, Tuple, UpdateOp};

use super::header::RecordHeader;
use super::payload::{AbortPayload, DeletePayload, InsertPayload, Payload, UpdatePayload};
use crate::error::{WalError, WalResult};

/// Record type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// Insert (or replace) a tuple.
    Insert = 1,
    /// Apply field operations to a tuple.
    Update = 2,
    /// Delete a tuple.
    Delete = 3,
    /// Cancel an earlier record whose mutation was reported as failed.
    Abort = 4,
}

impl RecordType {
    /// Converts the record type to a u8.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a record type from a u8.
    pub fn from_u8(value: u8) -> WalResult<Self> {
        match value {
            1 => Ok(Self::Insert),
            2 => Ok(Self::Update),
            3 => Ok(Self::Delete),
            4 => Ok(Self::Abort),
            _ => Err(WalError::deserialization_error(format!(
                "Unknown record type: {}",
                value
            ))),
        }
    }
}

bitflags::bitflags! {
    /// Flags for WAL records.
    ///
    /// On insert records the flags carry the insert mode: `ADD` alone is a
    /// plain insert, `REPLACE` alone requires an existing tuple, and no flag
    /// at all means insert-or-replace.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RecordFlags: u8 {
        /// Key must not exist.
        const ADD = 0b0000_0001;
        /// Key must exist.
        const REPLACE = 0b0000_0010;
    }
}

impl RecordFlags {
    /// Returns the flags encoding an insert mode.
    pub const fn for_mode(mode: InsertMode) -> Self {
        match mode {
            InsertMode::Add => Self::ADD,
            InsertMode::Replace => Self::REPLACE,
            InsertMode::Upsert => Self::empty(),
        }
    }

    /// Decodes the insert mode from the flags.
    pub fn insert_mode(self) -> WalResult<InsertMode> {
        if self.contains(Self::ADD | Self::REPLACE) {
            return Err(WalError::deserialization_error(
                "insert record has both ADD and REPLACE set",
            ));
        }
        Ok(if self.contains(Self::ADD) {
            InsertMode::Add
        } else if self.contains(Self::REPLACE) {
            InsertMode::Replace
        } else {
            InsertMode::Upsert
        })
    }
}

/// A complete WAL record with header and typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Record header.
    pub header: RecordHeader,
    /// Record payload.
    pub payload: WalPayload,
}

/// WAL record payload variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalPayload {
    /// Insert record payload.
    Insert(InsertPayload),
    /// Update record payload.
    Update(UpdatePayload),
    /// Delete record payload.
    Delete(DeletePayload),
    /// Abort marker payload.
    Abort(AbortPayload),
}

impl WalRecord {
    fn unsequenced(
        space_id: SpaceId,
        record_type: RecordType,
        flags: RecordFlags,
        payload: WalPayload,
    ) -> Self {
        Self {
            header: RecordHeader::new(CommitSeq::INVALID, space_id, record_type, flags, 0),
            payload,
        }
    }

    /// Creates an insert record. The sequence number is assigned on submit.
    pub fn insert(space_id: SpaceId, mode: InsertMode, tuple: Tuple) -> Self {
        Self::unsequenced(
            space_id,
            RecordType::Insert,
            RecordFlags::for_mode(mode),
            WalPayload::Insert(InsertPayload { tuple }),
        )
    }

    /// Creates an update record.
    pub fn update(space_id: SpaceId, key: Vec<Field>, ops: Vec<UpdateOp>) -> Self {
        Self::unsequenced(
            space_id,
            RecordType::Update,
            RecordFlags::empty(),
            WalPayload::Update(UpdatePayload { key, ops }),
        )
    }

    /// Creates a delete record.
    pub fn delete(space_id: SpaceId, key: Vec<Field>) -> Self {
        Self::unsequenced(
            space_id,
            RecordType::Delete,
            RecordFlags::empty(),
            WalPayload::Delete(DeletePayload { key }),
        )
    }

    /// Creates an abort marker for the record at `aborted`.
    ///
    /// Replay skips the aborted record. The marker itself gets a sequence
    /// number of its own on submit.
    pub fn abort(space_id: SpaceId, aborted: CommitSeq) -> Self {
        Self::unsequenced(
            space_id,
            RecordType::Abort,
            RecordFlags::empty(),
            WalPayload::Abort(AbortPayload { aborted }),
        )
    }

    /// Returns the sequence this record cancels, if it is an abort marker.
    pub fn aborted_seq(&self) -> Option<CommitSeq> {
        match &self.payload {
            WalPayload::Abort(p) => Some(p.aborted),
            _ => None,
        }
    }

    /// Stamps the record with its commit sequence number.
    pub fn assign_seq(&mut self, seq: CommitSeq) {
        self.header.seq = seq;
    }

    /// Returns the commit sequence number of this record.
    pub fn seq(&self) -> CommitSeq {
        self.header.seq
    }

    /// Returns the target space.
    pub fn space_id(&self) -> SpaceId {
        self.header.space_id
    }

    /// Returns the record type.
    pub fn record_type(&self) -> RecordType {
        self.header.record_type
    }

    /// Serializes the entire record (header + payload) to bytes.
    pub fn serialize(&self) -> WalResult<Bytes> {
        let payload_bytes = self.serialize_payload()?;
        let payload_length = u32::try_from(payload_bytes.len())
            .map_err(|_| WalError::record_too_large(payload_bytes.len(), u32::MAX as usize))?;
        let mut header = self.header;
        header.payload_length = payload_length;
        header.set_checksum(&payload_bytes);

        let total_size = RecordHeader::SIZE + payload_bytes.len();
        let mut buf = BytesMut::with_capacity(total_size);
        header.serialize(&mut buf);
        buf.extend_from_slice(&payload_bytes);

        Ok(buf.freeze())
    }

    /// Serializes just the payload.
    fn serialize_payload(&self) -> WalResult<Bytes> {
        match &self.payload {
            WalPayload::Insert(p) => p.serialize(),
            WalPayload::Update(p) => p.serialize(),
            WalPayload::Delete(p) => p.serialize(),
            WalPayload::Abort(p) => p.serialize(),
        }
    }

    /// Deserializes a record from bytes, verifying its checksum.
    pub fn deserialize(buf: impl Buf) -> WalResult<Self> {
        Self::deserialize_checked(buf, true)
    }

    /// Deserializes a record, optionally skipping checksum verification.
    pub fn deserialize_checked(mut buf: impl Buf, verify: bool) -> WalResult<Self> {
        let header = RecordHeader::deserialize(&mut buf)?;

        if buf.remaining() < header.payload_length as usize {
            return Err(WalError::deserialization_error(format!(
                "Not enough bytes for payload: {} < {}",
                buf.remaining(),
                header.payload_length
            )));
        }

        let payload_bytes = buf.copy_to_bytes(header.payload_length as usize);
        if verify && !header.verify_checksum(&payload_bytes) {
            return Err(WalError::checksum_mismatch(
                header.seq,
                header.checksum,
                header.compute_checksum(&payload_bytes),
            ));
        }
        let payload = Self::deserialize_payload(header.record_type, &payload_bytes)?;
        if header.record_type == RecordType::Insert {
            header.flags.insert_mode()?;
        }

        Ok(Self { header, payload })
    }

    /// Deserializes the payload based on record type.
    fn deserialize_payload(record_type: RecordType, bytes: &[u8]) -> WalResult<WalPayload> {
        match record_type {
            RecordType::Insert => Ok(WalPayload::Insert(InsertPayload::deserialize(bytes)?)),
            RecordType::Update => Ok(WalPayload::Update(UpdatePayload::deserialize(bytes)?)),
            RecordType::Delete => Ok(WalPayload::Delete(DeletePayload::deserialize(bytes)?)),
            RecordType::Abort => Ok(WalPayload::Abort(AbortPayload::deserialize(bytes)?)),
        }
    }
}
