//! WAL record header.
//!
//! The header is a fixed 24-byte structure that precedes every WAL record.

use bytes::{Buf, BufMut};
use cairn_common::constants::WAL_RECORD_HEADER_SIZE;
use cairn_common::types::{CommitSeq, SpaceId};

use super::types::{RecordFlags, RecordType};
use crate::error::{WalError, WalResult};

/// WAL record header (24 bytes).
///
/// Layout:
/// - seq: 8 bytes (commit sequence number)
/// - space_id: 4 bytes (target object space)
/// - record_type: 1 byte
/// - flags: 1 byte
/// - reserved: 2 bytes
/// - payload_length: 4 bytes
/// - checksum: 4 bytes (CRC32 of header fields + payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Commit sequence number; `INVALID` until the writer accepts the record.
    pub seq: CommitSeq,
    /// Object space the mutation targets.
    pub space_id: SpaceId,
    /// Type of record.
    pub record_type: RecordType,
    /// Record flags.
    pub flags: RecordFlags,
    /// Length of the payload in bytes.
    pub payload_length: u32,
    /// CRC32 checksum of header + payload.
    pub checksum: u32,
}

impl RecordHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = WAL_RECORD_HEADER_SIZE;

    /// Creates a new record header.
    pub fn new(
        seq: CommitSeq,
        space_id: SpaceId,
        record_type: RecordType,
        flags: RecordFlags,
        payload_length: u32,
    ) -> Self {
        Self {
            seq,
            space_id,
            record_type,
            flags,
            payload_length,
            checksum: 0,
        }
    }

    /// Serializes the header to bytes.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.seq.as_u64());
        buf.put_u32(self.space_id.as_u32());
        buf.put_u8(self.record_type.as_u8());
        buf.put_u8(self.flags.bits());
        buf.put_u16(0); // reserved
        buf.put_u32(self.payload_length);
        buf.put_u32(self.checksum);
    }

    /// Serializes the header to a byte array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let mut cursor = &mut buf[..];
        self.serialize(&mut cursor);
        buf
    }

    /// Deserializes a header from bytes.
    pub fn deserialize(buf: &mut impl Buf) -> WalResult<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(WalError::deserialization_error(format!(
                "Not enough bytes for header: {} < {}",
                buf.remaining(),
                Self::SIZE
            )));
        }

        let seq = CommitSeq::new(buf.get_u64());
        let space_id = SpaceId::new(buf.get_u32());
        let record_type = RecordType::from_u8(buf.get_u8())?;
        let flags = RecordFlags::from_bits_truncate(buf.get_u8());
        let _reserved = buf.get_u16();
        let payload_length = buf.get_u32();
        let checksum = buf.get_u32();

        Ok(Self {
            seq,
            space_id,
            record_type,
            flags,
            payload_length,
            checksum,
        })
    }

    /// Deserializes a header from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> WalResult<Self> {
        Self::deserialize(&mut &bytes[..])
    }

    /// Returns the total record size (header + payload).
    pub fn total_size(&self) -> usize {
        Self::SIZE + self.payload_length as usize
    }

    /// Computes the checksum for this header and the given payload.
    pub fn compute_checksum(&self, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();

        // Header fields, excluding the checksum itself
        hasher.update(&self.seq.to_le_bytes());
        hasher.update(&self.space_id.as_u32().to_le_bytes());
        hasher.update(&[self.record_type.as_u8()]);
        hasher.update(&[self.flags.bits()]);
        hasher.update(&[0u8; 2]); // reserved
        hasher.update(&self.payload_length.to_le_bytes());

        hasher.update(payload);

        hasher.finalize()
    }

    /// Sets the checksum based on the payload.
    pub fn set_checksum(&mut self, payload: &[u8]) {
        self.checksum = self.compute_checksum(payload);
    }

    /// Verifies the checksum against the payload.
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        self.checksum == self.compute_checksum(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(RecordHeader::SIZE, 24);
        let header = RecordHeader::new(
            CommitSeq::FIRST,
            SpaceId::new(0),
            RecordType::Delete,
            RecordFlags::empty(),
            0,
        );
        assert_eq!(header.to_bytes().len(), RecordHeader::SIZE);
    }

    #[test]
    fn test_header_fields_survive_encoding() {
        let header = RecordHeader::new(
            CommitSeq::new(1000),
            SpaceId::new(3),
            RecordType::Insert,
            RecordFlags::ADD,
            256,
        );

        let bytes = header.to_bytes();
        let decoded = RecordHeader::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, header);
    }

    #[test]
    fn test_checksum() {
        let mut header = RecordHeader::new(
            CommitSeq::new(7),
            SpaceId::new(0),
            RecordType::Insert,
            RecordFlags::REPLACE,
            10,
        );

        let payload = b"test data!";
        header.set_checksum(payload);

        assert!(header.verify_checksum(payload));
        assert!(!header.verify_checksum(b"wrong data"));

        // The sequence number is covered too
        let mut moved = header;
        moved.seq = CommitSeq::new(8);
        assert!(!moved.verify_checksum(payload));
    }

    #[test]
    fn test_short_header_rejected() {
        assert!(RecordHeader::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_total_size() {
        let header = RecordHeader::new(
            CommitSeq::new(1),
            SpaceId::new(0),
            RecordType::Update,
            RecordFlags::empty(),
            100,
        );

        assert_eq!(header.total_size(), 124);
    }
}
