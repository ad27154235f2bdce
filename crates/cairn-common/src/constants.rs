//! System-wide constants for Cairn.

// =============================================================================
// Tuple Limits
// =============================================================================

/// Maximum number of fields in a single tuple.
pub const MAX_TUPLE_FIELDS: usize = 4096;

/// Maximum size of a single string field in bytes (1 MB).
pub const MAX_FIELD_SIZE: usize = 1024 * 1024;

/// Maximum number of fields in an index key.
pub const MAX_KEY_FIELDS: usize = 16;

/// Maximum number of indexes per object space (primary included).
pub const MAX_INDEXES: usize = 10;

// =============================================================================
// WAL Constants
// =============================================================================

/// Default WAL segment size (64 MB).
pub const DEFAULT_WAL_SEGMENT_SIZE: usize = 64 * 1024 * 1024;

/// Maximum WAL record size (8 MB).
pub const MAX_WAL_RECORD_SIZE: usize = 8 * 1024 * 1024;

/// WAL record header size in bytes.
///
/// commit_seq (8) + space_id (4) + type (1) + flags (1) + reserved (2)
/// + payload_length (4) + checksum (4) = 24 bytes.
pub const WAL_RECORD_HEADER_SIZE: usize = 24;

/// Magic number at the start of every WAL segment ("CAWL").
pub const WAL_MAGIC: u32 = 0x4341_574C;

/// WAL format version.
pub const WAL_VERSION: u32 = 1;

/// Number of records the WAL writer drains per group commit batch.
pub const GROUP_COMMIT_BATCH_SIZE: usize = 64;
