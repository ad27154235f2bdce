//! WAL record types and serialization.

pub mod header;
pub mod payload;
pub mod types;

pub use header::RecordHeader;
pub use payload::{AbortPayload, DeletePayload, InsertPayload, Payload, UpdatePayload};
pub use types::{RecordFlags, RecordType, WalPayload, WalRecord};
