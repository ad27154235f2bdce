//! WAL record payloads.
//!
//! This module defines the payload structures for the mutation records and
//! the field-level encoding they share.
//!
//! ```text
//! field   := tag:u8 (0 = NUM, 1 = STR) | NUM: u64 | STR: len:u32 bytes
//! fields  := count:u32 field*
//! op      := tag:u8 fieldno:u32 operand
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use cairn_common::constants::{MAX_FIELD_SIZE, MAX_TUPLE_FIELDS};
use cairn_common::types::{CommitSeq, Field, Tuple, UpdateOp};

use crate::error::{WalError, WalResult};

/// Trait for serializable payloads.
pub trait Payload: Sized {
    /// Serializes the payload to bytes.
    fn serialize(&self) -> WalResult<Bytes>;
    /// Deserializes the payload from bytes.
    fn deserialize(bytes: &[u8]) -> WalResult<Self>;
}

const FIELD_NUM: u8 = 0;
const FIELD_STR: u8 = 1;

const OP_SET: u8 = 0;
const OP_ADD: u8 = 1;
const OP_AND: u8 = 2;
const OP_OR: u8 = 3;
const OP_XOR: u8 = 4;
const OP_SPLICE: u8 = 5;
const OP_DELETE: u8 = 6;
const OP_INSERT: u8 = 7;

fn need(buf: &[u8], n: usize, what: &str) -> WalResult<()> {
    if buf.remaining() < n {
        return Err(WalError::deserialization_error(format!(
            "{} truncated: need {} bytes, have {}",
            what,
            n,
            buf.remaining()
        )));
    }
    Ok(())
}

fn len_u32(len: usize, what: &str) -> WalResult<u32> {
    u32::try_from(len)
        .map_err(|_| WalError::serialization_error(format!("{} length {} overflows u32", what, len)))
}

fn put_field(buf: &mut BytesMut, field: &Field) -> WalResult<()> {
    match field {
        Field::Num(v) => {
            buf.put_u8(FIELD_NUM);
            buf.put_u64(*v);
        }
        Field::Str(b) => {
            buf.put_u8(FIELD_STR);
            buf.put_u32(len_u32(b.len(), "string field")?);
            buf.extend_from_slice(b);
        }
    }
    Ok(())
}

fn get_field(buf: &mut &[u8]) -> WalResult<Field> {
    need(buf, 1, "field tag")?;
    match buf.get_u8() {
        FIELD_NUM => {
            need(buf, 8, "numeric field")?;
            Ok(Field::Num(buf.get_u64()))
        }
        FIELD_STR => {
            need(buf, 4, "string length")?;
            let len = buf.get_u32() as usize;
            if len > MAX_FIELD_SIZE {
                return Err(WalError::deserialization_error(format!(
                    "string field of {} bytes exceeds maximum {}",
                    len, MAX_FIELD_SIZE
                )));
            }
            need(buf, len, "string field")?;
            let bytes = Bytes::copy_from_slice(&buf[..len]);
            buf.advance(len);
            Ok(Field::Str(bytes))
        }
        tag => Err(WalError::deserialization_error(format!(
            "Unknown field tag: {}",
            tag
        ))),
    }
}

fn put_fields(buf: &mut BytesMut, fields: &[Field]) -> WalResult<()> {
    buf.put_u32(len_u32(fields.len(), "field list")?);
    for field in fields {
        put_field(buf, field)?;
    }
    Ok(())
}

fn get_fields(buf: &mut &[u8]) -> WalResult<Vec<Field>> {
    need(buf, 4, "field count")?;
    let count = buf.get_u32() as usize;
    if count > MAX_TUPLE_FIELDS {
        return Err(WalError::deserialization_error(format!(
            "field count {} exceeds maximum {}",
            count, MAX_TUPLE_FIELDS
        )));
    }
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        fields.push(get_field(buf)?);
    }
    Ok(fields)
}

fn put_op(buf: &mut BytesMut, op: &UpdateOp) -> WalResult<()> {
    let fieldno = len_u32(op.fieldno(), "fieldno")?;
    match op {
        UpdateOp::Set { value, .. } => {
            buf.put_u8(OP_SET);
            buf.put_u32(fieldno);
            put_field(buf, value)?;
        }
        UpdateOp::Add { value, .. }
        | UpdateOp::And { value, .. }
        | UpdateOp::Or { value, .. }
        | UpdateOp::Xor { value, .. } => {
            let tag = match op {
                UpdateOp::Add { .. } => OP_ADD,
                UpdateOp::And { .. } => OP_AND,
                UpdateOp::Or { .. } => OP_OR,
                _ => OP_XOR,
            };
            buf.put_u8(tag);
            buf.put_u32(fieldno);
            buf.put_u64(*value);
        }
        UpdateOp::Splice {
            offset, len, bytes, ..
        } => {
            buf.put_u8(OP_SPLICE);
            buf.put_u32(fieldno);
            buf.put_u32(len_u32(*offset, "splice offset")?);
            buf.put_u32(len_u32(*len, "splice length")?);
            buf.put_u32(len_u32(bytes.len(), "splice bytes")?);
            buf.extend_from_slice(bytes);
        }
        UpdateOp::Delete { .. } => {
            buf.put_u8(OP_DELETE);
            buf.put_u32(fieldno);
        }
        UpdateOp::Insert { value, .. } => {
            buf.put_u8(OP_INSERT);
            buf.put_u32(fieldno);
            put_field(buf, value)?;
        }
    }
    Ok(())
}

fn get_op(buf: &mut &[u8]) -> WalResult<UpdateOp> {
    need(buf, 5, "update op")?;
    let tag = buf.get_u8();
    let fieldno = buf.get_u32() as usize;
    let op = match tag {
        OP_SET => UpdateOp::Set {
            fieldno,
            value: get_field(buf)?,
        },
        OP_ADD | OP_AND | OP_OR | OP_XOR => {
            need(buf, 8, "update operand")?;
            let value = buf.get_u64();
            match tag {
                OP_ADD => UpdateOp::Add { fieldno, value },
                OP_AND => UpdateOp::And { fieldno, value },
                OP_OR => UpdateOp::Or { fieldno, value },
                _ => UpdateOp::Xor { fieldno, value },
            }
        }
        OP_SPLICE => {
            need(buf, 12, "splice header")?;
            let offset = buf.get_u32() as usize;
            let len = buf.get_u32() as usize;
            let bytes_len = buf.get_u32() as usize;
            need(buf, bytes_len, "splice bytes")?;
            let bytes = Bytes::copy_from_slice(&buf[..bytes_len]);
            buf.advance(bytes_len);
            UpdateOp::Splice {
                fieldno,
                offset,
                len,
                bytes,
            }
        }
        OP_DELETE => UpdateOp::Delete { fieldno },
        OP_INSERT => UpdateOp::Insert {
            fieldno,
            value: get_field(buf)?,
        },
        _ => {
            return Err(WalError::deserialization_error(format!(
                "Unknown update op: {}",
                tag
            )))
        }
    };
    Ok(op)
}

fn expect_consumed(buf: &[u8], what: &str) -> WalResult<()> {
    if buf.has_remaining() {
        return Err(WalError::deserialization_error(format!(
            "{} has {} trailing bytes",
            what,
            buf.remaining()
        )));
    }
    Ok(())
}

/// Insert record payload: the full tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPayload {
    /// Tuple to store.
    pub tuple: Tuple,
}

impl Payload for InsertPayload {
    fn serialize(&self) -> WalResult<Bytes> {
        let mut buf = BytesMut::with_capacity(4 + self.tuple.size() + self.tuple.len() * 5);
        put_fields(&mut buf, self.tuple.fields())?;
        Ok(buf.freeze())
    }

    fn deserialize(bytes: &[u8]) -> WalResult<Self> {
        let mut buf = bytes;
        let fields = get_fields(&mut buf)?;
        expect_consumed(buf, "InsertPayload")?;
        Ok(Self {
            tuple: Tuple::new(fields),
        })
    }
}

/// Update record payload: primary key and the operations to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    /// Primary key of the tuple.
    pub key: Vec<Field>,
    /// Operations, applied in order.
    pub ops: Vec<UpdateOp>,
}

impl Payload for UpdatePayload {
    fn serialize(&self) -> WalResult<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        put_fields(&mut buf, &self.key)?;
        buf.put_u32(len_u32(self.ops.len(), "op list")?);
        for op in &self.ops {
            put_op(&mut buf, op)?;
        }
        Ok(buf.freeze())
    }

    fn deserialize(bytes: &[u8]) -> WalResult<Self> {
        let mut buf = bytes;
        let key = get_fields(&mut buf)?;
        need(buf, 4, "op count")?;
        let count = buf.get_u32() as usize;
        let mut ops = Vec::with_capacity(count.min(MAX_TUPLE_FIELDS));
        for _ in 0..count {
            ops.push(get_op(&mut buf)?);
        }
        expect_consumed(buf, "UpdatePayload")?;
        Ok(Self { key, ops })
    }
}

/// Delete record payload: the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePayload {
    /// Primary key of the tuple.
    pub key: Vec<Field>,
}

impl Payload for DeletePayload {
    fn serialize(&self) -> WalResult<Bytes> {
        let mut buf = BytesMut::with_capacity(32);
        put_fields(&mut buf, &self.key)?;
        Ok(buf.freeze())
    }

    fn deserialize(bytes: &[u8]) -> WalResult<Self> {
        let mut buf = bytes;
        let key = get_fields(&mut buf)?;
        expect_consumed(buf, "DeletePayload")?;
        Ok(Self { key })
    }
}

/// Abort marker payload: the sequence number of a record that must not
/// be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPayload {
    /// Record whose mutation was reported as failed.
    pub aborted: CommitSeq,
}

impl Payload for AbortPayload {
    fn serialize(&self) -> WalResult<Bytes> {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_u64(self.aborted.as_u64());
        Ok(buf.freeze())
    }

    fn deserialize(bytes: &[u8]) -> WalResult<Self> {
        let mut buf = bytes;
        need(buf, 8, "aborted sequence")?;
        let aborted = CommitSeq::new(buf.get_u64());
        expect_consumed(buf, "AbortPayload")?;
        Ok(Self { aborted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_payload_preserves_tuple() {
        let payload = InsertPayload {
            tuple: Tuple::new(vec![Field::num(3), Field::str("baz"), Field::bytes(vec![0u8, 255])]),
        };
        let bytes = payload.serialize().unwrap();
        assert_eq!(InsertPayload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_update_payload_all_ops() {
        let payload = UpdatePayload {
            key: vec![Field::num(3)],
            ops: vec![
                UpdateOp::set(0, 1u32),
                UpdateOp::add(1, 5),
                UpdateOp::And { fieldno: 1, value: 0xff },
                UpdateOp::Or { fieldno: 1, value: 0x100 },
                UpdateOp::Xor { fieldno: 1, value: 1 },
                UpdateOp::splice(2, 1, 2, &b"xyz"[..]),
                UpdateOp::delete(3),
                UpdateOp::insert(2, "new"),
            ],
        };
        let bytes = payload.serialize().unwrap();
        assert_eq!(UpdatePayload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_truncated_payload() {
        let payload = DeletePayload {
            key: vec![Field::str("hello")],
        };
        let bytes = payload.serialize().unwrap();
        assert!(DeletePayload::deserialize(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let payload = DeletePayload {
            key: vec![Field::num(1)],
        };
        let mut bytes = payload.serialize().unwrap().to_vec();
        bytes.push(0);
        assert!(DeletePayload::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_unknown_tags_rejected() {
        // count = 1, tag = 9
        let bytes = [0u8, 0, 0, 1, 9];
        assert!(DeletePayload::deserialize(&bytes).is_err());

        // empty key, one op with tag 42
        let bytes = [0u8, 0, 0, 0, 0, 0, 0, 1, 42, 0, 0, 0, 0];
        assert!(UpdatePayload::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_abort_payload() {
        let payload = AbortPayload {
            aborted: CommitSeq::new(77),
        };
        let bytes = payload.serialize().unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(AbortPayload::deserialize(&bytes).unwrap(), payload);
        assert!(AbortPayload::deserialize(&bytes[..7]).is_err());
    }
}
