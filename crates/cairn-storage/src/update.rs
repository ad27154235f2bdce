//! Field-level update operations.

use bytes::{BufMut, BytesMut};

use cairn_common::types::{Field, Tuple, UpdateOp};

use crate::error::{StorageError, StorageResult};

/// Applies `ops` to a copy of `tuple`, left to right.
///
/// Each operation sees the result of the previous one. The input tuple is
/// never modified, so a failing operation leaves no trace.
pub fn apply_ops(tuple: &Tuple, ops: &[UpdateOp]) -> StorageResult<Tuple> {
    if ops.is_empty() {
        return Err(StorageError::invalid_argument("update has no operations"));
    }
    let mut fields = tuple.fields().to_vec();
    for op in ops {
        apply_op(&mut fields, op)?;
    }
    if fields.is_empty() {
        return Err(StorageError::invalid_argument("update removes every field"));
    }
    Ok(Tuple::new(fields))
}

fn apply_op(fields: &mut Vec<Field>, op: &UpdateOp) -> StorageResult<()> {
    let len = fields.len();
    match op {
        UpdateOp::Set { fieldno, value } => {
            if *fieldno < len {
                fields[*fieldno] = value.clone();
            } else if *fieldno == len {
                fields.push(value.clone());
            } else {
                return Err(out_of_range(op, len));
            }
        }
        UpdateOp::Add { fieldno, value }
        | UpdateOp::And { fieldno, value }
        | UpdateOp::Or { fieldno, value }
        | UpdateOp::Xor { fieldno, value } => {
            let field = fields.get_mut(*fieldno).ok_or_else(|| out_of_range(op, len))?;
            let Field::Num(current) = *field else {
                return Err(StorageError::invalid_argument(format!(
                    "{} on field {}: field is not numeric",
                    op.name(),
                    fieldno
                )));
            };
            let result = match op {
                UpdateOp::Add { .. } => current.wrapping_add(*value),
                UpdateOp::And { .. } => current & value,
                UpdateOp::Or { .. } => current | value,
                _ => current ^ value,
            };
            *field = Field::Num(result);
        }
        UpdateOp::Splice {
            fieldno,
            offset,
            len: cut,
            bytes,
        } => {
            let field = fields.get_mut(*fieldno).ok_or_else(|| out_of_range(op, len))?;
            let Field::Str(current) = field else {
                return Err(StorageError::invalid_argument(format!(
                    "splice on field {fieldno}: field is not a string"
                )));
            };
            let start = (*offset).min(current.len());
            let end = start.saturating_add(*cut).min(current.len());
            let mut out = BytesMut::with_capacity(current.len() - (end - start) + bytes.len());
            out.put_slice(&current[..start]);
            out.put_slice(bytes);
            out.put_slice(&current[end..]);
            *current = out.freeze();
        }
        UpdateOp::Delete { fieldno } => {
            if *fieldno >= len {
                return Err(out_of_range(op, len));
            }
            fields.remove(*fieldno);
        }
        UpdateOp::Insert { fieldno, value } => {
            if *fieldno > len {
                return Err(out_of_range(op, len));
            }
            fields.insert(*fieldno, value.clone());
        }
    }
    Ok(())
}

fn out_of_range(op: &UpdateOp, len: usize) -> StorageError {
    StorageError::invalid_argument(format!(
        "{} on field {}: tuple has {} fields",
        op.name(),
        op.fieldno(),
        len
    ))
}
