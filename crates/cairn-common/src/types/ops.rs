//! Mutation operations shared by the log and the storage engine.

use bytes::Bytes;
use std::fmt;

use super::Field;

/// How an insert treats an existing tuple with the same primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InsertMode {
    /// Fail with a duplicate key error if the key exists.
    #[default]
    Add,
    /// Fail with not found unless the key exists; replaces the old tuple.
    Replace,
    /// Insert, or replace the old tuple if the key exists.
    Upsert,
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Upsert => "upsert",
        };
        f.write_str(name)
    }
}

/// A single field-level update operation.
///
/// Operations in one `update_fields` call are applied left to right, each
/// seeing the result of the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    /// Replace the field value. Setting `fieldno == len` appends a field.
    Set {
        /// Target field.
        fieldno: usize,
        /// New value.
        value: Field,
    },
    /// Wrapping add to a numeric field.
    Add {
        /// Target field.
        fieldno: usize,
        /// Operand.
        value: u64,
    },
    /// Bitwise AND of a numeric field.
    And {
        /// Target field.
        fieldno: usize,
        /// Operand.
        value: u64,
    },
    /// Bitwise OR of a numeric field.
    Or {
        /// Target field.
        fieldno: usize,
        /// Operand.
        value: u64,
    },
    /// Bitwise XOR of a numeric field.
    Xor {
        /// Target field.
        fieldno: usize,
        /// Operand.
        value: u64,
    },
    /// Replace `len` bytes at `offset` of a string field with `bytes`.
    ///
    /// Offset and length are clamped to the current string.
    Splice {
        /// Target field.
        fieldno: usize,
        /// Start of the cut.
        offset: usize,
        /// Number of bytes to cut.
        len: usize,
        /// Bytes pasted at `offset`.
        bytes: Bytes,
    },
    /// Remove the field, shifting later fields left.
    Delete {
        /// Target field.
        fieldno: usize,
    },
    /// Insert a field before `fieldno`, shifting later fields right.
    Insert {
        /// Insert position.
        fieldno: usize,
        /// Inserted value.
        value: Field,
    },
}

impl UpdateOp {
    /// Creates a `Set` operation.
    #[must_use]
    pub fn set(fieldno: usize, value: impl Into<Field>) -> Self {
        Self::Set {
            fieldno,
            value: value.into(),
        }
    }

    /// Creates an `Add` operation.
    #[must_use]
    pub const fn add(fieldno: usize, value: u64) -> Self {
        Self::Add { fieldno, value }
    }

    /// Creates a `Splice` operation.
    #[must_use]
    pub fn splice(fieldno: usize, offset: usize, len: usize, bytes: impl Into<Bytes>) -> Self {
        Self::Splice {
            fieldno,
            offset,
            len,
            bytes: bytes.into(),
        }
    }

    /// Creates a `Delete` operation.
    #[must_use]
    pub const fn delete(fieldno: usize) -> Self {
        Self::Delete { fieldno }
    }

    /// Creates an `Insert` operation.
    #[must_use]
    pub fn insert(fieldno: usize, value: impl Into<Field>) -> Self {
        Self::Insert {
            fieldno,
            value: value.into(),
        }
    }

    /// Returns the targeted field number.
    #[must_use]
    pub const fn fieldno(&self) -> usize {
        match self {
            Self::Set { fieldno, .. }
            | Self::Add { fieldno, .. }
            | Self::And { fieldno, .. }
            | Self::Or { fieldno, .. }
            | Self::Xor { fieldno, .. }
            | Self::Splice { fieldno, .. }
            | Self::Delete { fieldno }
            | Self::Insert { fieldno, .. } => *fieldno,
        }
    }

    /// Returns the operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Add { .. } => "add",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Xor { .. } => "xor",
            Self::Splice { .. } => "splice",
            Self::Delete { .. } => "delete",
            Self::Insert { .. } => "insert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_op_constructors() {
        let op = UpdateOp::set(0, 1u32);
        assert_eq!(op.fieldno(), 0);
        assert_eq!(op.name(), "set");
        assert_eq!(
            op,
            UpdateOp::Set {
                fieldno: 0,
                value: Field::num(1)
            }
        );

        let op = UpdateOp::splice(1, 2, 3, &b"xy"[..]);
        assert_eq!(op.fieldno(), 1);
        assert_eq!(op.name(), "splice");
        assert_eq!(UpdateOp::delete(4).fieldno(), 4);
        assert_eq!(UpdateOp::insert(2, "a").name(), "insert");
    }

    #[test]
    fn test_insert_mode_default() {
        assert_eq!(InsertMode::default(), InsertMode::Add);
        assert_eq!(InsertMode::Upsert.to_string(), "upsert");
    }
}
