//! Key definitions and index keys.
//!
//! A [`KeyDef`] lists the typed fields that make up an index key. Keys are
//! compared lexicographically field by field in declared order, numbers by
//! value and strings bytewise; this is simply the derived ordering of
//! `Vec<Field>`.

use std::fmt;

use cairn_common::config::KeyFieldConfig;
use cairn_common::types::{Field, FieldType, Tuple};

use crate::error::{StorageError, StorageResult};

/// One typed field of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPart {
    /// Position of the field within the tuple.
    pub fieldno: usize,
    /// Declared type.
    pub field_type: FieldType,
}

impl From<&KeyFieldConfig> for KeyPart {
    fn from(config: &KeyFieldConfig) -> Self {
        Self {
            fieldno: config.fieldno,
            field_type: config.field_type,
        }
    }
}

/// Ordered list of key parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    parts: Vec<KeyPart>,
}

impl KeyDef {
    /// Creates a key definition.
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    /// Returns the key parts.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Returns the number of parts.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Returns a definition with `other`'s parts appended.
    pub fn extended(&self, other: &KeyDef) -> Self {
        let mut parts = self.parts.clone();
        parts.extend_from_slice(&other.parts);
        Self { parts }
    }

    /// Returns true if any part reads field `fieldno`.
    pub fn covers(&self, fieldno: usize) -> bool {
        self.parts.iter().any(|p| p.fieldno == fieldno)
    }

    /// Extracts the key of `tuple`, checking presence and type of each part.
    pub fn extract(&self, tuple: &Tuple) -> StorageResult<IndexKey> {
        let mut fields = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let field = tuple.get(part.fieldno).ok_or(StorageError::FieldMissing {
                fieldno: part.fieldno,
            })?;
            check_type(part, field)?;
            fields.push(field.clone());
        }
        Ok(IndexKey(fields))
    }

    /// Validates a search key against this definition.
    ///
    /// With `allow_partial`, a non-empty prefix of the parts is accepted.
    pub fn validate_key(&self, key: &[Field], allow_partial: bool) -> StorageResult<()> {
        if key.len() > self.parts.len() {
            return Err(StorageError::malformed(format!(
                "key has {} parts, index has {}",
                key.len(),
                self.parts.len()
            )));
        }
        if key.is_empty() || (!allow_partial && key.len() != self.parts.len()) {
            return Err(StorageError::malformed(format!(
                "key must have {} parts, got {}",
                self.parts.len(),
                key.len()
            )));
        }
        for (part, field) in self.parts.iter().zip(key) {
            check_type(part, field)?;
        }
        Ok(())
    }
}

fn check_type(part: &KeyPart, field: &Field) -> StorageResult<()> {
    if part.field_type.accepts(field) {
        Ok(())
    } else {
        let actual = match field {
            Field::Num(v) if *v > u64::from(u32::MAX) => "NUM64",
            other => other.kind(),
        };
        Err(StorageError::TypeMismatch {
            fieldno: part.fieldno,
            expected: part.field_type,
            actual,
        })
    }
}

/// An extracted key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(Vec<Field>);

impl IndexKey {
    /// Creates a key from its fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self(fields)
    }

    /// Returns the key fields.
    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    /// Returns true if the first fields of this key equal `prefix`.
    pub fn starts_with(&self, prefix: &[Field]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Returns the smallest key greater than every key starting with `self`.
    ///
    /// The last field is replaced by its immediate successor: `n + 1` for
    /// numbers (or the empty string after `u64::MAX`), and the string with a
    /// trailing zero byte for strings. Returns `None` for an empty key.
    pub fn prefix_successor(&self) -> Option<IndexKey> {
        let (last, head) = self.0.split_last()?;
        let next = match last {
            Field::Num(v) => match v.checked_add(1) {
                Some(n) => Field::Num(n),
                None => Field::bytes(Vec::new()),
            },
            Field::Str(b) => {
                let mut s = b.to_vec();
                s.push(0);
                Field::bytes(s)
            }
        };
        let mut fields = head.to_vec();
        fields.push(next);
        Some(IndexKey(fields))
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl From<Vec<Field>> for IndexKey {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}
