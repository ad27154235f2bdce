//! Typed tuple fields.
//!
//! A field is either an unsigned number or a byte string. Key fields are
//! additionally declared with a [`FieldType`] in the space definition;
//! non-key fields are untyped and may hold either kind.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an index key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 32-bit unsigned number.
    #[serde(rename = "NUM")]
    Num,
    /// 64-bit unsigned number.
    #[serde(rename = "NUM64")]
    Num64,
    /// Byte string.
    #[serde(rename = "STR")]
    Str,
}

impl FieldType {
    /// Returns true if `field` is a legal value of this type.
    #[must_use]
    pub fn accepts(&self, field: &Field) -> bool {
        match (self, field) {
            (Self::Num, Field::Num(v)) => *v <= u64::from(u32::MAX),
            (Self::Num64, Field::Num(_)) => true,
            (Self::Str, Field::Str(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Num => "NUM",
            Self::Num64 => "NUM64",
            Self::Str => "STR",
        };
        f.write_str(name)
    }
}

/// A single tuple field value.
///
/// Numbers order before strings; strings compare bytewise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Unsigned number.
    Num(u64),
    /// Byte string.
    Str(Bytes),
}

impl Field {
    /// Creates a numeric field.
    #[inline]
    #[must_use]
    pub const fn num(value: u64) -> Self {
        Self::Num(value)
    }

    /// Creates a string field from UTF-8 text.
    #[inline]
    #[must_use]
    pub fn str(value: &str) -> Self {
        Self::Str(Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Creates a string field from raw bytes.
    #[inline]
    #[must_use]
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Str(value.into())
    }

    /// Returns the numeric value, if this is a number.
    #[inline]
    #[must_use]
    pub fn as_num(&self) -> Option<u64> {
        match self {
            Self::Num(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// Returns the raw bytes, if this is a string.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Num(_) => None,
            Self::Str(b) => Some(b),
        }
    }

    /// Returns the value as text, if this is a valid UTF-8 string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns a short name of the value kind, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Num(_) => "NUM",
            Self::Str(_) => "STR",
        }
    }

    /// Returns the approximate in-memory size of the value in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Num(_) => 8,
            Self::Str(b) => b.len(),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(v) => write!(f, "{}", v),
            Self::Str(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<u32> for Field {
    fn from(value: u32) -> Self {
        Self::Num(u64::from(value))
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Self::Str(Bytes::from(value))
    }
}
