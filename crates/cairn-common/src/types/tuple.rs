//! Tuples: ordered, immutable sequences of fields.

use std::fmt;
use std::ops::Index;

use super::Field;

/// An ordered sequence of fields.
///
/// Tuples are never modified once stored; an update builds a new tuple and
/// swaps it in. The storage engine shares stored tuples as `Arc<Tuple>`, so
/// a reader holding one keeps a consistent snapshot of the row.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Tuple {
    fields: Vec<Field>,
}

impl Tuple {
    /// Creates a tuple from its fields.
    #[inline]
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the tuple has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at `fieldno`.
    #[inline]
    #[must_use]
    pub fn get(&self, fieldno: usize) -> Option<&Field> {
        self.fields.get(fieldno)
    }

    /// Returns all fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Consumes the tuple, returning its fields.
    #[inline]
    #[must_use]
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Returns the approximate payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.fields.iter().map(Field::size).sum()
    }
}

impl Index<usize> for Tuple {
    type Output = Field;

    fn index(&self, fieldno: usize) -> &Field {
        &self.fields[fieldno]
    }
}

impl From<Vec<Field>> for Tuple {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str("]")
    }
}

/// Builds a [`Tuple`] from a list of values convertible into [`Field`].
///
/// ```rust
/// use cairn_common::tuple;
///
/// let t = tuple![1u32, "foo"];
/// assert_eq!(t.to_string(), r#"[1, "foo"]"#);
/// ```
#[macro_export]
macro_rules! tuple {
    ($($field:expr),* $(,)?) => {
        $crate::types::Tuple::new(vec![$($crate::types::Field::from($field)),*])
    };
}
