//! Object space schema configuration.
//!
//! Mirrors the classic `object_space[N].index[M].key_field[K]` layout:
//!
//! ```toml
//! [[object_space]]
//! id = 0
//! cardinality = 2
//!
//! [[object_space.index]]
//! type = "TREE"
//! unique = true
//!
//! [[object_space.index.key_field]]
//! fieldno = 0
//! type = "NUM"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::constants::{MAX_INDEXES, MAX_KEY_FIELDS, MAX_TUPLE_FIELDS};
use crate::error::{CairnError, CairnResult};
use crate::types::{FieldType, SpaceId};

/// Index structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Hash index: point lookups only.
    #[serde(rename = "HASH")]
    Hash,
    /// Ordered tree index: point lookups, partial keys and range scans.
    #[serde(rename = "TREE")]
    Tree,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => f.write_str("HASH"),
            Self::Tree => f.write_str("TREE"),
        }
    }
}

/// One field of an index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFieldConfig {
    /// Position of the field within the tuple.
    pub fieldno: usize,
    /// Declared field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl KeyFieldConfig {
    /// Creates a key field descriptor.
    #[must_use]
    pub const fn new(fieldno: usize, field_type: FieldType) -> Self {
        Self {
            fieldno,
            field_type,
        }
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index structure.
    #[serde(rename = "type")]
    pub kind: IndexKind,
    /// Whether keys must be unique.
    #[serde(default = "default_unique")]
    pub unique: bool,
    /// Key fields in comparison priority order.
    pub key_field: Vec<KeyFieldConfig>,
}

fn default_unique() -> bool {
    true
}

impl IndexConfig {
    /// Creates a unique index over the given key fields.
    #[must_use]
    pub fn new(kind: IndexKind, key_field: Vec<KeyFieldConfig>) -> Self {
        Self {
            kind,
            unique: true,
            key_field,
        }
    }

    /// Creates a unique tree index over a single field.
    #[must_use]
    pub fn tree(fieldno: usize, field_type: FieldType) -> Self {
        Self::new(IndexKind::Tree, vec![KeyFieldConfig::new(fieldno, field_type)])
    }

    /// Creates a unique hash index over a single field.
    #[must_use]
    pub fn hash(fieldno: usize, field_type: FieldType) -> Self {
        Self::new(IndexKind::Hash, vec![KeyFieldConfig::new(fieldno, field_type)])
    }

    /// Sets the uniqueness flag.
    #[must_use]
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    fn validate(&self, space_id: SpaceId, index: usize) -> CairnResult<()> {
        let fail = |msg: String| {
            Err(CairnError::invalid_config(format!(
                "space {} index {}: {}",
                space_id, index, msg
            )))
        };

        if self.key_field.is_empty() {
            return fail("index must have at least one key field".into());
        }
        if self.key_field.len() > MAX_KEY_FIELDS {
            return fail(format!(
                "{} key fields exceeds maximum {}",
                self.key_field.len(),
                MAX_KEY_FIELDS
            ));
        }
        let mut seen = HashSet::new();
        for kf in &self.key_field {
            if kf.fieldno >= MAX_TUPLE_FIELDS {
                return fail(format!("fieldno {} out of range", kf.fieldno));
            }
            if !seen.insert(kf.fieldno) {
                return fail(format!("fieldno {} used twice", kf.fieldno));
            }
        }
        if index == 0 && !self.unique {
            return fail("primary index must be unique".into());
        }
        if self.kind == IndexKind::Hash && !self.unique {
            return fail("HASH index must be unique".into());
        }
        Ok(())
    }
}

/// Object space definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Space number.
    pub id: SpaceId,
    /// Whether the space is created at startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Exact number of fields every tuple must have, if set.
    #[serde(default)]
    pub cardinality: Option<usize>,
    /// Indexes; the first one is the primary index.
    pub index: Vec<IndexConfig>,
}

fn default_enabled() -> bool {
    true
}

impl SpaceConfig {
    /// Creates a space with a primary index.
    #[must_use]
    pub fn new(id: u32, primary: IndexConfig) -> Self {
        Self {
            id: SpaceId::new(id),
            enabled: true,
            cardinality: None,
            index: vec![primary],
        }
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index.push(index);
        self
    }

    /// Sets the required tuple cardinality.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// Returns the primary index definition.
    #[must_use]
    pub fn primary(&self) -> Option<&IndexConfig> {
        self.index.first()
    }

    /// Validates the definition.
    ///
    /// A field used by several indexes must be declared with the same type
    /// everywhere, and every key field must fit within `cardinality`.
    pub fn validate(&self) -> CairnResult<()> {
        if self.index.is_empty() {
            return Err(CairnError::invalid_config(format!(
                "space {} has no primary index",
                self.id
            )));
        }
        if self.index.len() > MAX_INDEXES {
            return Err(CairnError::invalid_config(format!(
                "space {} has {} indexes, maximum is {}",
                self.id,
                self.index.len(),
                MAX_INDEXES
            )));
        }
        if let Some(c) = self.cardinality {
            if c == 0 || c > MAX_TUPLE_FIELDS {
                return Err(CairnError::invalid_config(format!(
                    "space {}: cardinality {} out of range",
                    self.id, c
                )));
            }
        }

        let mut types: Vec<Option<FieldType>> = Vec::new();
        for (i, index) in self.index.iter().enumerate() {
            index.validate(self.id, i)?;
            for kf in &index.key_field {
                if let Some(c) = self.cardinality {
                    if kf.fieldno >= c {
                        return Err(CairnError::invalid_config(format!(
                            "space {} index {}: fieldno {} exceeds cardinality {}",
                            self.id, i, kf.fieldno, c
                        )));
                    }
                }
                if types.len() <= kf.fieldno {
                    types.resize(kf.fieldno + 1, None);
                }
                match types[kf.fieldno] {
                    Some(t) if t != kf.field_type => {
                        return Err(CairnError::invalid_config(format!(
                            "space {}: field {} declared as both {} and {}",
                            self.id, kf.fieldno, t, kf.field_type
                        )));
                    }
                    _ => types[kf.fieldno] = Some(kf.field_type),
                }
            }
        }
        Ok(())
    }
}
