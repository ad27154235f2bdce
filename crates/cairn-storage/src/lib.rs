//! # cairn-storage
//!
//! In-memory storage for Cairn: object spaces, their hash and tree indexes,
//! field update operations, and directional iterators.
//!
//! ```
//! use cairn_common::config::{IndexConfig, SpaceConfig};
//! use cairn_common::types::{Field, FieldType, InsertMode};
//! use cairn_common::tuple;
//! use cairn_storage::ObjectSpace;
//!
//! let space = ObjectSpace::new(&SpaceConfig::new(0, IndexConfig::tree(0, FieldType::Num))).unwrap();
//! space.insert(tuple![1u64, "foo"], InsertMode::Add).unwrap();
//! let found = space.get(&[Field::num(1)]).unwrap().unwrap();
//! assert_eq!(found.to_string(), r#"[1, "foo"]"#);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod index;
pub mod iterator;
pub mod key;
pub mod space;
pub mod update;

pub use error::{StorageError, StorageResult};
pub use index::{Index, IndexDef};
pub use iterator::{Direction, IteratorOptions, TupleIterator};
pub use key::{IndexKey, KeyDef, KeyPart};
pub use space::{ObjectSpace, SpaceStats};
pub use update::apply_ops;
