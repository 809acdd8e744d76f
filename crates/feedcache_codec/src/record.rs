//! The cached record type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a record.
pub type RecordId = i64;

/// Record category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Category A.
    A,
    /// Category B.
    B,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::A => f.write_str("a"),
            Category::B => f.write_str("b"),
        }
    }
}

/// A single record of the mirrored collection.
///
/// Records are immutable once read. A change always carries the whole
/// record; the cache never merges fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: Category,
    /// Numeric payload.
    pub number: i64,
}

impl Record {
    /// Creates a record.
    pub fn new(id: RecordId, name: impl Into<String>, category: Category, number: i64) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            number,
        }
    }
}
