//! Change events emitted by the record store's change feed.

use crate::error::{CodecError, CodecResult};
use crate::record::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A record was created.
    Insert,
    /// A record was replaced wholesale.
    Replace,
    /// A record was modified; the event carries the post-image.
    Update,
    /// A record was removed.
    Delete,
}

impl OperationType {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Replace => "replace",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }

    /// Returns true for operations that carry a full document.
    pub fn is_upsert(&self) -> bool {
        !matches!(self, OperationType::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation observed on the remote store, in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Type of change.
    pub operation: OperationType,
    /// Id of the affected record. Always present.
    pub document_key: RecordId,
    /// Post-image of the record. `None` for deletes.
    pub full_document: Option<Record>,
}

impl ChangeEvent {
    /// Creates an insert event.
    pub fn insert(record: Record) -> Self {
        Self::upsert(OperationType::Insert, record)
    }

    /// Creates a replace event.
    pub fn replace(record: Record) -> Self {
        Self::upsert(OperationType::Replace, record)
    }

    /// Creates an update event.
    pub fn update(record: Record) -> Self {
        Self::upsert(OperationType::Update, record)
    }

    /// Creates a delete event.
    pub fn delete(id: RecordId) -> Self {
        Self {
            operation: OperationType::Delete,
            document_key: id,
            full_document: None,
        }
    }

    fn upsert(operation: OperationType, record: Record) -> Self {
        Self {
            operation,
            document_key: record.id,
            full_document: Some(record),
        }
    }

    /// Checks the shape of a decoded event.
    ///
    /// Non-delete events must carry a document whose id equals the key.
    pub fn validate(&self) -> CodecResult<()> {
        if !self.operation.is_upsert() {
            return Ok(());
        }
        match &self.full_document {
            None => Err(CodecError::MissingDocument {
                operation: self.operation.as_str(),
                key: self.document_key,
            }),
            Some(doc) if doc.id != self.document_key => Err(CodecError::KeyMismatch {
                key: self.document_key,
                document_id: doc.id,
            }),
            Some(_) => Ok(()),
        }
    }
}
