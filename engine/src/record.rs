//! Record and change-set types received from a feed.

use crate::{RecordId, TypeName};
use serde::{Deserialize, Serialize};

/// A record as delivered by a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique across the whole store
    pub id: RecordId,
    /// Partition this record belongs to
    #[serde(rename = "type")]
    pub record_type: TypeName,
    /// Arbitrary JSON content
    pub content: serde_json::Value,
}

impl Record {
    /// Create a new record.
    pub fn new(
        id: impl Into<RecordId>,
        record_type: impl Into<TypeName>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            content,
        }
    }
}

/// Request to delete a record. The partition is found by searching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRequest {
    pub id: RecordId,
}

impl RemovalRequest {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self { id: id.into() }
    }
}

/// A batch of puts and removes applied atomically.
///
/// Puts are applied first, in order, then removes, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub puts: Vec<Record>,
    #[serde(default)]
    pub removes: Vec<RemovalRequest>,
}

impl ChangeSet {
    /// Create an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to add a put.
    pub fn put(mut self, record: Record) -> Self {
        self.puts.push(record);
        self
    }

    /// Builder-style method to add a remove.
    pub fn remove(mut self, id: impl Into<RecordId>) -> Self {
        self.removes.push(RemovalRequest::new(id));
        self
    }

    /// True when the change-set carries neither puts nor removes.
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.removes.is_empty()
    }

    /// Total number of puts and removes.
    pub fn len(&self) -> usize {
        self.puts.len() + self.removes.len()
    }
}
