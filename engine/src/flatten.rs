//! Flattening records into grid rows.
//!
//! Object content is spread into one column per key. Anything else lands in a
//! single `content` column. Nested values are rendered as compact JSON text so
//! every cell holds a scalar.

use crate::classify::{classify, ContentKind};
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Column holding the record id.
pub const ID_FIELD: &str = "id";
/// Column holding the record type.
pub const TYPE_FIELD: &str = "type";
/// Column used for records whose content is not an object.
pub const CONTENT_FIELD: &str = "content";

/// A flat, grid-ready view of a record: column name to scalar cell value.
///
/// Keys are kept sorted, so two rows built from equal records compare equal
/// and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRow(BTreeMap<String, Value>);

impl FlatRow {
    /// Get a cell by column name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The record id.
    pub fn id(&self) -> &str {
        self.0.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default()
    }

    /// The record type.
    pub fn record_type(&self) -> &str {
        self.0
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Column names in ascending order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sorted column names, used as the row's shape key.
    ///
    /// Kept as a list rather than joined text: field names may contain any
    /// separator.
    pub fn signature(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// Render a value as cell text: strings verbatim, everything else as JSON.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a record into a grid row.
pub fn flatten(record: &Record) -> FlatRow {
    let mut cells = BTreeMap::new();

    match &record.content {
        Value::Object(fields) => {
            for (key, value) in fields {
                let cell = if classify(value).is_scalar() {
                    value.clone()
                } else {
                    Value::String(value.to_string())
                };
                cells.insert(key.clone(), cell);
            }
        }
        other => {
            cells.insert(CONTENT_FIELD.to_string(), Value::String(display_text(other)));
        }
    }

    // The record's own id and type always win over same-named content keys.
    cells.insert(ID_FIELD.to_string(), Value::String(record.id.clone()));
    cells.insert(
        TYPE_FIELD.to_string(),
        Value::String(record.record_type.clone()),
    );

    FlatRow(cells)
}

/// Content kind of every column `flatten` produces for this record.
pub fn field_kinds(record: &Record) -> BTreeMap<String, ContentKind> {
    let mut kinds = BTreeMap::new();

    match &record.content {
        Value::Object(fields) => {
            for (key, value) in fields {
                kinds.insert(key.clone(), classify(value));
            }
        }
        other => {
            kinds.insert(CONTENT_FIELD.to_string(), classify(other));
        }
    }

    kinds.insert(ID_FIELD.to_string(), ContentKind::String);
    kinds.insert(TYPE_FIELD.to_string(), ContentKind::String);
    kinds
}
