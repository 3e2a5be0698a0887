//! Content shape classification.
//!
//! Every record carries arbitrary JSON content. The grid needs to know which
//! shape a value has before deciding whether it can be shown as-is or has to
//! be rendered as text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of a piece of record content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Anything else, i.e. JSON `null`
    Unknown,
}

impl ContentKind {
    /// Whether values of this kind can be placed in a grid cell unchanged.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ContentKind::String | ContentKind::Number | ContentKind::Boolean
        )
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::String => write!(f, "string"),
            ContentKind::Number => write!(f, "number"),
            ContentKind::Boolean => write!(f, "boolean"),
            ContentKind::Array => write!(f, "array"),
            ContentKind::Object => write!(f, "object"),
            ContentKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a JSON value.
///
/// Scalars are tested first, then objects, then arrays; `null` is `Unknown`.
pub fn classify(value: &Value) -> ContentKind {
    match value {
        Value::String(_) => ContentKind::String,
        Value::Number(_) => ContentKind::Number,
        Value::Bool(_) => ContentKind::Boolean,
        Value::Object(_) => ContentKind::Object,
        Value::Array(_) => ContentKind::Array,
        Value::Null => ContentKind::Unknown,
    }
}
