//! WebSocket message protocol definitions.
//!
//! Dashboard messages are JSON-encoded, tagged by `type` and use snake_case
//! for field names. Feed connections send engine feed messages instead and
//! only ever receive the `frame_applied`, `pong` and `error` variants.

use cachegrid_engine::{ColumnList, ContentKind, RowList, TypeName};
use serde::{Deserialize, Serialize};

/// Messages sent from a dashboard to the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Follow one type's rows and columns.
    Select {
        /// Type to follow
        type_name: TypeName,
    },

    /// Stop following the selected type.
    Deselect,

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full sorted list of types, sent on connect and when it changes.
    Types { types: Vec<TypeName> },

    /// Rows and columns of the selected type.
    TypeData {
        type_name: TypeName,
        records: RowList,
        columns: ColumnList,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_kind: Option<ContentKind>,
    },

    /// The selected type no longer exists.
    TypeRemoved { type_name: TypeName },

    /// The projection was cleared.
    Cleared,

    /// A feed frame was assembled and applied.
    FrameApplied {
        id: String,
        is_cache_image: bool,
        puts: usize,
        removes: usize,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Machine-readable error code
        code: String,
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&cachegrid_engine::Error> for ServerMessage {
    fn from(err: &cachegrid_engine::Error) -> Self {
        ServerMessage::error(err.code(), err.to_string())
    }
}
