//! WebSocket connection manager.
//!
//! Tracks active feed and dashboard connections, their lifecycle and the
//! type each dashboard follows, and fans server messages out to them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// What a connection is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Feed,
    Dashboard,
}

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnecting,
}

/// The last error a feed connection reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub code: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    pub kind: ConnectionKind,
    pub status: ConnectionStatus,
    pub connected_at: DateTime<Utc>,
    /// Frames applied (feeds only)
    pub frames_applied: u64,
    pub last_error: Option<LastError>,
    /// Type followed by a dashboard
    pub selected_type: Option<String>,
    /// Snapshot version the current selection was first served from
    pub selection_version: u64,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Public view of a connection, as served by `GET /feeds`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub kind: ConnectionKind,
    pub status: ConnectionStatus,
    pub connected_at: DateTime<Utc>,
    pub frames_applied: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
}

impl From<&Connection> for ConnectionInfo {
    fn from(conn: &Connection) -> Self {
        Self {
            id: conn.id.clone(),
            kind: conn.kind,
            status: conn.status,
            connected_at: conn.connected_at,
            frames_applied: conn.frames_applied,
            last_error: conn.last_error.clone(),
        }
    }
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    pub(crate) connections: DashMap<String, Connection>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, kind: ConnectionKind, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        let connection = Connection {
            id: conn_id.clone(),
            kind,
            status: ConnectionStatus::Connected,
            connected_at: Utc::now(),
            frames_applied: 0,
            last_error: None,
            selected_type: None,
            selection_version: 0,
            sender,
        };

        self.connections.insert(conn_id.clone(), connection);

        tracing::info!(conn_id = %conn_id, kind = ?kind, "WebSocket connection registered");

        conn_id
    }

    /// Mark a connection as closing. It stays listed until unregistered.
    pub fn mark_disconnecting(&self, conn_id: &str) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            conn.status = ConnectionStatus::Disconnecting;
        }
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            tracing::info!(
                conn_id = %conn_id,
                kind = ?conn.kind,
                frames_applied = conn.frames_applied,
                "WebSocket connection unregistered"
            );
        }
    }

    /// Count a frame applied by a feed.
    pub fn record_frame(&self, conn_id: &str) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            conn.frames_applied += 1;
        }
    }

    /// Remember the last error a connection hit.
    pub fn record_error(&self, conn_id: &str, code: &str, message: &str) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            conn.last_error = Some(LastError {
                code: code.to_string(),
                message: message.to_string(),
                at: Utc::now(),
            });
        }
    }

    /// Change the type a dashboard follows and send it the first message for
    /// that selection while the entry is locked.
    ///
    /// `initial` returns the snapshot version it read along with the message.
    /// Later per-selection updates from snapshots no newer than that are
    /// skipped.
    pub fn select_type(
        &self,
        conn_id: &str,
        type_name: Option<String>,
        initial: impl FnOnce(Option<&str>) -> (u64, Option<ServerMessage>),
    ) -> bool {
        let Some(mut conn) = self.connections.get_mut(conn_id) else {
            return false;
        };

        conn.selected_type = type_name;
        let (version, message) = initial(conn.selected_type.as_deref());
        conn.selection_version = version;
        match message {
            Some(message) => conn.sender.send(message).is_ok(),
            None => true,
        }
    }

    /// Broadcast a message to every dashboard.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_dashboards(&self, message: ServerMessage) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.kind == ConnectionKind::Dashboard && conn.sender.send(message.clone()).is_ok()
            {
                sent_count += 1;
            }
        }

        sent_count
    }

    /// Send each dashboard a message built from its selected type, for the
    /// snapshot at `version`.
    ///
    /// Dashboards whose selection was served from `version` or later are
    /// skipped. Returns the number of connections that received a message.
    pub fn send_per_selection(
        &self,
        version: u64,
        mut message_for: impl FnMut(&str) -> Option<ServerMessage>,
    ) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.kind != ConnectionKind::Dashboard {
                continue;
            }
            let Some(selected) = conn.selected_type.as_deref() else {
                continue;
            };
            if conn.selection_version >= version {
                continue;
            }
            if let Some(message) = message_for(selected) {
                if conn.sender.send(message).is_ok() {
                    sent_count += 1;
                }
            }
        }

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.sender.send(message).is_ok()
        } else {
            false
        }
    }

    /// Snapshot of the connections of one kind, oldest first.
    pub fn list(&self, kind: ConnectionKind) -> Vec<ConnectionInfo> {
        let mut infos: Vec<ConnectionInfo> = self
            .connections
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| ConnectionInfo::from(entry.value()))
            .collect();
        infos.sort_by(|a, b| a.connected_at.cmp(&b.connected_at).then(a.id.cmp(&b.id)));
        infos
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
