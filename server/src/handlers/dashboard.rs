//! Dashboard WebSocket handler and change publisher.
//!
//! Dashboards get the type list on connect and may follow one type. A single
//! publisher task diffs consecutive snapshots by pointer identity and pushes
//! only what changed: the type list, the followed type's rows, or its removal.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use cachegrid_engine::StoreState;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::queries::type_data;
use crate::projection::{Projection, Snapshot};
use crate::websocket::{ClientMessage, ConnectionKind, ConnectionManager, ServerMessage};

/// Handle an established dashboard connection.
pub async fn handle_dashboard_connection(
    socket: WebSocket,
    projection: Projection,
    conn_manager: Arc<ConnectionManager>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(ConnectionKind::Dashboard, tx);
    tracing::info!(conn_id = %conn_id, "Dashboard connected");

    conn_manager.send_to(&conn_id, types_message(&projection.snapshot().state));

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = process_message(&text, &projection, &conn_manager, &conn_id) {
                    conn_manager.send_to(&conn_id, reply);
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "Dashboard close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.mark_disconnecting(&conn_id);
    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "Dashboard disconnected"
    );
}

/// Process a dashboard message. Returns a direct reply, if any.
fn process_message(
    text: &str,
    projection: &Projection,
    conn_manager: &ConnectionManager,
    conn_id: &str,
) -> Option<ServerMessage> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return Some(ServerMessage::error(
                "invalid_message",
                format!("Invalid message format: {}", e),
            ));
        }
    };

    match client_msg {
        ClientMessage::Select { type_name } => {
            tracing::debug!(conn_id = %conn_id, type_name = %type_name, "Dashboard selected type");
            let mut unknown = false;
            conn_manager.select_type(conn_id, Some(type_name.clone()), |_| {
                // The publisher skips snapshots up to this version for us.
                let snapshot = projection.snapshot();
                let message = type_data(&snapshot.state, &type_name);
                unknown = message.is_none();
                (snapshot.version, message)
            });
            // The selection is kept; rows arrive once the type appears.
            unknown.then(|| {
                ServerMessage::error("unknown_type", format!("type {type_name} has no records"))
            })
        }
        ClientMessage::Deselect => {
            conn_manager.select_type(conn_id, None, |_| (0, None));
            None
        }
        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}

fn types_message(state: &StoreState) -> ServerMessage {
    ServerMessage::Types {
        types: state.types().to_vec(),
    }
}

/// Push every published snapshot to the dashboards until the projection
/// writer stops.
pub async fn run_publisher(projection: Projection, conn_manager: Arc<ConnectionManager>) {
    let mut updates = projection.subscribe();
    let mut previous = updates.borrow_and_update().clone();

    while updates.changed().await.is_ok() {
        let next = updates.borrow_and_update().clone();
        publish_changes(&previous, &next, &conn_manager);
        previous = next;
    }

    tracing::debug!("Dashboard publisher stopped");
}

/// Send dashboards what changed between two snapshots.
pub fn publish_changes(previous: &Snapshot, next: &Snapshot, conn_manager: &ConnectionManager) {
    if next.clear_epoch != previous.clear_epoch {
        conn_manager.broadcast_dashboards(ServerMessage::Cleared);
    }

    if !Arc::ptr_eq(previous.state.types(), next.state.types()) {
        let sent = conn_manager.broadcast_dashboards(types_message(&next.state));
        tracing::debug!(
            recipients = sent,
            types = next.state.types().len(),
            "Broadcast type list"
        );
    }

    conn_manager.send_per_selection(next.version, |selected| {
        selection_update(&previous.state, &next.state, selected)
    });
}

/// What a dashboard following `type_name` needs to hear, if anything.
fn selection_update(
    previous: &StoreState,
    next: &StoreState,
    type_name: &str,
) -> Option<ServerMessage> {
    match (previous.rows(type_name), next.rows(type_name)) {
        (Some(old), Some(new)) => {
            let columns_same = match (previous.columns(type_name), next.columns(type_name)) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };
            if Arc::ptr_eq(old, new) && columns_same {
                None
            } else {
                type_data(next, type_name)
            }
        }
        (None, Some(_)) => type_data(next, type_name),
        (Some(_), None) => Some(ServerMessage::TypeRemoved {
            type_name: type_name.to_string(),
        }),
        (None, None) => None,
    }
}
