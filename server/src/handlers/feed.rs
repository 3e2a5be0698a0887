//! Feed WebSocket handler.
//!
//! A feed connection streams framed change-sets. Each connection owns its own
//! frame assembler; complete frames are handed to the projection writer.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use cachegrid_engine::{FeedMessage, FrameAssembler};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::projection::Projection;
use crate::websocket::{ConnectionKind, ConnectionManager, ServerMessage};

/// Handle an established feed connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing messages
/// 3. Assembles incoming messages into frames and applies them
/// 4. Cleans up on disconnect
pub async fn handle_feed_connection(
    socket: WebSocket,
    projection: Projection,
    conn_manager: Arc<ConnectionManager>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(ConnectionKind::Feed, tx);
    tracing::info!(conn_id = %conn_id, "Feed connected");

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

    let mut assembler = FrameAssembler::new();

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match process_feed_text(&text, &mut assembler, &projection).await {
                    Ok(Some(ack)) => {
                        conn_manager.record_frame(&conn_id);
                        conn_manager.send_to(&conn_id, ack);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let reply = error_message(&e);
                        if let ServerMessage::Error { code, message } = &reply {
                            tracing::warn!(
                                conn_id = %conn_id,
                                code = %code,
                                "Feed error: {}",
                                message
                            );
                            conn_manager.record_error(&conn_id, code, message);
                        }
                        conn_manager.send_to(&conn_id, reply);
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(conn_id = %conn_id, "Binary messages not supported");
                conn_manager.send_to(
                    &conn_id,
                    ServerMessage::error("unsupported", "binary messages are not supported"),
                );
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "Feed close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                conn_manager.record_error(&conn_id, "transport", &e.to_string());
                break;
            }
        }
    }

    conn_manager.mark_disconnecting(&conn_id);
    if assembler.in_frame() {
        tracing::warn!(conn_id = %conn_id, "Feed disconnected mid-frame; partial frame dropped");
    }
    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "Feed disconnected"
    );
}

/// Decode one feed message and advance the assembler.
///
/// Returns an acknowledgement once a frame completes and has been applied.
/// On error the assembler has already dropped the frame in progress.
pub async fn process_feed_text(
    text: &str,
    assembler: &mut FrameAssembler,
    projection: &Projection,
) -> Result<Option<ServerMessage>, AppError> {
    let message = match FeedMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            assembler.reset();
            return Err(e.into());
        }
    };

    let Some(frame) = assembler.push(message)? else {
        return Ok(None);
    };

    let puts = frame.changes.puts.len();
    let removes = frame.changes.removes.len();

    let report = if frame.is_cache_image {
        projection.apply_image(frame.changes).await?
    } else {
        projection.apply(frame.changes).await?
    };

    tracing::debug!(
        frame_id = %frame.id,
        is_cache_image = frame.is_cache_image,
        puts,
        removes,
        touched = report.touched.len(),
        "Frame applied"
    );

    Ok(Some(ServerMessage::FrameApplied {
        id: frame.id,
        is_cache_image: frame.is_cache_image,
        puts,
        removes,
    }))
}

fn error_message(err: &AppError) -> ServerMessage {
    match err {
        AppError::Engine(e) => ServerMessage::from(e),
        other => ServerMessage::error("internal", other.to_string()),
    }
}
