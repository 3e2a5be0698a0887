//! WebSocket upgrade routes.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::handlers::{handle_dashboard_connection, handle_feed_connection};
use crate::AppState;

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed_upgrade))
        .route("/dashboard", get(dashboard_upgrade))
}

/// GET /feed - Inbound change-set stream.
async fn feed_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Response {
    ws.on_upgrade(move |socket| {
        handle_feed_connection(socket, state.projection, state.conn_manager)
    })
}

/// GET /dashboard - Live type list and rows of the followed type.
async fn dashboard_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        handle_dashboard_connection(socket, state.projection, state.conn_manager)
    })
}
