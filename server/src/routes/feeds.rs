//! Feed connection status route.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::websocket::{ConnectionInfo, ConnectionKind};
use crate::AppState;

/// Connected feeds.
#[derive(Serialize)]
pub struct FeedsResponse {
    pub feeds: Vec<ConnectionInfo>,
}

/// Create feed status routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/feeds", get(feeds_handler))
}

/// GET /feeds - Lifecycle status of every feed connection.
async fn feeds_handler(State(state): State<AppState>) -> Json<FeedsResponse> {
    Json(FeedsResponse {
        feeds: state.conn_manager.list(ConnectionKind::Feed),
    })
}
