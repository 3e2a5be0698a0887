//! Write routes: push a change-set or clear the projection.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use cachegrid_engine::{ApplyReport, ChangeSet};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::AppState;

/// Create write routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/changes", post(changes_handler))
        .route("/clear", post(clear_handler))
}

/// POST /changes - Apply a change-set to the projection.
async fn changes_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(changes): Json<ChangeSet>,
) -> Result<Json<ApplyReport>> {
    tracing::debug!(
        puts = changes.puts.len(),
        removes = changes.removes.len(),
        "Change-set received over HTTP"
    );
    let report = state.projection.apply(changes).await?;
    Ok(Json(report))
}

/// POST /clear - Drop every record, column and cached signature.
async fn clear_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<StatusCode> {
    state.projection.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
