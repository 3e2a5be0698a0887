//! Type, row and column query routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{
    columns_for_type, list_types, records_for_type, ColumnsResponse, RecordsQuery,
    RecordsResponse, TypesQuery, TypesResponse,
};
use crate::AppState;

/// Create type query routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/types", get(types_handler))
        .route("/types/{type_name}/records", get(records_handler))
        .route("/types/{type_name}/columns", get(columns_handler))
}

/// GET /types - Sorted type names, optionally filtered.
async fn types_handler(
    State(state): State<AppState>,
    Query(query): Query<TypesQuery>,
) -> Result<Json<TypesResponse>> {
    let snapshot = state.projection.snapshot();
    Ok(Json(list_types(&snapshot.state, &query)?))
}

/// GET /types/{type_name}/records - Rows of one type, sorted by id.
async fn records_handler(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>> {
    let snapshot = state.projection.snapshot();
    Ok(Json(records_for_type(&snapshot.state, &type_name, &query)?))
}

/// GET /types/{type_name}/columns - Column definitions of one type.
async fn columns_handler(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
) -> Result<Json<ColumnsResponse>> {
    let snapshot = state.projection.snapshot();
    Ok(Json(columns_for_type(&snapshot.state, &type_name)?))
}
