// handlers/protected/lookups.rs - GET /lookups/:kind

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde_json::Value;

use crate::database::models::LookupKind;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// List one seeded reference table, ordered by position (priorities by level)
pub async fn list(State(state): State<AppState>, Path(kind): Path<String>) -> ApiResult<Vec<Value>> {
    let lookup = LookupKind::from_slug(&kind).ok_or_else(|| {
        let known: Vec<&str> = LookupKind::ALL.iter().map(LookupKind::slug).collect();
        ApiError::not_found(format!("Unknown lookup '{}'; expected one of: {}", kind, known.join(", ")))
    })?;

    let rows = lookup.list(&state.pool).await?;
    Ok(ApiResponse::success(rows))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/:kind", get(list))
}
