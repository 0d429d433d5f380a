// handlers/protected/auth.rs - Account endpoints for an authenticated caller

use axum::{
    extract::State,
    routing::{get, put},
    Extension, Router,
};
use serde_json::{json, Value};

use crate::handlers::public::auth::issue_token;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidatedJson};
use crate::schema::auth::{AuthResponse, ChangePasswordRequest};
use crate::services::AccountService;
use crate::state::AppState;

/// GET /auth/userinfo - The caller's identity plus a fresh token
pub async fn userinfo(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<AuthResponse> {
    let account = AccountService::new(state.pool.clone())
        .touch_last_login(user.user_id)
        .await?;
    Ok(ApiResponse::success(issue_token(&state, &account)?))
}

/// PUT /auth/password - Change the caller's password
///
/// Expected Input:
/// ```json
/// { "current_password": "...", "new_password": "...", "confirm_password": "..." }
/// ```
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Value> {
    AccountService::new(state.pool.clone())
        .change_password(user.user_id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/userinfo", get(userinfo))
        .route("/auth/password", put(change_password))
}
