// handlers/protected/users.rs - Profile and avatar endpoints layered on /users

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};

use super::resource::Resource;
use crate::database::models::User;
use crate::database::{parse_id, Changeset, Repository};
use crate::error::ApiError;
use crate::middleware::validated_json::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::schema::user::UpdateUser;
use crate::state::AppState;
use crate::uploads::{read_field, AVATAR_MAX_BYTES};

// multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// GET /users/me - the authenticated user's own record
pub async fn me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let row = Repository::<User>::new(state.pool.clone())
        .get(user.user_id, User::PRELOADS)
        .await?;
    Ok(ApiResponse::success(row))
}

/// PUT /users/me - update the caller's record, resolved from the token claims
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Value> {
    let patch: UpdateUser = parse_body(&body)?;
    let row = Repository::<User>::new(state.pool.clone())
        .update_by_id(user.user_id, &patch, User::PRELOADS)
        .await?;
    Ok(ApiResponse::success(row))
}

/// POST /users/:id/avatar - multipart field `avatar`
///
/// Expected Output (201):
/// ```json
/// { "message": "Avatar uploaded successfully", "avatar": "avatars/<uuid>.png", "avatar_url": "/uploads/avatars/<uuid>.png" }
/// ```
pub async fn upload_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let repo = Repository::<User>::new(state.pool.clone());
    let user = repo.find(id).await?;

    let file = read_field(&mut multipart, "avatar", AVATAR_MAX_BYTES).await?;
    let stored = state.uploads.save_avatar(&file).await?;

    let mut changeset = Changeset::new();
    changeset.set("avatar", stored.relative_path.clone());
    if let Err(e) = repo.apply(id, &changeset).await {
        // keep disk and row in step
        if let Err(cleanup) = state.uploads.remove(&stored.relative_path).await {
            tracing::warn!("Failed to remove orphaned avatar {}: {}", stored.relative_path, cleanup);
        }
        return Err(e.into());
    }

    if let Some(previous) = user.avatar.as_deref().filter(|p| !p.is_empty()) {
        if let Err(e) = state.uploads.remove(previous).await {
            tracing::warn!("Failed to remove previous avatar {} for user {}: {}", previous, id, e);
        }
    }

    Ok(ApiResponse::created(json!({
        "message": "Avatar uploaded successfully",
        "avatar": stored.relative_path,
        "avatar_url": avatar_url(&stored.relative_path),
    })))
}

/// DELETE /users/:id/avatar - remove the file and clear the column
pub async fn delete_avatar(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let repo = Repository::<User>::new(state.pool.clone());
    let user = repo.find(id).await?;

    let avatar = user
        .avatar
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("User has no avatar"))?;

    state.uploads.remove(avatar).await?;

    let mut changeset = Changeset::new();
    changeset.set("avatar", None::<String>);
    repo.apply(id, &changeset).await?;

    Ok(ApiResponse::success(json!({ "message": "Avatar deleted successfully" })))
}

pub fn avatar_url(relative_path: &str) -> String {
    format!("/uploads/{}", relative_path)
}

/// Extra routes merged into the `/users` resource router
pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me).put(update_me)).route(
        "/:id/avatar",
        post(upload_avatar)
            .delete(delete_avatar)
            .layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES + MULTIPART_OVERHEAD)),
    )
}
