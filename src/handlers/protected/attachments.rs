// handlers/protected/attachments.rs - Ticket file uploads and attachment removal

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Extension, Router,
};

use super::resource::{list, show};
use crate::database::models::{Ticket, TicketAttachment};
use crate::database::{parse_id, DatabaseError, DeleteConfirmation, Repository};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::uploads::{read_field, StoredFile, ATTACHMENT_MAX_BYTES};

const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// POST /tickets/:id/attachments - multipart field `file`, at most 10 MB
pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<TicketAttachment> {
    let ticket_id = parse_id(&id)?;
    Repository::<Ticket>::new(state.pool.clone()).find(ticket_id).await?;

    let file = read_field(&mut multipart, "file", ATTACHMENT_MAX_BYTES).await?;
    let stored = state.uploads.save_attachment(&file).await?;

    let attachment = match insert_attachment(&state, ticket_id, &stored, user.user_id).await {
        Ok(attachment) => attachment,
        Err(e) => {
            if let Err(cleanup) = state.uploads.remove(&stored.relative_path).await {
                tracing::warn!("Failed to remove orphaned attachment {}: {}", stored.relative_path, cleanup);
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        "User {} attached {} ({} bytes) to ticket {}",
        user.user_id,
        attachment.filename,
        attachment.file_size,
        ticket_id
    );
    Ok(ApiResponse::created(attachment))
}

async fn insert_attachment(
    state: &AppState,
    ticket_id: i64,
    stored: &StoredFile,
    uploaded_by: i64,
) -> Result<TicketAttachment, DatabaseError> {
    let attachment = sqlx::query_as::<_, TicketAttachment>(
        "INSERT INTO ticket_attachments (ticket_id, filename, file_path, file_size, mime_type, uploaded_by) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(ticket_id)
    .bind(&stored.original_name)
    .bind(&stored.relative_path)
    .bind(stored.size)
    .bind(&stored.mime_type)
    .bind(uploaded_by)
    .fetch_one(&state.pool)
    .await?;
    Ok(attachment)
}

/// DELETE /attachments/:id - drops the row, then the stored file
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeleteConfirmation> {
    let id = parse_id(&id)?;
    let repo = Repository::<TicketAttachment>::new(state.pool.clone());
    let attachment = repo.find(id).await?;

    let confirmation = repo.delete_by_id(id).await?;
    if let Err(e) = state.uploads.remove(&attachment.file_path).await {
        tracing::warn!("Attachment {} row deleted but file {} remains: {}", id, attachment.file_path, e);
    }
    Ok(ApiResponse::success(confirmation))
}

/// `/attachments`: list, get and delete
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<TicketAttachment>))
        .route("/:id", get(show::<TicketAttachment>).delete(destroy))
}

/// Upload route merged into the `/tickets` resource router
pub fn ticket_routes() -> Router<AppState> {
    Router::new().route(
        "/:id/attachments",
        post(upload).layer(DefaultBodyLimit::max(ATTACHMENT_MAX_BYTES + MULTIPART_OVERHEAD)),
    )
}
