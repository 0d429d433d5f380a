// handlers/protected/resource.rs - Generic CRUD handlers shared by every resource
//
// One set of handler functions, instantiated per entity type:
//   GET    /<resource>        list with filters, sort and pagination
//   GET    /<resource>/:id    single row
//   POST   /<resource>        create (201)
//   PUT    /<resource>/:id    partial update
//   DELETE /<resource>/:id    soft delete when supported, `?permanent=true` for a hard delete

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::get,
    Extension, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::{
    Epic, Label, Organization, Project, Sprint, Ticket, TicketAttachment, TicketComment, TicketStatus, TimeLog,
    User,
};
use crate::database::{parse_id, DeleteConfirmation, Entity, Paginated, Repository};
use crate::filter::QueryRequest;
use crate::middleware::validated_json::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::schema::organization::{CreateOrganization, UpdateOrganization};
use crate::schema::project::{CreateLabel, CreateProject, CreateTicketStatus, UpdateLabel, UpdateProject, UpdateTicketStatus};
use crate::schema::ticket::{
    CreateComment, CreateEpic, CreateSprint, CreateTicket, CreateTimeLog, UpdateComment, UpdateEpic, UpdateSprint,
    UpdateTicket, UpdateTimeLog,
};
use crate::schema::user::{CreateUser, UpdateUser};
use crate::schema::{CreateSchema, PatchSchema};
use crate::state::AppState;

/// An entity exposed over HTTP
pub trait Resource: Entity {
    /// Relationships eager-loaded on every read
    const PRELOADS: &'static [&'static str] = &[];
}

/// A resource that accepts Create and Update payloads
pub trait Writable: Resource {
    type Create: CreateSchema<Self> + DeserializeOwned + 'static;
    type Patch: PatchSchema + DeserializeOwned + 'static;
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub permanent: Option<String>,
}

impl DeleteParams {
    fn is_permanent(&self) -> bool {
        self.permanent
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }
}

/// GET /<resource> - filtered, sorted, paginated listing
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Paginated<Value>> {
    let mut request = QueryRequest::from_params(params);
    if let Some(max) = request.cap_page_size(state.config.query.max_page_size) {
        tracing::debug!("Capped {} page size to {}", R::LABEL, max);
    }

    let page = Repository::<R>::new(state.pool.clone())
        .list(&request, R::PRELOADS)
        .await?;
    Ok(ApiResponse::success(page))
}

/// GET /<resource>/:id
pub async fn show<R: Resource>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let row = Repository::<R>::new(state.pool.clone()).get(id, R::PRELOADS).await?;
    Ok(ApiResponse::success(row))
}

/// POST /<resource>
///
/// The body is decoded and validated against the resource's create schema;
/// the row and its dependent rows are written in one transaction.
pub async fn create<R: Writable>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Value> {
    let payload: R::Create = parse_body(&body)?;

    let repo = Repository::<R>::new(state.pool.clone());
    let created = repo.create(&payload, Some(&user)).await?;
    let row = repo.present(&created, R::PRELOADS).await?;

    tracing::info!("User {} created {} {}", user.user_id, R::LABEL, created.id());
    Ok(ApiResponse::created(row))
}

/// PUT /<resource>/:id
///
/// The identifier is checked before the body is read, and an update set that
/// is empty once protected columns are stripped fails before any row is loaded.
pub async fn update<R: Writable>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let patch: R::Patch = parse_body(&body)?;

    let row = Repository::<R>::new(state.pool.clone())
        .update_by_id(id, &patch, R::PRELOADS)
        .await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /<resource>/:id[?permanent=true]
pub async fn destroy<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<DeleteConfirmation> {
    let id = parse_id(&id)?;
    let repo = Repository::<R>::new(state.pool.clone());

    let confirmation = if R::SOFT_DELETE && !params.is_permanent() {
        repo.soft_delete_by_id(id).await?
    } else {
        repo.delete_by_id(id).await?
    };
    Ok(ApiResponse::success(confirmation))
}

/// Full CRUD router for one resource, meant to be nested under its path
pub fn resource_routes<R: Writable>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(show::<R>).put(update::<R>).delete(destroy::<R>))
}

impl Resource for User {
    const PRELOADS: &'static [&'static str] = &["status", "locations"];
}

impl Writable for User {
    type Create = CreateUser;
    type Patch = UpdateUser;
}

impl Resource for Organization {
    const PRELOADS: &'static [&'static str] = &["owner", "members"];
}

impl Writable for Organization {
    type Create = CreateOrganization;
    type Patch = UpdateOrganization;
}

impl Resource for Project {
    const PRELOADS: &'static [&'static str] = &["status", "owner", "organization", "statuses", "labels"];
}

impl Writable for Project {
    type Create = CreateProject;
    type Patch = UpdateProject;
}

impl Resource for TicketStatus {}

impl Writable for TicketStatus {
    type Create = CreateTicketStatus;
    type Patch = UpdateTicketStatus;
}

impl Resource for Epic {
    const PRELOADS: &'static [&'static str] = &["status", "priority", "owner", "labels"];
}

impl Writable for Epic {
    type Create = CreateEpic;
    type Patch = UpdateEpic;
}

impl Resource for Ticket {
    const PRELOADS: &'static [&'static str] = &["status", "priority", "type", "assignee", "reporter", "labels"];
}

impl Writable for Ticket {
    type Create = CreateTicket;
    type Patch = UpdateTicket;
}

impl Resource for TicketComment {
    const PRELOADS: &'static [&'static str] = &["user"];
}

impl Writable for TicketComment {
    type Create = CreateComment;
    type Patch = UpdateComment;
}

impl Resource for TimeLog {
    const PRELOADS: &'static [&'static str] = &["user"];
}

impl Writable for TimeLog {
    type Create = CreateTimeLog;
    type Patch = UpdateTimeLog;
}

impl Resource for Sprint {
    const PRELOADS: &'static [&'static str] = &["status", "tickets"];
}

impl Writable for Sprint {
    type Create = CreateSprint;
    type Patch = UpdateSprint;
}

impl Resource for Label {}

impl Writable for Label {
    type Create = CreateLabel;
    type Patch = UpdateLabel;
}

// Attachments are created through the ticket upload endpoint only.
impl Resource for TicketAttachment {}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_preload_is_declared<R: Resource>() {
        for name in R::PRELOADS {
            assert!(R::relation(name).is_some(), "{} has no relationship '{}'", R::LABEL, name);
        }
    }

    #[test]
    fn preloads_name_real_relationships() {
        every_preload_is_declared::<User>();
        every_preload_is_declared::<Organization>();
        every_preload_is_declared::<Project>();
        every_preload_is_declared::<TicketStatus>();
        every_preload_is_declared::<Epic>();
        every_preload_is_declared::<Ticket>();
        every_preload_is_declared::<TicketComment>();
        every_preload_is_declared::<TimeLog>();
        every_preload_is_declared::<Sprint>();
        every_preload_is_declared::<Label>();
        every_preload_is_declared::<TicketAttachment>();
    }

    #[test]
    fn permanent_flag_parsing() {
        let params = |v: Option<&str>| DeleteParams {
            permanent: v.map(str::to_string),
        };
        assert!(params(Some("true")).is_permanent());
        assert!(params(Some("TRUE")).is_permanent());
        assert!(params(Some("1")).is_permanent());
        assert!(!params(Some("false")).is_permanent());
        assert!(!params(None).is_permanent());
    }
}
