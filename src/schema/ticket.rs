use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{PgConnection, Row};
use validator::{Validate, ValidationError};

use super::{dates_in_order, require_actor, CreateSchema, PatchSchema};
use crate::database::models::{Epic, Sprint, Ticket, TicketComment, TimeLog};
use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

/// Which per-project counter a generated key draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySequence {
    Ticket,
    Epic,
}

impl KeySequence {
    fn column(&self) -> &'static str {
        match self {
            KeySequence::Ticket => "ticket_seq",
            KeySequence::Epic => "epic_seq",
        }
    }

    pub fn format(&self, project_key: &str, n: i64) -> String {
        match self {
            KeySequence::Ticket => format!("{}-{}", project_key, n),
            KeySequence::Epic => format!("{}-E{}", project_key, n),
        }
    }
}

/// Bump the project's counter and build the next key, e.g. `WEB-12` or `WEB-E3`.
///
/// The row lock taken by the UPDATE is held until the create transaction
/// ends, so concurrent creates in one project get distinct numbers.
pub async fn next_key(conn: &mut PgConnection, project_id: i64, sequence: KeySequence) -> Result<String, DatabaseError> {
    let sql = format!(
        "UPDATE projects SET \"{col}\" = \"{col}\" + 1 WHERE id = $1 AND deleted_at IS NULL RETURNING key, \"{col}\" AS n",
        col = sequence.column()
    );
    let row = sqlx::query(&sql)
        .bind(project_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Project with ID {} not found", project_id)))?;
    let key: String = row.try_get("key")?;
    let n: i64 = row.try_get("n")?;
    Ok(sequence.format(&key, n))
}

async fn link_all(conn: &mut PgConnection, join_sql: &str, owner_id: i64, target_ids: &[i64]) -> Result<(), DatabaseError> {
    if target_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(join_sql)
        .bind(owner_id)
        .bind(target_ids.to_vec())
        .execute(conn)
        .await?;
    Ok(())
}

const TICKET_LABELS_SQL: &str =
    "INSERT INTO ticket_labels (ticket_id, label_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING";
const EPIC_LABELS_SQL: &str =
    "INSERT INTO epic_labels (epic_id, label_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING";
const SPRINT_TICKETS_SQL: &str =
    "INSERT INTO sprint_tickets (sprint_id, ticket_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING";

// ---- epics

fn validate_epic_dates(epic: &CreateEpic) -> Result<(), ValidationError> {
    dates_in_order(epic.start_date, epic.target_date, "start_date must not be after target_date")
}

fn validate_epic_patch_dates(epic: &UpdateEpic) -> Result<(), ValidationError> {
    dates_in_order(epic.start_date.flatten(), epic.target_date.flatten(), "start_date must not be after target_date")
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_epic_dates"))]
pub struct CreateEpic {
    pub project_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub labels: Vec<i64>,
}

#[async_trait]
impl CreateSchema<Epic> for CreateEpic {
    async fn changeset(&self, conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let actor = require_actor(actor)?;
        let epic_key = next_key(conn, self.project_id, KeySequence::Epic).await?;
        let mut cs = Changeset::new();
        cs.set("project_id", self.project_id)
            .set("title", self.title.clone())
            .set_if("description", self.description.clone())
            .set("epic_key", epic_key)
            .set_if("status_id", self.status_id)
            .set_if("priority_id", self.priority_id)
            .set("owner_id", self.owner_id.unwrap_or(actor.user_id))
            .set_if("start_date", self.start_date)
            .set_if("target_date", self.target_date);
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &Epic, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        link_all(conn, EPIC_LABELS_SQL, created.id, &self.labels).await
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_epic_patch_dates"))]
pub struct UpdateEpic {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub status_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub owner_id: Option<i64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub target_date: Option<Option<NaiveDate>>,
}

impl PatchSchema for UpdateEpic {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("title", self.title.clone())
            .set_if("description", self.description.clone())
            .set_if("status_id", self.status_id)
            .set_if("priority_id", self.priority_id)
            .set_if("owner_id", self.owner_id)
            .set_if("start_date", self.start_date)
            .set_if("target_date", self.target_date);
        cs
    }
}

// ---- tickets

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicket {
    pub project_id: i64,
    pub epic_id: Option<i64>,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    pub description: Option<String>,
    pub type_id: Option<i64>,
    pub status_id: i64,
    pub priority_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub parent_id: Option<i64>,
    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
    /// Label ids linked after the insert
    #[serde(default)]
    pub labels: Vec<i64>,
}

#[async_trait]
impl CreateSchema<Ticket> for CreateTicket {
    async fn changeset(&self, conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let reporter = require_actor(actor)?;
        let ticket_key = next_key(conn, self.project_id, KeySequence::Ticket).await?;
        let mut cs = Changeset::new();
        cs.set("project_id", self.project_id)
            .set_if("epic_id", self.epic_id)
            .set("title", self.title.clone())
            .set_if("description", self.description.clone())
            .set("ticket_key", ticket_key)
            .set_if("type_id", self.type_id)
            .set("status_id", self.status_id)
            .set_if("priority_id", self.priority_id)
            .set_if("assignee_id", self.assignee_id)
            .set("reporter_id", reporter.user_id)
            .set_if("parent_id", self.parent_id)
            .set_if("estimated_hours", self.estimated_hours)
            .set_if("due_date", self.due_date);
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &Ticket, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        link_all(conn, TICKET_LABELS_SQL, created.id, &self.labels).await
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicket {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub epic_id: Option<Option<i64>>,
    pub type_id: Option<i64>,
    pub status_id: Option<i64>,
    pub priority_id: Option<i64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub assignee_id: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(range(min = 0.0))]
    pub estimated_hours: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(range(min = 0.0))]
    pub actual_hours: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl PatchSchema for UpdateTicket {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("title", self.title.clone())
            .set_if("description", self.description.clone())
            .set_if("epic_id", self.epic_id)
            .set_if("type_id", self.type_id)
            .set_if("status_id", self.status_id)
            .set_if("priority_id", self.priority_id)
            .set_if("assignee_id", self.assignee_id)
            .set_if("parent_id", self.parent_id)
            .set_if("estimated_hours", self.estimated_hours)
            .set_if("actual_hours", self.actual_hours)
            .set_if("due_date", self.due_date);
        cs
    }
}

// ---- comments

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComment {
    pub ticket_id: i64,
    #[validate(length(min = 1))]
    pub content: String,
}

#[async_trait]
impl CreateSchema<TicketComment> for CreateComment {
    async fn changeset(&self, _conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let author = require_actor(actor)?;
        let mut cs = Changeset::new();
        cs.set("ticket_id", self.ticket_id)
            .set("user_id", author.user_id)
            .set("content", self.content.clone());
        Ok(cs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComment {
    #[validate(length(min = 1))]
    pub content: Option<String>,
}

impl PatchSchema for UpdateComment {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("content", self.content.clone());
        cs
    }
}

// ---- time logs

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTimeLog {
    pub ticket_id: i64,
    #[validate(range(min = 0.25, max = 24.0))]
    pub hours: f64,
    pub description: Option<String>,
    pub logged_date: Option<NaiveDate>,
}

#[async_trait]
impl CreateSchema<TimeLog> for CreateTimeLog {
    async fn changeset(&self, _conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let author = require_actor(actor)?;
        let mut cs = Changeset::new();
        cs.set("ticket_id", self.ticket_id)
            .set("user_id", author.user_id)
            .set("hours", self.hours)
            .set_if("description", self.description.clone())
            .set_if("logged_date", self.logged_date);
        Ok(cs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTimeLog {
    #[validate(range(min = 0.25, max = 24.0))]
    pub hours: Option<f64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub logged_date: Option<NaiveDate>,
}

impl PatchSchema for UpdateTimeLog {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("hours", self.hours)
            .set_if("description", self.description.clone())
            .set_if("logged_date", self.logged_date);
        cs
    }
}

// ---- sprints

fn validate_sprint_dates(sprint: &CreateSprint) -> Result<(), ValidationError> {
    dates_in_order(sprint.start_date, sprint.end_date, "start_date must not be after end_date")
}

fn validate_sprint_patch_dates(sprint: &UpdateSprint) -> Result<(), ValidationError> {
    dates_in_order(sprint.start_date.flatten(), sprint.end_date.flatten(), "start_date must not be after end_date")
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_sprint_dates"))]
pub struct CreateSprint {
    pub project_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status_id: Option<i64>,
    /// Ticket ids placed into the sprint after the insert
    #[serde(default)]
    pub tickets: Vec<i64>,
}

#[async_trait]
impl CreateSchema<Sprint> for CreateSprint {
    async fn changeset(&self, _conn: &mut PgConnection, _actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let mut cs = Changeset::new();
        cs.set("project_id", self.project_id)
            .set("name", self.name.clone())
            .set_if("goal", self.goal.clone())
            .set_if("start_date", self.start_date)
            .set_if("end_date", self.end_date)
            .set_if("status_id", self.status_id);
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &Sprint, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        link_all(conn, SPRINT_TICKETS_SQL, created.id, &self.tickets).await
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_sprint_patch_dates"))]
pub struct UpdateSprint {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub goal: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub status_id: Option<i64>,
}

impl PatchSchema for UpdateSprint {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("name", self.name.clone())
            .set_if("goal", self.goal.clone())
            .set_if("start_date", self.start_date)
            .set_if("end_date", self.end_date)
            .set_if("status_id", self.status_id);
        cs
    }
}
