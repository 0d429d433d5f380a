use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::entity::{Entity, Relation};
use crate::filter::Column;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Epic {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub epic_key: String,
    pub status_id: i64,
    pub priority_id: i64,
    pub owner_id: i64,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Epic {
    const TABLE: &'static str = "epics";
    const LABEL: &'static str = "Epic";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("project_id"),
        Column::text("title"),
        Column::text("description"),
        Column::text("epic_key"),
        Column::int("status_id"),
        Column::int("priority_id"),
        Column::int("owner_id"),
        Column::date("start_date"),
        Column::date("target_date"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("status", "epic_statuses", "status_id"),
        Relation::belongs_to("priority", "priorities", "priority_id"),
        Relation::belongs_to("owner", "users", "owner_id").soft_deleted(),
        Relation::belongs_to("project", "projects", "project_id").soft_deleted(),
        Relation::many_to_many("labels", "labels", "epic_labels", "epic_id", "label_id"),
        Relation::has_many("tickets", "tickets", "epic_id").soft_deleted(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub project_id: i64,
    pub epic_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub ticket_key: String,
    pub type_id: i64,
    pub status_id: i64,
    pub priority_id: i64,
    pub assignee_id: Option<i64>,
    pub reporter_id: i64,
    pub parent_id: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Ticket {
    const TABLE: &'static str = "tickets";
    const LABEL: &'static str = "Ticket";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("project_id"),
        Column::int("epic_id"),
        Column::text("title"),
        Column::text("description"),
        Column::text("ticket_key"),
        Column::int("type_id"),
        Column::int("status_id"),
        Column::int("priority_id"),
        Column::int("assignee_id"),
        Column::int("reporter_id"),
        Column::int("parent_id"),
        Column::float("estimated_hours"),
        Column::float("actual_hours"),
        Column::date("due_date"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("status", "ticket_statuses", "status_id"),
        Relation::belongs_to("priority", "priorities", "priority_id"),
        Relation::belongs_to("type", "ticket_types", "type_id"),
        Relation::belongs_to("assignee", "users", "assignee_id").soft_deleted(),
        Relation::belongs_to("reporter", "users", "reporter_id").soft_deleted(),
        Relation::belongs_to("project", "projects", "project_id").soft_deleted(),
        Relation::belongs_to("epic", "epics", "epic_id").soft_deleted(),
        Relation::many_to_many("labels", "labels", "ticket_labels", "ticket_id", "label_id"),
        Relation::many_to_many("watchers", "users", "ticket_watchers", "ticket_id", "user_id").soft_deleted(),
        Relation::has_many("comments", "ticket_comments", "ticket_id").soft_deleted(),
        Relation::has_many("attachments", "ticket_attachments", "ticket_id"),
        Relation::has_many("time_logs", "time_logs", "ticket_id"),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketComment {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for TicketComment {
    const TABLE: &'static str = "ticket_comments";
    const LABEL: &'static str = "Comment";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("ticket_id"),
        Column::int("user_id"),
        Column::text("content"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("user", "users", "user_id").soft_deleted(),
        Relation::belongs_to("ticket", "tickets", "ticket_id").soft_deleted(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Metadata row for a file stored under the upload directory
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketAttachment {
    pub id: i64,
    pub ticket_id: i64,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for TicketAttachment {
    const TABLE: &'static str = "ticket_attachments";
    const LABEL: &'static str = "Attachment";
    const HAS_UPDATED_AT: bool = false;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("ticket_id"),
        Column::text("filename"),
        Column::text("file_path"),
        Column::int("file_size"),
        Column::text("mime_type"),
        Column::int("uploaded_by"),
        Column::timestamp("created_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("ticket", "tickets", "ticket_id").soft_deleted(),
        Relation::belongs_to("uploader", "users", "uploaded_by").soft_deleted(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimeLog {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub hours: f64,
    pub description: Option<String>,
    pub logged_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Entity for TimeLog {
    const TABLE: &'static str = "time_logs";
    const LABEL: &'static str = "Time log";
    const HAS_UPDATED_AT: bool = false;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("ticket_id"),
        Column::int("user_id"),
        Column::float("hours"),
        Column::text("description"),
        Column::date("logged_date"),
        Column::timestamp("created_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("user", "users", "user_id").soft_deleted(),
        Relation::belongs_to("ticket", "tickets", "ticket_id").soft_deleted(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sprint {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Sprint {
    const TABLE: &'static str = "sprints";
    const LABEL: &'static str = "Sprint";
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("project_id"),
        Column::text("name"),
        Column::text("goal"),
        Column::date("start_date"),
        Column::date("end_date"),
        Column::int("status_id"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("status", "sprint_statuses", "status_id"),
        Relation::belongs_to("project", "projects", "project_id").soft_deleted(),
        Relation::many_to_many("tickets", "tickets", "sprint_tickets", "sprint_id", "ticket_id").soft_deleted(),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}
