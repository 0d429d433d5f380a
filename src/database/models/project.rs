use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::entity::{Entity, Relation};
use crate::filter::Column;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub organization_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub key: String,
    pub project_type: String,
    pub is_private: bool,
    pub owner_id: i64,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const LABEL: &'static str = "Project";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("organization_id"),
        Column::text("name"),
        Column::text("description"),
        Column::text("key"),
        Column::text("project_type"),
        Column::bool("is_private"),
        Column::int("owner_id"),
        Column::int("status_id"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("status", "project_statuses", "status_id"),
        Relation::belongs_to("owner", "users", "owner_id").soft_deleted(),
        Relation::belongs_to("organization", "organizations", "organization_id").soft_deleted(),
        Relation::has_many("statuses", "ticket_statuses", "project_id"),
        Relation::has_many("labels", "labels", "project_id"),
        Relation::has_many("members", "project_members", "project_id"),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Per-project workflow column a ticket sits in
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketStatus {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub position: i64,
    pub is_default: bool,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for TicketStatus {
    const TABLE: &'static str = "ticket_statuses";
    const LABEL: &'static str = "Ticket status";
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("project_id"),
        Column::text("name"),
        Column::int("position"),
        Column::bool("is_default"),
        Column::text("color"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[Relation::belongs_to("project", "projects", "project_id").soft_deleted()];

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Label {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Label {
    const TABLE: &'static str = "labels";
    const LABEL: &'static str = "Label";
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::int("project_id"),
        Column::text("name"),
        Column::text("color"),
        Column::text("description"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[Relation::belongs_to("project", "projects", "project_id").soft_deleted()];

    fn id(&self) -> i64 {
        self.id
    }
}
