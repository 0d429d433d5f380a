use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::entity::{Entity, Relation};
use crate::filter::Column;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub plan_type: String,
    pub owner_id: i64,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Organization {
    const TABLE: &'static str = "organizations";
    const LABEL: &'static str = "Organization";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::text("name"),
        Column::text("slug"),
        Column::text("description"),
        Column::text("logo_url"),
        Column::text("plan_type"),
        Column::int("owner_id"),
        Column::int("status_id"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("owner", "users", "owner_id").soft_deleted(),
        Relation::belongs_to("status", "organization_statuses", "status_id"),
        Relation::has_many("members", "organization_members", "organization_id"),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

pub const ROLE_OWNER: &str = "owner";
