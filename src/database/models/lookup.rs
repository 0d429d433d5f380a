use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::database::manager::DatabaseError;

/// Seeded reference tables exposed read-only under `/lookups/:kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    UserStatuses,
    ProjectStatuses,
    EpicStatuses,
    SprintStatuses,
    OrganizationStatuses,
    MemberStatuses,
    Priorities,
    TicketTypes,
}

impl LookupKind {
    pub const ALL: [LookupKind; 8] = [
        LookupKind::UserStatuses,
        LookupKind::ProjectStatuses,
        LookupKind::EpicStatuses,
        LookupKind::SprintStatuses,
        LookupKind::OrganizationStatuses,
        LookupKind::MemberStatuses,
        LookupKind::Priorities,
        LookupKind::TicketTypes,
    ];

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn slug(&self) -> &'static str {
        match self {
            LookupKind::UserStatuses => "user-statuses",
            LookupKind::ProjectStatuses => "project-statuses",
            LookupKind::EpicStatuses => "epic-statuses",
            LookupKind::SprintStatuses => "sprint-statuses",
            LookupKind::OrganizationStatuses => "organization-statuses",
            LookupKind::MemberStatuses => "member-statuses",
            LookupKind::Priorities => "priorities",
            LookupKind::TicketTypes => "ticket-types",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::UserStatuses => "user_statuses",
            LookupKind::ProjectStatuses => "project_statuses",
            LookupKind::EpicStatuses => "epic_statuses",
            LookupKind::SprintStatuses => "sprint_statuses",
            LookupKind::OrganizationStatuses => "organization_statuses",
            LookupKind::MemberStatuses => "member_statuses",
            LookupKind::Priorities => "priorities",
            LookupKind::TicketTypes => "ticket_types",
        }
    }

    // priorities are ranked by level instead of position
    fn order_by(&self) -> &'static str {
        match self {
            LookupKind::Priorities => "t.\"level\", t.\"id\"",
            _ => "t.\"position\", t.\"id\"",
        }
    }

    pub fn list_sql(&self) -> String {
        format!(
            "SELECT row_to_json(t) AS row FROM \"{}\" t ORDER BY {}",
            self.table(),
            self.order_by()
        )
    }

    pub async fn list(&self, pool: &PgPool) -> Result<Vec<Value>, DatabaseError> {
        let rows = sqlx::query(&self.list_sql()).fetch_all(pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_slug() {
        for kind in LookupKind::ALL {
            assert_eq!(LookupKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(LookupKind::from_slug("colors"), None);
    }

    #[test]
    fn orders_priorities_by_level() {
        assert_eq!(
            LookupKind::Priorities.list_sql(),
            "SELECT row_to_json(t) AS row FROM \"priorities\" t ORDER BY t.\"level\", t.\"id\""
        );
        assert!(LookupKind::TicketTypes.list_sql().ends_with("ORDER BY t.\"position\", t.\"id\""));
    }
}
