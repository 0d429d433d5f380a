use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgConnection;
use validator::{Validate, ValidationError};

use super::{one_of, require_actor, CreateSchema, PatchSchema, HEX_COLOR, UPPERCASE_KEY};
use crate::database::models::{Label, Project, TicketStatus};
use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

const PROJECT_TYPES: &[&str] = &["kanban", "scrum"];

fn validate_project_type(value: &str) -> Result<(), ValidationError> {
    one_of(value, PROJECT_TYPES, "project_type")
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 2, max = 10), regex(path = *UPPERCASE_KEY, code = "uppercase"))]
    pub key: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_project_type"))]
    pub project_type: Option<String>,
    pub is_private: Option<bool>,
    pub organization_id: Option<i64>,
}

#[async_trait]
impl CreateSchema<Project> for CreateProject {
    async fn changeset(&self, _conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let owner = require_actor(actor)?;
        let mut cs = Changeset::new();
        cs.set("name", self.name.clone())
            .set("key", self.key.clone())
            .set_if("description", self.description.clone())
            .set_if("project_type", self.project_type.clone())
            .set_if("is_private", self.is_private)
            .set_if("organization_id", self.organization_id)
            .set("owner_id", owner.user_id);
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &Project, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, 'owner')")
            .bind(created.id)
            .bind(created.owner_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 1000))]
    pub description: Option<Option<String>>,
    #[validate(custom(function = "validate_project_type"))]
    pub project_type: Option<String>,
    pub is_private: Option<bool>,
    pub status_id: Option<i64>,
}

impl PatchSchema for UpdateProject {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("name", self.name.clone())
            .set_if("description", self.description.clone())
            .set_if("project_type", self.project_type.clone())
            .set_if("is_private", self.is_private)
            .set_if("status_id", self.status_id);
        cs
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketStatus {
    pub project_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0))]
    pub position: Option<i64>,
    pub is_default: Option<bool>,
    #[validate(regex(path = *HEX_COLOR, code = "hexcolor"))]
    pub color: Option<String>,
}

#[async_trait]
impl CreateSchema<TicketStatus> for CreateTicketStatus {
    async fn changeset(&self, _conn: &mut PgConnection, _actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let mut cs = Changeset::new();
        cs.set("project_id", self.project_id)
            .set("name", self.name.clone())
            .set_if("position", self.position)
            .set_if("is_default", self.is_default)
            .set_if("color", self.color.clone());
        Ok(cs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicketStatus {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i64>,
    pub is_default: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(regex(path = *HEX_COLOR, code = "hexcolor"))]
    pub color: Option<Option<String>>,
}

impl PatchSchema for UpdateTicketStatus {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("name", self.name.clone())
            .set_if("position", self.position)
            .set_if("is_default", self.is_default)
            .set_if("color", self.color.clone());
        cs
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLabel {
    pub project_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    #[validate(regex(path = *HEX_COLOR, code = "hexcolor"))]
    pub color: String,
}

#[async_trait]
impl CreateSchema<Label> for CreateLabel {
    async fn changeset(&self, _conn: &mut PgConnection, _actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let mut cs = Changeset::new();
        cs.set("project_id", self.project_id)
            .set("name", self.name.clone())
            .set_if("description", self.description.clone())
            .set("color", self.color.clone());
        Ok(cs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLabel {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 200))]
    pub description: Option<Option<String>>,
    #[validate(regex(path = *HEX_COLOR, code = "hexcolor"))]
    pub color: Option<String>,
}

impl PatchSchema for UpdateLabel {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("name", self.name.clone())
            .set_if("description", self.description.clone())
            .set_if("color", self.color.clone());
        cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_key_must_be_uppercase() {
        let project: CreateProject = serde_json::from_value(json!({"name": "Web", "key": "web"})).unwrap();
        assert!(project.validate().unwrap_err().field_errors().contains_key("key"));

        let project: CreateProject = serde_json::from_value(json!({"name": "Web", "key": "WEB", "project_type": "scrum"})).unwrap();
        assert!(project.validate().is_ok());
    }

    #[test]
    fn label_requires_hex_color() {
        let missing = serde_json::from_value::<CreateLabel>(json!({"project_id": 1, "name": "bug"}));
        assert!(missing.is_err());

        let label: CreateLabel = serde_json::from_value(json!({"project_id": 1, "name": "bug", "color": "red"})).unwrap();
        assert!(label.validate().unwrap_err().field_errors().contains_key("color"));
    }

    #[test]
    fn status_position_cannot_be_negative() {
        let status: CreateTicketStatus =
            serde_json::from_value(json!({"project_id": 1, "name": "Doing", "position": -1})).unwrap();
        assert!(status.validate().unwrap_err().field_errors().contains_key("position"));
    }
}
