use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgConnection;
use validator::{Validate, ValidationError};

use super::{one_of, require_actor, CreateSchema, PatchSchema, ALPHANUMERIC};
use crate::database::models::organization::ROLE_OWNER;
use crate::database::models::Organization;
use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

const PLAN_TYPES: &[&str] = &["free", "pro", "enterprise"];

fn validate_plan_type(value: &str) -> Result<(), ValidationError> {
    one_of(value, PLAN_TYPES, "plan_type")
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganization {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 3, max = 100), regex(path = *ALPHANUMERIC, code = "alphanumeric"))]
    pub slug: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    #[validate(custom(function = "validate_plan_type"))]
    pub plan_type: Option<String>,
}

#[async_trait]
impl CreateSchema<Organization> for CreateOrganization {
    async fn changeset(&self, _conn: &mut PgConnection, actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let owner = require_actor(actor)?;
        let mut cs = Changeset::new();
        cs.set("name", self.name.clone())
            .set("slug", self.slug.clone())
            .set_if("description", self.description.clone())
            .set_if("logo_url", self.logo_url.clone())
            .set_if("plan_type", self.plan_type.clone())
            .set("owner_id", owner.user_id);
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &Organization, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO organization_members (organization_id, user_id, role, joined_at) VALUES ($1, $2, $3, NOW())")
            .bind(created.id)
            .bind(created.owner_id)
            .bind(ROLE_OWNER)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrganization {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 1000))]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(url)]
    pub logo_url: Option<Option<String>>,
    #[validate(custom(function = "validate_plan_type"))]
    pub plan_type: Option<String>,
}

impl PatchSchema for UpdateOrganization {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("name", self.name.clone())
            .set_if("description", self.description.clone())
            .set_if("logo_url", self.logo_url.clone())
            .set_if("plan_type", self.plan_type.clone());
        cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_must_be_alphanumeric() {
        let org: CreateOrganization = serde_json::from_value(json!({"name": "Acme", "slug": "acme-inc"})).unwrap();
        let errors = org.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("slug"));

        let org: CreateOrganization = serde_json::from_value(json!({"name": "Acme", "slug": "acme42"})).unwrap();
        assert!(org.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_plan_and_bad_logo() {
        let org: CreateOrganization = serde_json::from_value(json!({
            "name": "Acme",
            "slug": "acme",
            "plan_type": "platinum",
            "logo_url": "not a url"
        }))
        .unwrap();
        let errors = org.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("plan_type"));
        assert!(fields.contains_key("logo_url"));
    }
}
