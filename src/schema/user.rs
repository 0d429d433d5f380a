use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgConnection;
use validator::{Validate, ValidationError};

use super::{one_of, CreateSchema, PatchSchema};
use crate::auth::password;
use crate::database::models::user::AUTH_TYPE_PASSWORD;
use crate::database::models::User;
use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

const GENDERS: &[&str] = &["male", "female", "other"];
const LOCATION_TYPES: &[&str] = &["primary", "shipping", "billing", "work"];

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    one_of(value, GENDERS, "gender")
}

fn validate_location_type(value: &str) -> Result<(), ValidationError> {
    one_of(value, LOCATION_TYPES, "location_type")
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(custom(function = "validate_location_type"))]
    pub location_type: String,
    #[validate(length(min = 1, max = 255))]
    pub address_line1: String,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state_province: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
}

/// POST /users
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(min = 10, max = 20))]
    pub phone_number: Option<String>,
    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 2, max = 5))]
    pub language_preference: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub time_zone: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub locations: Vec<LocationInput>,
}

#[async_trait]
impl CreateSchema<User> for CreateUser {
    async fn changeset(&self, _conn: &mut PgConnection, _actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let mut cs = Changeset::new();
        cs.set("email", normalize_email(&self.email))
            .set("first_name", self.first_name.clone())
            .set_if("last_name", self.last_name.clone())
            .set_if("display_name", self.display_name.clone())
            .set_if("bio", self.bio.clone())
            .set_if("phone_number", self.phone_number.clone())
            .set_if("gender", self.gender.clone())
            .set_if("date_of_birth", self.date_of_birth)
            .set_if("language_preference", self.language_preference.clone())
            .set_if("time_zone", self.time_zone.clone());
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &User, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        insert_password_method(conn, created.id, &self.password).await?;
        for location in &self.locations {
            insert_location(conn, created.id, location).await?;
        }
        Ok(())
    }
}

/// PUT /users/:id and PUT /users/me
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 100))]
    pub last_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 100))]
    pub display_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 500))]
    pub bio: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(min = 10, max = 20))]
    pub phone_number: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[validate(length(min = 2, max = 5))]
    pub language_preference: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub time_zone: Option<String>,
}

impl PatchSchema for UpdateUser {
    fn changeset(&self) -> Changeset {
        let mut cs = Changeset::new();
        cs.set_if("email", self.email.as_deref().map(normalize_email))
            .set_if("first_name", self.first_name.clone())
            .set_if("last_name", self.last_name.clone())
            .set_if("display_name", self.display_name.clone())
            .set_if("bio", self.bio.clone())
            .set_if("phone_number", self.phone_number.clone())
            .set_if("gender", self.gender.clone())
            .set_if("date_of_birth", self.date_of_birth)
            .set_if("language_preference", self.language_preference.clone())
            .set_if("time_zone", self.time_zone.clone());
        cs
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Store a bcrypt hash as the user's primary sign-in method
pub async fn insert_password_method(conn: &mut PgConnection, user_id: i64, plain: &str) -> Result<(), DatabaseError> {
    let hash = password::hash_password(plain)
        .await
        .map_err(|e| DatabaseError::Internal(e.to_string()))?;
    sqlx::query(
        "INSERT INTO user_auth_methods (user_id, auth_type, password_hash, is_primary) VALUES ($1, $2, $3, TRUE)",
    )
    .bind(user_id)
    .bind(AUTH_TYPE_PASSWORD)
    .bind(hash)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_location(conn: &mut PgConnection, user_id: i64, location: &LocationInput) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO user_locations (user_id, location_type, address_line1, address_line2, city, state_province, \
         postal_code, country, latitude, longitude, is_default) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(user_id)
    .bind(&location.location_type)
    .bind(&location.address_line1)
    .bind(&location.address_line2)
    .bind(&location.city)
    .bind(&location.state_province)
    .bind(&location.postal_code)
    .bind(&location.country)
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(location.is_default)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SqlParam;
    use serde_json::json;

    fn create_payload() -> serde_json::Value {
        json!({
            "email": "Jane@Example.com",
            "password": "correct-horse",
            "first_name": "Jane",
            "gender": "female",
            "locations": [{
                "location_type": "primary",
                "address_line1": "1 Main St",
                "city": "Springfield",
                "postal_code": "12345",
                "country": "US"
            }]
        })
    }

    #[test]
    fn accepts_a_complete_user() {
        let user: CreateUser = serde_json::from_value(create_payload()).unwrap();
        assert!(user.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let mut payload = create_payload();
        payload["password"] = json!("short");
        payload["gender"] = json!("robot");
        let user: CreateUser = serde_json::from_value(payload).unwrap();
        let errors = user.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("gender"));
    }

    #[test]
    fn rejects_invalid_nested_location() {
        let mut payload = create_payload();
        payload["locations"][0]["location_type"] = json!("moon");
        let user: CreateUser = serde_json::from_value(payload).unwrap();
        assert!(user.validate().is_err());
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: UpdateUser = serde_json::from_value(json!({"bio": null, "first_name": "Ann"})).unwrap();
        assert_eq!(patch.bio, Some(None));
        assert_eq!(patch.last_name, None);

        let cs = patch.changeset();
        assert_eq!(cs.columns(), vec!["first_name", "bio"]);
        assert_eq!(cs.params()[1], SqlParam::Text(None));
    }

    #[test]
    fn patch_ignores_protected_keys() {
        let patch: UpdateUser = serde_json::from_value(json!({"id": 99, "created_at": "2020-01-01"})).unwrap();
        assert!(patch.changeset().is_empty());
    }

    #[test]
    fn normalizes_email_case() {
        let patch: UpdateUser = serde_json::from_value(json!({"email": " Bob@Example.COM "})).unwrap();
        assert_eq!(patch.changeset().params(), vec![SqlParam::Text(Some("bob@example.com".into()))]);
    }
}
