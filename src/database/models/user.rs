use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::database::entity::{Entity, Relation};
use crate::filter::Column;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_email_verified: bool,
    pub phone_number: Option<String>,
    pub is_phone_verified: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub avatar: Option<String>,
    pub language_preference: String,
    pub time_zone: String,
    pub status_id: Option<i64>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
    const SOFT_DELETE: bool = true;
    const COLUMNS: &'static [Column] = &[
        Column::int("id"),
        Column::text("email"),
        Column::bool("is_email_verified"),
        Column::text("phone_number"),
        Column::bool("is_phone_verified"),
        Column::text("first_name"),
        Column::text("last_name"),
        Column::text("display_name"),
        Column::text("bio"),
        Column::date("date_of_birth"),
        Column::text("gender"),
        Column::text("avatar"),
        Column::text("language_preference"),
        Column::text("time_zone"),
        Column::int("status_id"),
        Column::timestamp("last_login_at"),
        Column::timestamp("last_activity_at"),
        Column::timestamp("created_at"),
        Column::timestamp("updated_at"),
    ];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("status", "user_statuses", "status_id"),
        Relation::has_many("locations", "user_locations", "user_id"),
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Public identity returned by the auth endpoints
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub is_email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            is_email_verified: user.is_email_verified,
            last_login_at: user.last_login_at,
        }
    }
}

pub const AUTH_TYPE_PASSWORD: &str = "password";
pub const AUTH_TYPE_OAUTH: &str = "oauth";

/// A way of signing in: a password hash or a linked OAuth identity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserAuthMethod {
    pub id: i64,
    pub user_id: i64,
    pub auth_type: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_provider_id: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
