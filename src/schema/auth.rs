use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use validator::Validate;

use super::user::{insert_password_method, normalize_email};
use super::CreateSchema;
use crate::database::models::{User, UserInfo};
use crate::database::{Changeset, DatabaseError};
use crate::middleware::AuthUser;

/// POST /auth/register
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
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
}

#[async_trait]
impl CreateSchema<User> for RegisterRequest {
    async fn changeset(&self, _conn: &mut PgConnection, _actor: Option<&AuthUser>) -> Result<Changeset, DatabaseError> {
        let mut cs = Changeset::new();
        cs.set("email", normalize_email(&self.email))
            .set("first_name", self.first_name.clone())
            .set_if("last_name", self.last_name.clone())
            .set_if("display_name", self.display_name.clone());
        Ok(cs)
    }

    async fn after_insert(&self, conn: &mut PgConnection, created: &User, _actor: Option<&AuthUser>) -> Result<(), DatabaseError> {
        insert_password_method(conn, created.id, &self.password).await
    }
}

/// `{user, token}` returned by every sign-in flow
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub token: String,
}

/// POST /auth/login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /auth/google
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoogleLoginRequest {
    /// Google ID token from the client-side sign-in flow
    #[validate(length(min = 1))]
    pub credential: String,
}

/// POST /auth/google/callback
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoogleCallbackRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub state: Option<String>,
}

/// PUT /auth/password
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
    #[validate(must_match(other = "new_password"))]
    pub confirm_password: String,
}
