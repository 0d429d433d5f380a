use sqlx::{PgConnection, PgPool};

use crate::auth::google::GoogleIdentity;
use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::database::models::{User, UserAuthMethod, AUTH_TYPE_OAUTH, AUTH_TYPE_PASSWORD};
use crate::database::{DatabaseError, Repository};
use crate::schema::auth::RegisterRequest;
use crate::schema::user::normalize_email;

pub const GOOGLE_PROVIDER: &str = "google";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Email already registered")]
    EmailExists,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    InvalidCredentials(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        AccountError::Database(err.into())
    }
}

/// How a Google sign-in was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleOutcome {
    /// An account already carried this Google identity
    Existing,
    /// An account with the same verified email was linked
    Linked,
    Created,
}

/// Account lookups and credential changes behind the auth endpoints
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, AccountError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(normalize_email(email))
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a user with a password sign-in method
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AccountError> {
        if self.email_exists(&request.email).await? {
            return Err(AccountError::EmailExists);
        }

        // a concurrent registration can still win the race on the unique index
        Repository::<User>::new(self.pool.clone())
            .create(request, None)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => AccountError::EmailExists,
                other => AccountError::Database(other),
            })
    }

    /// Check an email/password pair and stamp the login time
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = self.find_by_email(email).await?.ok_or(AccountError::UserNotFound)?;

        let (_, hash) = self.password_hash(user.id).await?;
        if !verify_password(password, &hash).await? {
            return Err(AccountError::InvalidCredentials("Invalid email or password"));
        }

        self.touch_last_login(user.id).await
    }

    pub async fn touch_last_login(&self, user_id: i64) -> Result<User, AccountError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET last_login_at = NOW(), last_activity_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or(AccountError::UserNotFound)
    }

    /// Replace the password hash after verifying the current password
    pub async fn change_password(&self, user_id: i64, current: &str, new: &str) -> Result<(), AccountError> {
        let (method_id, hash) = self.password_hash(user_id).await?;
        if !verify_password(current, &hash).await? {
            return Err(AccountError::InvalidCredentials("Current password is incorrect"));
        }

        let new_hash = hash_password(new).await?;
        sqlx::query("UPDATE user_auth_methods SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_hash)
            .bind(method_id)
            .execute(&self.pool)
            .await?;
        tracing::info!("Password changed for user {}", user_id);
        Ok(())
    }

    /// Resolve a verified Google identity to a local account.
    ///
    /// 1. An account already linked to the Google subject signs in.
    /// 2. An account with the same email is linked when Google vouches for
    ///    the address; otherwise the email is reported as taken.
    /// 3. Anyone else gets a new, email-verified account.
    pub async fn google_sign_in(&self, identity: &GoogleIdentity) -> Result<(User, GoogleOutcome), AccountError> {
        if let Some(user) = self.find_by_provider(GOOGLE_PROVIDER, &identity.provider_id).await? {
            return Ok((self.touch_last_login(user.id).await?, GoogleOutcome::Existing));
        }

        let mut tx = self.pool.begin().await?;

        let (user_id, outcome) = match self.find_by_email(&identity.email).await? {
            Some(user) if identity.email_verified => {
                insert_oauth_method(&mut *tx, user.id, &identity.provider_id, false).await?;
                sqlx::query("UPDATE users SET is_email_verified = TRUE, updated_at = NOW() WHERE id = $1")
                    .bind(user.id)
                    .execute(&mut *tx)
                    .await?;
                tracing::info!("Linked Google identity to existing user {}", user.id);
                (user.id, GoogleOutcome::Linked)
            }
            Some(_) => return Err(AccountError::EmailExists),
            None => {
                let user = insert_google_user(&mut *tx, identity).await?;
                insert_oauth_method(&mut *tx, user.id, &identity.provider_id, true).await?;
                tracing::info!("Created user {} from Google sign-in", user.id);
                (user.id, GoogleOutcome::Created)
            }
        };

        tx.commit().await?;
        Ok((self.touch_last_login(user_id).await?, outcome))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u JOIN user_auth_methods m ON m.user_id = u.id \
             WHERE m.oauth_provider = $1 AND m.oauth_provider_id = $2 AND u.deleted_at IS NULL",
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// The stored bcrypt hash and its method id; accounts without one cannot use a password
    async fn password_hash(&self, user_id: i64) -> Result<(i64, String), AccountError> {
        let method = sqlx::query_as::<_, UserAuthMethod>(
            "SELECT * FROM user_auth_methods WHERE user_id = $1 AND auth_type = $2 \
             ORDER BY is_primary DESC, id LIMIT 1",
        )
        .bind(user_id)
        .bind(AUTH_TYPE_PASSWORD)
        .fetch_optional(&self.pool)
        .await?;

        method
            .and_then(|m| m.password_hash.map(|hash| (m.id, hash)))
            .ok_or(AccountError::InvalidCredentials("Password sign-in is not enabled for this account"))
    }
}

async fn insert_oauth_method(
    conn: &mut PgConnection,
    user_id: i64,
    provider_id: &str,
    is_primary: bool,
) -> Result<(), AccountError> {
    sqlx::query(
        "INSERT INTO user_auth_methods (user_id, auth_type, oauth_provider, oauth_provider_id, is_primary) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(AUTH_TYPE_OAUTH)
    .bind(GOOGLE_PROVIDER)
    .bind(provider_id)
    .bind(is_primary)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_google_user(conn: &mut PgConnection, identity: &GoogleIdentity) -> Result<User, AccountError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, is_email_verified, first_name, last_name, display_name) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(normalize_email(&identity.email))
    .bind(identity.email_verified)
    .bind(google_first_name(identity))
    .bind(&identity.family_name)
    .bind(&identity.name)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

// given name, then full name, then the mailbox part of the address
fn google_first_name(identity: &GoogleIdentity) -> String {
    identity
        .given_name
        .as_deref()
        .or(identity.name.as_deref())
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(given: Option<&str>, name: Option<&str>) -> GoogleIdentity {
        GoogleIdentity {
            provider_id: "1234".into(),
            email: "ada.lovelace@example.com".into(),
            email_verified: true,
            given_name: given.map(str::to_string),
            family_name: None,
            name: name.map(str::to_string),
            picture: None,
        }
    }

    #[test]
    fn first_name_falls_back_in_order() {
        assert_eq!(google_first_name(&identity(Some("Ada"), Some("Ada L"))), "Ada");
        assert_eq!(google_first_name(&identity(None, Some("Ada L"))), "Ada L");
        assert_eq!(google_first_name(&identity(None, None)), "ada.lovelace");
        assert_eq!(google_first_name(&identity(Some(" "), None)), "ada.lovelace");
    }
}
