// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Map, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::auth::google::OAuthError;
use crate::auth::password::PasswordError;
use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::services::AccountError;
use crate::uploads::UploadError;

/// HTTP API error with a stable code and a client-safe message
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    InvalidId(String),
    ValidationError { message: String, details: Option<Value> },
    QueryError(String),
    NoValidFields,
    BodyParseError(String),
    EmptyBody,
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),
    InvalidCredentials(String),
    InvalidToken(String),
    TokenExchangeError(String),

    // 404 Not Found
    NotFound(String),
    UserNotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    EmailExists(String),
    Conflict(String),

    // 500 Internal Server Error
    InternalError(String),
    DatabaseError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_)
            | ApiError::ValidationError { .. }
            | ApiError::QueryError(_)
            | ApiError::NoValidFields
            | ApiError::BodyParseError(_)
            | ApiError::EmptyBody
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_)
            | ApiError::InvalidCredentials(_)
            | ApiError::InvalidToken(_)
            | ApiError::TokenExchangeError(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) | ApiError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EmailExists(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidId(_) => "INVALID_ID",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::QueryError(_) => "QUERY_ERROR",
            ApiError::NoValidFields => "NO_VALID_FIELDS",
            ApiError::BodyParseError(_) => "BODY_PARSE_ERROR",
            ApiError::EmptyBody => "EMPTY_BODY",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::TokenExchangeError(_) => "TOKEN_EXCHANGE_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UserNotFound(_) => "USER_NOT_FOUND",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::EmailExists(_) => "EMAIL_EXISTS",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::NoValidFields => "No valid fields to update",
            ApiError::EmptyBody => "Request body is empty",
            ApiError::InvalidId(msg)
            | ApiError::QueryError(msg)
            | ApiError::BodyParseError(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::InvalidCredentials(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::TokenExchangeError(msg)
            | ApiError::NotFound(msg)
            | ApiError::UserNotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::EmailExists(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalError(msg)
            | ApiError::DatabaseError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// `{success: false, data: null, error: {code, message, details?}}`
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.message(),
        });
        if let ApiError::ValidationError { details: Some(details), .. } = self {
            error["details"] = details.clone();
        }
        json!({
            "success": false,
            "data": null,
            "error": error,
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, details: Option<Value>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("A record with the same unique value already exists".to_string());
        }
        if err.is_foreign_key_violation() {
            return ApiError::bad_request("A referenced record does not exist or is still in use");
        }
        match err {
            DatabaseError::InvalidId(msg) => ApiError::InvalidId(msg),
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::QueryError(msg) => ApiError::QueryError(msg),
            DatabaseError::Filter(e) => ApiError::QueryError(e.to_string()),
            DatabaseError::NoValidFields => ApiError::NoValidFields,
            DatabaseError::Conflict(msg) => ApiError::Conflict(msg),
            DatabaseError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ApiError::internal("An error occurred while processing your request")
            }
            DatabaseError::ConfigMissing(what) => {
                tracing::error!("Database configuration missing: {}", what);
                ApiError::internal("Service is not configured")
            }
            DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database URL is invalid");
                ApiError::internal("Service is not configured")
            }
            DatabaseError::Migrate(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx::Error::RowNotFound) => ApiError::not_found("Record not found"),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Database pool unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(e) => {
                // Log the real error but return a generic message
                tracing::error!("SQLx error: {}", e);
                ApiError::DatabaseError("Database error occurred".to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Map::new();
        flatten_validation_errors(&errors, None, &mut details);
        ApiError::validation_error("Validation failed", Some(Value::Object(details)))
    }
}

/// Collapse nested validator output into `"path.to.field": ["message", ...]`
fn flatten_validation_errors(errors: &ValidationErrors, prefix: Option<&str>, out: &mut Map<String, Value>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages: Vec<Value> = list
                    .iter()
                    .map(|e| {
                        let text = match &e.message {
                            Some(message) => message.to_string(),
                            None => format!("failed '{}' rule", e.code),
                        };
                        Value::String(text)
                    })
                    .collect();
                out.insert(path, Value::Array(messages));
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(inner, Some(&format!("{}[{}]", path, index)), out);
                }
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired | JwtError::Invalid(_) => ApiError::InvalidToken(err.to_string()),
            JwtError::MissingSecret | JwtError::Generation(_) => {
                tracing::error!("JWT error: {}", err);
                ApiError::internal("Failed to issue token")
            }
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::NotConfigured => ApiError::service_unavailable(err.to_string()),
            OAuthError::InvalidToken(_) => ApiError::InvalidToken(err.to_string()),
            OAuthError::TokenExchange(_) | OAuthError::Request(_) => {
                tracing::warn!("Google OAuth failure: {}", err);
                ApiError::TokenExchangeError(err.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal("An error occurred while processing your request")
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailExists => ApiError::EmailExists("Email already registered".to_string()),
            AccountError::UserNotFound => ApiError::UserNotFound("User not found".to_string()),
            AccountError::InvalidCredentials(msg) => ApiError::InvalidCredentials(msg.to_string()),
            AccountError::Database(e) => e.into(),
            AccountError::Password(e) => e.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => {
                tracing::error!("Upload storage error: {}", e);
                ApiError::internal("Failed to store uploaded file")
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn renders_envelope() {
        let body = ApiError::not_found("Ticket with ID 9 not found").to_json();
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Ticket with ID 9 not found");
        assert!(body["error"].get("details").is_none());
    }

    #[test]
    fn maps_database_errors_to_codes() {
        let cases = vec![
            (DatabaseError::InvalidId("x".into()), "INVALID_ID", 400),
            (DatabaseError::NotFound("x".into()), "NOT_FOUND", 404),
            (DatabaseError::QueryError("x".into()), "QUERY_ERROR", 400),
            (DatabaseError::NoValidFields, "NO_VALID_FIELDS", 400),
            (DatabaseError::Internal("x".into()), "INTERNAL_ERROR", 500),
            (DatabaseError::Sqlx(sqlx::Error::Protocol("boom".into())), "DATABASE_ERROR", 500),
        ];
        for (err, code, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.error_code(), code);
            assert_eq!(api.status_code().as_u16(), status);
        }
    }

    #[test]
    fn maps_account_errors_to_auth_codes() {
        let cases: Vec<(AccountError, &str, u16)> = vec![
            (AccountError::EmailExists, "EMAIL_EXISTS", 409),
            (AccountError::UserNotFound, "USER_NOT_FOUND", 404),
            (AccountError::InvalidCredentials("nope"), "INVALID_CREDENTIALS", 401),
        ];
        for (err, code, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.error_code(), code);
            assert_eq!(api.status_code().as_u16(), status);
        }
    }

    #[derive(Validate)]
    struct Inner {
        #[validate(length(min = 2))]
        city: String,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(email)]
        email: String,
        #[validate(nested)]
        locations: Vec<Inner>,
    }

    #[test]
    fn flattens_nested_validation_details() {
        let outer = Outer {
            email: "nope".into(),
            locations: vec![Inner { city: "NYC".into() }, Inner { city: "X".into() }],
        };
        let api: ApiError = outer.validate().unwrap_err().into();
        let body = api.to_json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let details = &body["error"]["details"];
        assert!(details["email"].is_array());
        assert!(details["locations[1].city"].is_array());
        assert!(details.get("locations[0].city").is_none());
    }
}
