// handlers/public/auth.rs - Token acquisition endpoints (no authentication required)

use axum::{extract::State, http::StatusCode, routing::post, Router};

use crate::auth::generate_jwt;
use crate::auth::google::GoogleIdentity;
use crate::database::models::{User, UserInfo};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::schema::auth::{AuthResponse, GoogleCallbackRequest, GoogleLoginRequest, LoginRequest, RegisterRequest};
use crate::services::{AccountService, GoogleOutcome};
use crate::state::AppState;

/// POST /auth/register - Create an account with a password and receive a JWT
///
/// Expected Input:
/// ```json
/// { "email": "ada@example.com", "password": "at-least-8", "first_name": "Ada" }
/// ```
///
/// Expected Output (201):
/// ```json
/// { "success": true, "data": { "user": { "id": 1, "email": "ada@example.com", ... }, "token": "eyJ..." }, "error": null }
/// ```
///
/// Fails with `EMAIL_EXISTS` when the address is already registered.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let user = AccountService::new(state.pool.clone()).register(&payload).await?;
    tracing::info!("Registered user {}", user.id);
    Ok(ApiResponse::created(issue_token(&state, &user)?))
}

/// POST /auth/login - Authenticate with email and password
///
/// Unknown emails answer `USER_NOT_FOUND`; a wrong password answers
/// `INVALID_CREDENTIALS`. Success stamps `last_login_at`.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = AccountService::new(state.pool.clone())
        .login(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::info!("Failed login for {}: {}", payload.email, e);
            ApiError::from(e)
        })?;
    Ok(ApiResponse::success(issue_token(&state, &user)?))
}

/// POST /auth/google - Sign in with a Google ID token (`credential`)
///
/// 200 for an existing or linked account, 201 when a new account was created.
pub async fn google(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<GoogleLoginRequest>,
) -> ApiResult<AuthResponse> {
    let identity = state.google.verify_id_token(&payload.credential).await?;
    google_response(&state, &identity).await
}

/// POST /auth/google/callback - Finish the authorization-code flow
///
/// The code is exchanged at the token endpoint (`TOKEN_EXCHANGE_ERROR` on
/// failure), then the returned `id_token` is verified like `/auth/google`.
pub async fn google_callback(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<GoogleCallbackRequest>,
) -> ApiResult<AuthResponse> {
    let tokens = state.google.exchange_code(&payload.code).await?;
    let id_token = tokens
        .id_token
        .ok_or_else(|| ApiError::TokenExchangeError("Token response carried no id_token".to_string()))?;

    let identity = state.google.verify_id_token(&id_token).await?;
    google_response(&state, &identity).await
}

async fn google_response(state: &AppState, identity: &GoogleIdentity) -> ApiResult<AuthResponse> {
    let (user, outcome) = AccountService::new(state.pool.clone()).google_sign_in(identity).await?;
    let status = match outcome {
        GoogleOutcome::Created => StatusCode::CREATED,
        GoogleOutcome::Existing | GoogleOutcome::Linked => StatusCode::OK,
    };
    Ok(ApiResponse::with_status(issue_token(state, &user)?, status))
}

pub(crate) fn issue_token(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let token = generate_jwt(&state.config.security, user.id, &user.email)?;
    Ok(AuthResponse {
        user: UserInfo::from(user),
        token,
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google))
        .route("/auth/google/callback", post(google_callback))
}
