use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal extracted from the bearer token
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

/// JWT authentication middleware that validates tokens and injects [`AuthUser`]
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let claims = validate_jwt(&state.config.security, token).map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Pull the token out of `Authorization: Bearer <token>`; the scheme is case-insensitive
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    let (scheme, token) = auth_str
        .split_once(' ')
        .ok_or_else(|| "Authorization header must use Bearer token format".to_string())?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use Bearer token format".to_string());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Empty bearer token".to_string());
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_any_scheme_case() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(&headers("bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(&headers("BEARER  abc ")).unwrap(), "abc");
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
        assert!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer_token(&headers("Bearer")).is_err());
        assert!(extract_bearer_token(&headers("Bearer   ")).is_err());
    }
}
