use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

pub mod google;
pub mod password;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(security: &SecurityConfig, user_id: i64, email: &str) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(security.jwt_expiry_hours as i64);

        Self {
            user_id,
            email: email.to_string(),
            sub: user_id.to_string(),
            iss: security.jwt_issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("JWT generation error: {0}")]
    Generation(String),
}

pub fn generate_jwt(security: &SecurityConfig, user_id: i64, email: &str) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let claims = Claims::new(security, user_id, email);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &encoding_key).map_err(|e| JwtError::Generation(e.to_string()))
}

/// Verify signature, algorithm (HS256 only), expiry, not-before and issuer
pub fn validate_jwt(security: &SecurityConfig, token: &str) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[security.jwt_issuer.as_str()]);
    validation.validate_nbf = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        AppConfig::development().security
    }

    #[test]
    fn round_trips_claims() {
        let security = security();
        let token = generate_jwt(&security, 42, "dev@example.com").unwrap();
        let claims = validate_jwt(&security, &token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "dev@example.com");
        assert_eq!(claims.iss, security.jwt_issuer);
    }

    #[test]
    fn rejects_wrong_issuer() {
        let security = security();
        let token = generate_jwt(&security, 1, "a@example.com").unwrap();

        let mut other = security.clone();
        other.jwt_issuer = "someone-else".to_string();
        assert!(matches!(validate_jwt(&other, &token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let security = security();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            email: "a@example.com".into(),
            sub: "1".into(),
            iss: security.jwt_issuer.clone(),
            iat: now - 7200,
            nbf: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(validate_jwt(&security, &token), Err(JwtError::Expired)));
    }

    #[test]
    fn rejects_other_algorithms() {
        let security = security();
        let claims = Claims::new(&security, 1, "a@example.com");
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(validate_jwt(&security, &token).is_err());
    }

    #[test]
    fn refuses_empty_secret() {
        let mut security = security();
        security.jwt_secret.clear();
        assert!(matches!(generate_jwt(&security, 1, "a@example.com"), Err(JwtError::MissingSecret)));
    }
}
