use serde::Deserialize;
use serde_json::Value;

use crate::config::GoogleConfig;

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Google sign-in is not configured")]
    NotConfigured,

    #[error("Failed to exchange authorization code: {0}")]
    TokenExchange(String),

    #[error("Invalid Google token: {0}")]
    InvalidToken(String),

    #[error("Google request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Response of the authorization-code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub id_token: Option<String>,
}

/// Verified identity extracted from a Google ID token
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub provider_id: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Value,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Client for Google's token and tokeninfo endpoints
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty()
    }

    /// Trade an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", self.config.grant_type.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Google token exchange failed with {}: {}", status, body);
            return Err(OAuthError::TokenExchange(format!("token endpoint answered {}", status)));
        }

        response
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))
    }

    /// Verify an ID token through the tokeninfo endpoint
    pub async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        let response = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::InvalidToken(format!("tokeninfo answered {}", response.status())));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidToken(e.to_string()))?;

        self.identity_from(info)
    }

    fn identity_from(&self, info: TokenInfo) -> Result<GoogleIdentity, OAuthError> {
        if info.aud != self.config.client_id {
            return Err(OAuthError::InvalidToken("audience mismatch".to_string()));
        }
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(OAuthError::InvalidToken("unexpected issuer".to_string()));
        }
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| OAuthError::InvalidToken("token carries no email".to_string()))?;

        Ok(GoogleIdentity {
            provider_id: info.sub,
            email,
            // tokeninfo encodes booleans as strings
            email_verified: matches!(&info.email_verified, Value::Bool(true))
                || matches!(&info.email_verified, Value::String(s) if s == "true"),
            given_name: info.given_name,
            family_name: info.family_name,
            name: info.name,
            picture: info.picture,
        })
    }
}
