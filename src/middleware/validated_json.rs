use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::error::ApiError;

/// JSON body extractor that runs declarative validation before the handler.
///
/// - empty body: `EMPTY_BODY`
/// - malformed JSON or a non-object body: `BODY_PARSE_ERROR`
/// - missing or mistyped fields and failed rules: `VALIDATION_ERROR`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BodyParseError(e.body_text()))?;

        parse_body(&bytes).map(ValidatedJson)
    }
}

pub fn parse_body<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::EmptyBody);
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ApiError::BodyParseError(format!("Invalid JSON body: {}", e)))?;
    if !value.is_object() {
        return Err(ApiError::BodyParseError("Request body must be a JSON object".to_string()));
    }

    let payload: T = serde_json::from_value(value).map_err(|e| ApiError::validation_error(e.to_string(), None))?;
    payload.validate()?;
    Ok(payload)
}
