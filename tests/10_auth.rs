mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Tracker API");
    Ok(())
}

#[tokio::test]
async fn health_reports_unavailable_store() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let server = common::spawn_app().await?;

    for path in ["/tickets", "/users/me", "/auth/userinfo", "/lookups/priorities"] {
        let res = server.client.get(server.api(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);

        let body: Value = res.json().await?;
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn rejects_malformed_and_foreign_tokens() -> Result<()> {
    let server = common::spawn_app().await?;

    let cases = [
        "Bearer not-a-jwt".to_string(),
        format!("Basic {}", server.any_token()),
        "Bearer".to_string(),
    ];
    for header in cases {
        let res = server
            .client
            .get(server.api("/tickets/1"))
            .header("Authorization", header.as_str())
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", header);
        let body: Value = res.json().await?;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    // signed with a different secret
    let mut other = server.config.security.clone();
    other.jwt_secret = "some-other-secret".to_string();
    let forged = tracker_api::auth::generate_jwt(&other, 1, "someone@example.com")?;
    let res = server.client.get(server.api("/tickets/1")).bearer_auth(forged).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() -> Result<()> {
    let server = common::spawn_app().await?;

    // A valid token gets past authentication; the bad id is rejected next.
    let res = server
        .client
        .get(server.api("/tickets/abc"))
        .header("Authorization", format!("bearer {}", server.any_token()))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_ID");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = server.client.get(server.api("/no-such-thing")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}
