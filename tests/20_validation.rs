mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

async fn expect_error(res: reqwest::Response, status: StatusCode, code: &str) -> Result<Value> {
    assert_eq!(res.status(), status, "expected {}", code);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert_eq!(body["error"]["code"], code, "body: {}", body);
    Ok(body)
}

fn authed(server: &TestServer, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    builder.bearer_auth(server.any_token())
}

#[tokio::test]
async fn invalid_ids_are_rejected_first() -> Result<()> {
    let server = common::spawn_app().await?;
    let c = &server.client;

    for id in ["abc", "0", "-4", "1.5"] {
        let res = authed(&server, c.get(server.api(&format!("/tickets/{}", id)))).send().await?;
        expect_error(res, StatusCode::BAD_REQUEST, "INVALID_ID").await?;
    }

    // the id is checked before the (empty) body
    let res = authed(&server, c.put(server.api("/projects/nope"))).send().await?;
    expect_error(res, StatusCode::BAD_REQUEST, "INVALID_ID").await?;

    let res = authed(&server, c.delete(server.api("/sprints/x"))).send().await?;
    expect_error(res, StatusCode::BAD_REQUEST, "INVALID_ID").await?;
    Ok(())
}

#[tokio::test]
async fn body_problems_have_distinct_codes() -> Result<()> {
    let server = common::spawn_app().await?;
    let c = &server.client;

    let res = authed(&server, c.post(server.api("/projects"))).send().await?;
    expect_error(res, StatusCode::BAD_REQUEST, "EMPTY_BODY").await?;

    let res = authed(&server, c.post(server.api("/projects")))
        .header("Content-Type", "application/json")
        .body("{\"name\": ")
        .send()
        .await?;
    expect_error(res, StatusCode::BAD_REQUEST, "BODY_PARSE_ERROR").await?;

    let res = authed(&server, c.put(server.api("/auth/password")))
        .header("Content-Type", "application/json")
        .body("[]")
        .send()
        .await?;
    expect_error(res, StatusCode::BAD_REQUEST, "BODY_PARSE_ERROR").await?;
    Ok(())
}

#[tokio::test]
async fn failed_rules_list_the_fields() -> Result<()> {
    let server = common::spawn_app().await?;
    let c = &server.client;

    // missing required field
    let res = authed(&server, c.post(server.api("/projects")))
        .json(&json!({ "name": "Apollo" }))
        .send()
        .await?;
    expect_error(res, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await?;

    let res = authed(&server, c.post(server.api("/projects")))
        .json(&json!({ "name": "", "key": "lower", "project_type": "waterfall" }))
        .send()
        .await?;
    let body = expect_error(res, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await?;
    let details = &body["error"]["details"];
    assert!(details["name"].is_array());
    assert!(details["key"].is_array());
    assert!(details["project_type"].is_array());

    let res = authed(&server, c.post(server.api("/sprints")))
        .json(&json!({
            "project_id": 1,
            "name": "Sprint 1",
            "start_date": "2024-05-10",
            "end_date": "2024-05-01"
        }))
        .send()
        .await?;
    expect_error(res, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await?;

    let res = authed(&server, c.put(server.api("/auth/password")))
        .json(&json!({
            "current_password": "old-password",
            "new_password": "new-password-1",
            "confirm_password": "new-password-2"
        }))
        .send()
        .await?;
    let body = expect_error(res, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await?;
    assert!(body["error"]["details"]["confirm_password"].is_array());
    Ok(())
}

#[tokio::test]
async fn updates_without_writable_fields_are_refused() -> Result<()> {
    let server = common::spawn_app().await?;
    let c = &server.client;

    let res = authed(&server, c.put(server.api("/projects/5"))).json(&json!({})).send().await?;
    expect_error(res, StatusCode::BAD_REQUEST, "NO_VALID_FIELDS").await?;

    // protected columns alone do not make an update
    let res = authed(&server, c.put(server.api("/tickets/5")))
        .json(&json!({ "id": 99, "created_at": "2020-01-01T00:00:00Z" }))
        .send()
        .await?;
    expect_error(res, StatusCode::BAD_REQUEST, "NO_VALID_FIELDS").await?;
    Ok(())
}

#[tokio::test]
async fn bad_listing_parameters_are_query_errors() -> Result<()> {
    let server = common::spawn_app().await?;
    let c = &server.client;

    let cases = [
        "/projects?sort_by=no_such_column",
        "/projects?no_such_column=1",
        "/tickets?search[nope]=x",
        "/tickets?estimated_hours=lots",
        "/epics?filterrange[start_date]=yesterday|-",
        "/users?sort_by=name;drop",
        "/projects?page=9223372036854775807&limit=3",
    ];
    for path in cases {
        let res = authed(&server, c.get(server.api(path))).send().await?;
        expect_error(res, StatusCode::BAD_REQUEST, "QUERY_ERROR").await?;
    }
    Ok(())
}

#[tokio::test]
async fn unknown_lookup_kind_is_not_found() -> Result<()> {
    let server = common::spawn_app().await?;

    let res = authed(&server, server.client.get(server.api("/lookups/colours"))).send().await?;
    expect_error(res, StatusCode::NOT_FOUND, "NOT_FOUND").await?;
    Ok(())
}
