mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

struct Session {
    server: TestServer,
    token: String,
}

impl Session {
    async fn start() -> Result<Option<Self>> {
        let Some(server) = common::spawn_db_app().await? else {
            return Ok(None);
        };
        let (_, token) = server.register_user().await?;
        Ok(Some(Self { server, token }))
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.server.client.get(self.server.api(path)).bearer_auth(&self.token).send().await?;
        Ok((res.status(), res.json().await?))
    }

    async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .server
            .client
            .post(self.server.api(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .server
            .client
            .put(self.server.api(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.server.client.delete(self.server.api(path)).bearer_auth(&self.token).send().await?;
        Ok((res.status(), res.json().await?))
    }

    async fn create_project(&self, name: &str) -> Result<Value> {
        let (status, body) = self
            .post("/projects", json!({ "name": name, "key": common::project_key() }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create project answered {}: {}", status, body);
        Ok(body["data"].clone())
    }
}

fn id_of(row: &Value) -> Result<i64> {
    row["id"].as_i64().context("row without id")
}

#[tokio::test]
async fn project_round_trip() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };

    let created = s.create_project("Round trip").await?;
    let id = id_of(&created)?;
    assert_eq!(created["project_type"], "kanban");
    assert!(created["deleted_at"].is_null());

    let (status, body) = s.get(&format!("/projects/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Round trip");
    assert!(body["data"]["owner"].is_object(), "owner is preloaded: {}", body);

    let (status, body) = s
        .put(&format!("/projects/{}", id), json!({ "name": "Renamed", "description": "Now described" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["description"], "Now described");

    // explicit null clears a nullable column
    let (_, body) = s.put(&format!("/projects/{}", id), json!({ "description": null })).await?;
    assert!(body["data"]["description"].is_null());
    Ok(())
}

#[tokio::test]
async fn repeated_update_gives_same_row() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let id = id_of(&s.create_project("Idempotent").await?)?;

    let patch = json!({ "name": "Same", "is_private": true });
    let (_, first) = s.put(&format!("/projects/{}", id), patch.clone()).await?;
    let (_, second) = s.put(&format!("/projects/{}", id), patch).await?;
    assert_eq!(first["data"]["name"], second["data"]["name"]);
    assert_eq!(first["data"]["is_private"], second["data"]["is_private"]);
    assert_eq!(first["data"]["key"], second["data"]["key"]);
    Ok(())
}

#[tokio::test]
async fn protected_fields_are_ignored_on_update() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let project = s.create_project("Protected").await?;
    let id = id_of(&project)?;

    let (status, body) = s
        .put(
            &format!("/projects/{}", id),
            json!({ "id": 424242, "created_at": "2001-01-01T00:00:00Z", "name": "Still me" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["created_at"], project["created_at"]);
    assert_eq!(body["data"]["name"], "Still me");
    Ok(())
}

#[tokio::test]
async fn search_sort_and_paginate() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let marker = common::unique_token();

    for n in 1..=7 {
        s.create_project(&format!("{} {}", marker, n)).await?;
    }

    let (status, body) = s
        .get(&format!(
            "/projects?search[name]={}&sort_by=name&sort_order=desc&page=2&limit=5",
            marker
        ))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 7);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["limit"], 5);
    let names: Vec<&str> = body["data"]["data"]
        .as_array()
        .context("data array")?
        .iter()
        .filter_map(|row| row["name"].as_str())
        .collect();
    assert_eq!(names, vec![format!("{} 2", marker), format!("{} 1", marker)]);
    Ok(())
}

#[tokio::test]
async fn equality_null_and_exclusion_filters() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let marker = common::unique_token();

    let a = id_of(&s.create_project(&format!("{} a", marker)).await?)?;
    let b = id_of(&s.create_project(&format!("{} b", marker)).await?)?;
    let c = id_of(&s.create_project(&format!("{} c", marker)).await?)?;
    s.put(&format!("/projects/{}", a), json!({ "description": "set" })).await?;

    let (_, body) = s
        .get(&format!("/projects?search[name]={}&description=null&sort_by=id", marker))
        .await?;
    let ids: Vec<i64> = body["data"]["data"].as_array().context("data")?.iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![b, c]);

    let (_, body) = s
        .get(&format!("/projects?search[name]={}&filter_not[id]={},{}", marker, a, c))
        .await?;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["data"][0]["id"], b);

    let (_, body) = s.get(&format!("/projects?id={},{}&sort_by=id&sort_order=asc", a, c)).await?;
    let ids: Vec<i64> = body["data"]["data"].as_array().context("data")?.iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![a, c]);
    Ok(())
}

#[tokio::test]
async fn range_filters_and_generated_keys() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let project = s.create_project("Keys").await?;
    let project_id = id_of(&project)?;
    let key = project["key"].as_str().context("key")?.to_string();

    let (status, body) = s
        .post("/ticket-statuses", json!({ "project_id": project_id, "name": "Open", "is_default": true }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let status_id = id_of(&body["data"])?;

    let mut keys = Vec::new();
    for hours in [1.0, 4.0, 9.5] {
        let (status, body) = s
            .post(
                "/tickets",
                json!({
                    "project_id": project_id,
                    "status_id": status_id,
                    "title": format!("{} hour task", hours),
                    "estimated_hours": hours
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        keys.push(body["data"]["ticket_key"].as_str().context("ticket_key")?.to_string());
    }
    assert_eq!(keys, vec![format!("{}-1", key), format!("{}-2", key), format!("{}-3", key)]);

    let (_, body) = s
        .get(&format!("/tickets?project_id={}&filterrange[estimated_hours]=2|-", project_id))
        .await?;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = s
        .get(&format!("/tickets?project_id={}&filterrange[estimated_hours]=-|4", project_id))
        .await?;
    assert_eq!(body["data"]["total"], 2);

    let (status, body) = s
        .post("/epics", json!({ "project_id": project_id, "title": "First epic" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["epic_key"], format!("{}-E1", key));
    Ok(())
}

#[tokio::test]
async fn missing_rows_are_not_found() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };

    let (status, body) = s.get("/projects/987654321").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = s.put("/projects/987654321", json!({ "name": "ghost" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = s.delete("/projects/987654321").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn rejected_create_leaves_no_row() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let marker = common::unique_token();

    let (status, body) = s.post("/projects", json!({ "name": marker })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = s.get(&format!("/projects?search[name]={}", marker)).await?;
    assert_eq!(body["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_unique_value_conflicts() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let key = common::project_key();

    let (status, _) = s.post("/projects", json!({ "name": "One", "key": key })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = s.post("/projects", json!({ "name": "Two", "key": key })).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn soft_then_permanent_delete() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };
    let marker = common::unique_token();
    let id = id_of(&s.create_project(&marker).await?)?;

    let (status, body) = s.delete(&format!("/projects/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, _) = s.get(&format!("/projects/{}", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = s.get(&format!("/projects?search[name]={}", marker)).await?;
    assert_eq!(body["data"]["total"], 0);

    // a soft-deleted row can still be purged
    let (status, _) = s.delete(&format!("/projects/{}?permanent=true", id)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = s.delete(&format!("/projects/{}?permanent=true", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn lookups_list_seeded_rows() -> Result<()> {
    let Some(s) = Session::start().await? else { return Ok(()) };

    for kind in ["priorities", "ticket-types", "project-statuses", "user-statuses"] {
        let (status, body) = s.get(&format!("/lookups/{}", kind)).await?;
        assert_eq!(status, StatusCode::OK, "{}", kind);
        assert!(!body["data"].as_array().context("data")?.is_empty(), "{} is seeded", kind);
    }
    Ok(())
}
