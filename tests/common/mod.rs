#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use tracker_api::auth::generate_jwt;
use tracker_api::config::AppConfig;
use tracker_api::database::DatabaseManager;
use tracker_api::{app, AppState};

// Nothing listens here; lazy pools never connect until a query runs.
const UNREACHABLE_DATABASE_URL: &str = "postgres://tracker@127.0.0.1:1/unreachable";

pub struct TestServer {
    pub base_url: String,
    pub config: AppConfig,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute URL for a path under the API prefix
    pub fn api(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.config.server.api_prefix, path)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, user_id: i64, email: &str) -> String {
        generate_jwt(&self.config.security, user_id, email).expect("test token")
    }

    /// A syntactically valid token for a user that need not exist
    pub fn any_token(&self) -> String {
        self.token_for(1, "someone@example.com")
    }

    /// Register a fresh user and return `(user, token)`
    pub async fn register_user(&self) -> Result<(Value, String)> {
        let email = format!("user-{}@example.com", Uuid::new_v4().simple());
        let res = self
            .client
            .post(self.api("/auth/register"))
            .json(&json!({
                "email": email,
                "password": "correct-horse-1",
                "first_name": "Test",
                "last_name": "User"
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status().as_u16() == 201, "register answered {}", res.status());
        let body: Value = res.json().await?;
        let token = body["data"]["token"].as_str().context("token missing")?.to_string();
        Ok((body["data"]["user"].clone(), token))
    }
}

fn test_config(database_url: &str) -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = database_url.to_string();
    config.database.auto_migrate = false;
    config.database.max_open_connections = 5;
    config.database.max_idle_connections = 0;
    config.database.acquire_timeout_secs = 2;
    config.server.upload_dir = std::env::temp_dir()
        .join(format!("tracker-test-uploads-{}", Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    config.logging.request_logging = false;
    config
}

async fn serve(config: AppConfig, db: DatabaseManager) -> Result<TestServer> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let router = app(AppState::new(db.pool().clone(), config.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    Ok(TestServer {
        base_url: format!("http://{}", addr),
        config,
        client: reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?,
    })
}

/// In-process server whose pool points nowhere. Enough for every check that
/// fails before the store is touched: auth, ids, bodies, unknown columns.
pub async fn spawn_app() -> Result<TestServer> {
    let config = test_config(UNREACHABLE_DATABASE_URL);
    let db = DatabaseManager::connect_lazy(&config.database)?;
    serve(config, db).await
}

/// In-process server backed by `TEST_DATABASE_URL`, migrated.
///
/// Returns `None` when the variable is unset or the database is unreachable,
/// so store-backed tests can skip themselves.
pub async fn spawn_db_app() -> Result<Option<TestServer>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping store-backed test");
        return Ok(None);
    };

    let config = test_config(&url);
    let db = match DatabaseManager::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("TEST_DATABASE_URL unreachable ({}); skipping store-backed test", e);
            return Ok(None);
        }
    };
    db.migrate().await?;

    serve(config, db).await.map(Some)
}

/// Unique uppercase project key, e.g. `TA1B2C3D4`
pub fn project_key() -> String {
    format!("T{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

pub fn unique_token() -> String {
    format!("zq{}", &Uuid::new_v4().simple().to_string()[..10])
}
