use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, request_log_middleware, ApiResponse, ApiResult};
use crate::state::AppState;

/// Build the full router: operational routes at the root, the API under the
/// configured prefix, stored uploads under `/uploads`.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new().merge(public::routes()).merge(
        protected::routes().route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
    );

    let prefix = api_prefix(&config.server.api_prefix);
    let router = Router::new().route("/", get(root)).route("/health", get(health))
        .route("/monitoring", get(monitoring));
    let router = match prefix {
        Some(prefix) => router.nest(&prefix, api),
        None => router.merge(api),
    };

    let mut router = router
        .nest_service("/uploads", ServeDir::new(&config.server.upload_dir))
        .fallback(fallback)
        .layer(from_fn(method_not_allowed))
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes));

    if config.logging.request_logging {
        router = router.layer(from_fn(request_log_middleware));
    }

    router
        .layer(cors_layer(&config.security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// "/api/v1/" -> "/api/v1"; an empty or bare "/" prefix mounts at the root
fn api_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = state.config.server.api_prefix.trim_end_matches('/').to_string();

    Json(json!({
        "success": true,
        "data": {
            "name": "Tracker API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Issue tracking and user management REST backend",
            "environment": format!("{:?}", state.config.environment).to_lowercase(),
            "endpoints": {
                "health": "/health (public)",
                "monitoring": "/monitoring (public)",
                "auth": format!("{}/auth/register, /auth/login, /auth/google, /auth/google/callback (public)", prefix),
                "account": format!("{}/auth/userinfo, /auth/password (protected)", prefix),
                "resources": format!(
                    "{}/{{users,organizations,projects,ticket-statuses,epics,tickets,comments,time-logs,sprints,labels}}[/:id] (protected)",
                    prefix
                ),
                "attachments": format!("{}/attachments[/:id], {}/tickets/:id/attachments (protected)", prefix, prefix),
                "lookups": format!("{}/lookups/:kind (protected)", prefix),
            }
        },
        "error": null
    }))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    DatabaseManager::health_check(&state.pool).await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "ok",
        "timestamp": chrono::Utc::now(),
    })))
}

/// Process and pool counters; never touches the store
async fn monitoring(State(state): State<AppState>) -> ApiResult<Value> {
    let pool = &state.pool;
    Ok(ApiResponse::success(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "pid": std::process::id(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "pool": {
            "size": pool.size(),
            "idle": pool.num_idle(),
            "max_connections": state.config.database.max_open_connections,
        },
        "timestamp": chrono::Utc::now(),
    })))
}

async fn fallback() -> impl IntoResponse {
    ApiError::not_found("Route not found")
}

// The router answers a known path with the wrong method by a bare 405; keep its Allow header
async fn method_not_allowed(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut rendered = ApiError::MethodNotAllowed(format!("Method {} not allowed for this route", method)).into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(header::ALLOW, allow);
    }
    rendered
}
