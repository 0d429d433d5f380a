// handlers/public/mod.rs - Endpoints reachable without a bearer token

pub mod auth;

use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    auth::routes()
}
