pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod schema;
pub mod services;
pub mod state;
pub mod uploads;

pub use app::app;
pub use state::AppState;
