use clap::Parser;
use tracing_subscriber::EnvFilter;

use tracker_api::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET, etc. are picked up
    let _ = dotenvy::dotenv();

    let config = tracker_api::config::config().clone();

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Tracker API in {:?} mode", config.environment);

    if let Err(e) = cli::run(Cli::parse(), config).await {
        tracing::error!("Fatal: {:#}", e);
        return Err(e);
    }
    Ok(())
}
