use clap::{Parser, Subcommand};

use crate::app::app;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "tracker-api")]
#[command(about = "Issue tracking and user management REST backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding APP_PORT/PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply embedded database migrations and exit")]
    Migrate,
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Migrate => {
            let db = DatabaseManager::connect(&config.database).await?;
            db.migrate().await?;
            db.close().await;
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let db = DatabaseManager::connect(&config.database).await?;
    if config.database.auto_migrate {
        db.migrate().await?;
    }

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!(
        "Tracker API listening on http://{} (prefix {})",
        bind_addr,
        config.server.api_prefix
    );

    let router = app(AppState::new(db.pool().clone(), config));
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["tracker-api"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["tracker-api", "serve", "--port", "8081"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(8081) })));

        let cli = Cli::try_parse_from(["tracker-api", "migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Migrate)));
    }
}
