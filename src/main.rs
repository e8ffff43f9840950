//! Strictly Mancala - game server binary.

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use strictly_mancala::{GameRepository, GameServer, ServerConfig};
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_mancala=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            db_path,
            config,
        } => {
            let config = load_config(config)?.with_overrides(host, port, db_path);
            run_server(config).await
        }
        Command::Migrate { db_path, config } => {
            let config = load_config(config)?.with_overrides(None, None, db_path);
            open_repository(&config)?;
            info!(db_path = %config.db_path(), "Migrations applied");
            Ok(())
        }
    }
}

/// Defaults, then the optional file, then environment variables.
#[instrument]
fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    let base = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    Ok(base.with_env()?)
}

/// Opens the database and brings its schema up to date.
#[instrument(skip(config), fields(db_path = %config.db_path()))]
fn open_repository(config: &ServerConfig) -> Result<GameRepository> {
    let repository = GameRepository::new(config.db_path().clone())?;
    repository.run_migrations()?;
    Ok(repository)
}

/// Run the HTTP and WebSocket server
async fn run_server(config: ServerConfig) -> Result<()> {
    info!(?config, "Starting Strictly Mancala server");

    let repository = open_repository(&config)?;
    let app = GameServer::new(Arc::new(repository)).router();

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %config.bind_address(), "Server ready, WebSocket at /ws");

    axum::serve(listener, app).await?;
    Ok(())
}
