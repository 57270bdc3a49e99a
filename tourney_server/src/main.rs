//! Tournament platform server.
//!
//! Serves the REST API and the realtime change feed on one port, backed by
//! PostgreSQL or an in-process store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use tourney::EventHub;
use tourney::auth::TokenVerifier;
use tourney::db::{Database, MemoryRepository, Repository};
use tourney_server::{
    api,
    config::{ServerConfig, Storage, StorageKind},
    logging, metrics,
};

const HELP: &str = "\
Run the tourney tournament server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --storage    KIND        postgres or memory          [default: env STORAGE or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE                  postgres or memory
  DATABASE_URL             PostgreSQL connection string (postgres storage)
  JWT_SECRET               HS256 secret of the identity provider (required)
  JWT_AUDIENCE             Expected token audience (optional)
  METRICS_BIND             Prometheus exporter address (optional)
  EVENT_BUFFER             Events buffered per realtime subscriber
  PAIRING_STRATEGY         skill or random
  PAIRING_SEED             Seed for random pairing (optional)
  POINTS_PER_WIN           Points awarded for a win
  POINTS_PER_LOSS          Points awarded for a loss
  RUST_LOG                 Log filter (e.g., info,tourney=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;
    let storage: Option<StorageKind> = pargs
        .opt_value_from_str("--storage")
        .context("Invalid --storage value")?;

    logging::init();

    let config = ServerConfig::from_env(bind, storage).context("Invalid configuration")?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        tracing::info!("Prometheus metrics exposed at http://{metrics_bind}/metrics");
    }

    let repo: Arc<dyn Repository> = match &config.storage {
        Storage::Postgres(db_config) => {
            tracing::info!(
                max_connections = db_config.max_connections,
                "Connecting to database"
            );
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Database connected and migrated");
            Arc::new(db.repository())
        }
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let verifier = TokenVerifier::new(
        &config.security.jwt_secret,
        config.security.jwt_audience.clone(),
    );
    let state = api::AppState::new(
        repo,
        EventHub::new(config.event_buffer),
        verifier,
        config.competition,
    );
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C; if the handler cannot be installed the server keeps
/// running until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
