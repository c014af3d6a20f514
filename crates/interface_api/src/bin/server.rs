//! Claims Audit - API Server Binary
//!
//! Serves the read API over the snapshot published by the last successful
//! pipeline run.
//!
//! # Usage
//!
//! ```bash
//! # Serve the snapshot file written by the pipeline
//! cargo run --bin claims-audit-api
//!
//! # Serve from PostgreSQL
//! API_STORE=postgres API_DATABASE_URL=postgres://... cargo run --bin claims-audit-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_STORE` - `snapshot_file` or `postgres` (default: snapshot_file)
//! * `API_SNAPSHOT_PATH` - Snapshot file path (default: data/snapshot.json)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_CURRENCY` - Report currency before the first run (default: USD)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON logs (default: false)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use app_pipeline::adapters::JsonSnapshotStore;
use app_pipeline::telemetry::init_tracing;
use app_pipeline::{AuditReader, StoreKind};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresPipelineStore};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("Invalid API configuration")?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        "Starting claims audit API server"
    );

    let reader = open_reader(&config).await?;
    let app = create_router(AppState::new(reader, config.clone()));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr()))?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Opens the store the API reads the published snapshot from
async fn open_reader(config: &ApiConfig) -> anyhow::Result<Arc<dyn AuditReader>> {
    match config.store {
        StoreKind::SnapshotFile => {
            tracing::info!(path = %config.snapshot_path.display(), "Serving snapshot file");
            Ok(Arc::new(JsonSnapshotStore::new(&config.snapshot_path)))
        }
        StoreKind::Postgres => {
            let pool = create_pool(
                DatabaseConfig::new(&config.database_url)
                    .application_name("claims-audit-api")
                    .max_connections(config.max_connections),
            )
            .await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PostgresPipelineStore::new(pool)))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
