//! Access service entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use access_service::config::AccessConfig;
use access_service::services::metrics::init_metrics;
use access_service::store::PgAccessStore;
use access_service::{build_router, db, AppState};
use service_core::observability::init_tracing;
use tokio::net::TcpListener;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AccessConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(&config.service_name, &config.log_level, config.is_prod());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.common.port,
        session_ttl_minutes = config.masquerade.session_ttl_minutes,
        sweep_interval_seconds = config.masquerade.sweep_interval_seconds,
        "Starting access-service"
    );

    let metrics = init_metrics();

    let pool = db::create_pool(&config.database).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
        std::io::Error::other(format!("Database error: {}", e))
    })?;
    db::run_migrations(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to run migrations");
        std::io::Error::other(format!("Migration error: {}", e))
    })?;

    let store = Arc::new(PgAccessStore::new(pool));
    let state = AppState::new(config.clone(), store, metrics);

    let sweep_interval = std::time::Duration::from_secs(config.masquerade.sweep_interval_seconds);
    let sweep_handle = state.masquerade.spawn_expiry_sweep(sweep_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
        e
    })?;

    tracing::info!(addr = %addr, "Service ready to accept connections");

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep_handle.abort();
    tracing::info!("Service shutdown complete");
    Ok(())
}
