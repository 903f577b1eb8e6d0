//! # Analytics Engine
//!
//! HTTP service computing dashboard, customer and product reports from
//! transactional order data.
//!
//! ## Lifecycle
//!
//! 1. Load `.env`, initialise tracing, read `AppConfig`
//! 2. Open the PostgreSQL store (a failed connect degrades, it does not abort)
//! 3. Serve the router until Ctrl-C / SIGTERM
//! 4. Close the pool

use std::sync::Arc;

use analytics_engine::config::AppConfig;
use analytics_engine::store::PgStore;
use analytics_engine::{create_app, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analytics_engine=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting analytics engine");

    let config = AppConfig::from_env();
    let store = Arc::new(PgStore::open(&config).await);

    let state = AppState::new(store.clone(), config.limits);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Analytics engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
