//! rsvp API server
//!
//! Serves account, event browsing and seat registration endpoints over
//! HTTP, backed by Postgres or an in-memory store.

use std::sync::Arc;

use anyhow::Result;
use rsvp_api::{
    api::{self, tokens::TokenService},
    config::{self, StoreBackend},
    db::{Database, MemoryStore, Store},
    state::AppState,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to RSVP_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting rsvp API");
    info!(
        listen_addr = %config.listen_addr,
        store = ?config.store,
        dev_mode = config.dev_mode,
        "Configuration loaded"
    );

    if config.dev_secret {
        warn!("RSVP_JWT_SECRET not set; signing tokens with the development secret");
    }

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let db = match Database::connect(&config.database).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            // Run migrations in dev mode
            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }

            Arc::new(db.store())
        }
    };

    let tokens = TokenService::new(
        config.jwt_secret.as_bytes(),
        chrono::Duration::days(config.token_lifetime_days),
    );

    // Create application state
    let state = AppState::new(store, tokens);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for shutdown signal (Ctrl+C) or for the server to exit on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = &mut server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
            return Ok(());
        }
    }

    // Let in-flight requests finish
    let _ = shutdown_tx.send(true);
    let shutdown_timeout = std::time::Duration::from_secs(10);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, server_handle).await {
        warn!(error = %e, "HTTP server did not shut down in time");
    }

    info!("rsvp API shutdown complete");
    Ok(())
}
