//! crust-server — authoritative bakery operations backend
//!
//! Long-running service that:
//! - Admits mutating requests through an idempotency gate
//! - Keeps per-branch stock consistent through an append-only ledger
//! - Commits production batches, sales, and voids transactionally
//! - Archives aged history into mirror tables under an advisory lock

mod alerts;
mod api;
mod archive;
mod auth;
mod config;
mod db;
pub mod error;
mod state;

use config::Config;
use state::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crust_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting crust-server (env: {})", config.environment);

    // Initialize application state (pool + migrations)
    let state = AppState::new(&config).await?;

    // Background workers
    let shutdown = CancellationToken::new();
    let scheduler_handle = tokio::spawn(
        archive::Scheduler::new(state.clone(), shutdown.clone()).run(),
    );

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    let limiter_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            tokio::select! {
                _ = limiter_shutdown.cancelled() => break,
                _ = interval.tick() => rate_limiter.cleanup().await,
            }
        }
    });

    // Build router and serve
    let app = api::create_router(state.clone());
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("crust-server listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background workers and wait for the scheduler to release its lock
    shutdown.cancel();
    let _ = scheduler_handle.await;

    state.pool.close().await;
    tracing::info!("crust-server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
