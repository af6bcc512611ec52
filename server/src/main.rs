use std::sync::Arc;

use review_server::api::{self, AppState};
use review_server::config::ServerConfig;
use review_server::reviews::ReviewIndexStore;
use review_server::storage::{DurableStore, KeyValueStore, MemoryStore, SystemTimeSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn KeyValueStore> = match &config.data_file {
        Some(path) => match DurableStore::open(path, config.sync_writes) {
            Ok((store, recovery)) => {
                tracing::info!(
                    "Opened command log {}: {} records replayed, {} rejected, {} torn bytes truncated",
                    path.display(),
                    recovery.records_scanned,
                    recovery.commands_rejected,
                    recovery.truncated_bytes
                );
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("Failed to open command log {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("REVIEWS_DATA_FILE is not set; reviews are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let reviews = Arc::new(ReviewIndexStore::new(store, Arc::new(SystemTimeSource)));
    let app = api::router(AppState::new(reviews));

    let addr = config.socket_addr();
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        });

    tracing::info!("server stopped");
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
