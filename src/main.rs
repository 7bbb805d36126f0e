use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shortener::{
    config::AppConfig,
    router,
    service::ShortenerService,
    storage::{FileStorage, FileStorageOptions, InMemoryStorage, UrlStorage},
    AppState,
};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent — env vars may already be set)
    dotenvy::dotenv().ok();

    // Flags and environment; the log level is part of it
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("shortener={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting shortener on {}", config.address);
    tracing::info!("Base URL: {}", config.base_url);

    // Replay the log before accepting traffic; any failure here is fatal
    let storage: Arc<dyn UrlStorage> = match &config.storage_path {
        Some(path) => {
            let options = FileStorageOptions {
                replay_mode: config.replay_mode,
                sync: config.sync_writes,
            };
            let storage = FileStorage::open(path, options)
                .with_context(|| format!("failed to open log at {}", path.display()))?;
            Arc::new(storage)
        }
        None => Arc::new(InMemoryStorage::new()),
    };

    let shortener = ShortenerService::new(storage, config.base_url.clone());
    tracing::info!(
        "Storage: {}, redirects: {}",
        shortener.storage_description(),
        config.redirect
    );

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("failed to bind {}", config.address))?;

    let state = Arc::new(AppState {
        config,
        shortener: shortener.clone(),
    });
    let app = router(state);

    // ── Serve ──────────────────────────────────────────────────────────────
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shortener.close().await.context("failed to close storage")?;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
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
                tracing::error!("failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
