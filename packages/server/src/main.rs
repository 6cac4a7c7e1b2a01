use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use birdwatch_server::config::AppConfig;
use birdwatch_server::database::{close_db, init_db};
use birdwatch_server::lifecycle::SightingService;
use birdwatch_server::state::AppState;
use birdwatch_server::store::SeaOrmRecordStore;
use birdwatch_server::{build_router, sweep};
use common::storage::filesystem::FilesystemBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialise the record database")?;

    let blobs = Arc::new(
        FilesystemBlobStore::new(
            config.storage.uploads_dir.clone(),
            config.storage.max_blob_size,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to prepare uploads directory {}",
                config.storage.uploads_dir.display()
            )
        })?,
    );
    let records = Arc::new(SeaOrmRecordStore::new(db.clone()));
    let service = Arc::new(SightingService::new(records.clone(), blobs.clone()));

    if config.sweep.enabled {
        tokio::spawn(sweep::run_orphan_sweep(
            records,
            blobs,
            config.sweep.clone(),
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        config: Arc::new(config),
        service,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down");
    close_db(db).await.context("Failed to close the record database")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
