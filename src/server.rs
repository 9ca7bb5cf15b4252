//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, deletion worker spawning, and the Axum server
//! lifecycle including graceful shutdown.

use crate::application::services::{IdentityService, UrlResolver, UrlService};
use crate::config::{Config, StorageBackend};
use crate::domain::delete_worker::DeleteWorker;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::persistence::{FileUrlRepository, MemoryUrlRepository, PgUrlRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::{Router, ServiceExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::normalize_path::NormalizePath;

/// Opens the given storage backend.
///
/// # Errors
///
/// Returns an error if the database stays unreachable after retries, a
/// migration fails, or the storage file cannot be opened.
pub async fn open_repository(
    backend: StorageBackend,
    max_connections: u32,
) -> Result<Arc<dyn UrlRepository>> {
    let repository: Arc<dyn UrlRepository> = match backend {
        StorageBackend::Postgres(dsn) => Arc::new(
            PgUrlRepository::connect(&dsn, max_connections)
                .await
                .context("Failed to open PostgreSQL storage")?,
        ),
        StorageBackend::File(path) => Arc::new(
            FileUrlRepository::open(&path)
                .await
                .with_context(|| format!("Failed to open storage file {}", path.display()))?,
        ),
        StorageBackend::Memory => {
            tracing::warn!("No persistent storage configured, records are kept in memory");
            Arc::new(MemoryUrlRepository::new())
        }
    };

    Ok(repository)
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL with migrations, file, or memory)
/// - Background deletion worker
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server stops accepting connections, the deletion
/// worker is cancelled and its final flush is awaited.
///
/// # Errors
///
/// Returns an error if:
/// - Storage cannot be opened
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository =
        open_repository(config.storage_backend(), config.db_max_connections).await?;

    let shutdown = CancellationToken::new();
    let (delete_queue, worker) =
        DeleteWorker::spawn(repository.clone(), config.delete_worker, shutdown.clone());

    let resolver = UrlResolver::new(
        repository.clone(),
        config.resolver_strategy,
        config.short_code_length,
    );
    let url_service = Arc::new(UrlService::new(
        repository,
        resolver,
        delete_queue,
        config.base_url.clone(),
    ));
    let identity_service = Arc::new(IdentityService::new(config.user_token_secret.clone()));

    let state = AppState::new(url_service, identity_service, config.trusted_subnet);
    let app = app_router(state);

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    serve(listener, app, shutdown_signal(), shutdown, worker).await
}

/// Serves `app` until `signal` resolves and in-flight requests finish, then
/// stops the deletion worker and awaits its final flush.
///
/// The worker keeps accepting deletes while requests drain.
pub async fn serve<F>(
    listener: TcpListener,
    app: NormalizePath<Router>,
    signal: F,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(signal)
        .await?;

    shutdown.cancel();
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Delete worker panicked");
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
