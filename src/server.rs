// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server setup.

use crate::api::{self, AppState};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::SqliteStore;
use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post, put},
};
use camino::Utf8Path;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Build the application router. Files under `static_dir`, if given, are
/// served for any path the API does not handle.
pub fn router(state: AppState, static_dir: Option<&Utf8Path>) -> Router {
    let api = Router::new()
        .route("/health", get(api::health))
        .route("/api/logs", post(api::ingest_log))
        .route("/api/logs/processed", put(api::mark_processed))
        .route("/api/logs/pending", get(api::pending_logs))
        .route("/api/stats", get(api::get_stats))
        .route("/api/recentLogs", get(api::recent_logs_default))
        .route("/api/recentLogs/{limit}", get(api::recent_logs))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir.as_std_path())),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Open the store and serve the API until Ctrl+C or SIGTERM.
pub async fn serve(config: &Config, bind: Option<SocketAddr>) -> Result<()> {
    info!("Opening database at {}", config.database.path);
    let store = SqliteStore::open(&config.database.path).context("failed to open log store")?;

    let state = AppState {
        store: Arc::new(store),
        clock: Arc::new(SystemClock),
        stats: config.stats.options(),
        recent_limit: config.stats.recent_limit,
    };

    let static_dir = config.server.static_dir.as_deref().filter(|dir| {
        let exists = dir.as_std_path().is_dir();
        if !exists {
            warn!("Static directory {dir} not found, dashboard files will not be served");
        }
        exists
    });

    let app = router(state, static_dir);

    let address = bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Dashboard running at http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("Failed to listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
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
}
