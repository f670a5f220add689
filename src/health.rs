use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics;

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub fn make_app() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::metrics_handler))
}

/// Bind the liveness/metrics listener.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?local, "health endpoint listening");
    axum::serve(listener, make_app())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("health server failed")
}
