use axum::{
    Router,
    routing::get,
    http::{header, StatusCode},
    response::IntoResponse,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use crate::error::{Error, Result};
use crate::observability::metrics::gather_text;

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_text(),
    )
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ConfigError(format!("cannot bind metrics server to {}: {}", addr, e)))
}

/// Serves the router on `listener` until `shutdown` flips to true or closes.
pub async fn serve(listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Metrics server listening on {}", addr);
    }

    axum::serve(listener, create_router())
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("Metrics server stopped");
    Ok(())
}
