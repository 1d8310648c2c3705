//! HTTP server
//!
//! Exposes the hook to the identity provider. Hook routes always answer
//! `200 OK` with one JSON envelope; the envelope itself carries any failure.

use crate::auth::CaseInsensitiveHeaders;
use crate::config::ServerConfig;
use crate::hook::TelephonyHook;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address {0}")]
    InvalidAddress(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub hook: Arc<TelephonyHook>,
}

/// Build the router.
pub fn router(hook: Arc<TelephonyHook>) -> Router {
    Router::new()
        .route("/", post(hook_handler))
        .route("/hooks/telephony", post(hook_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { hook })
}

async fn hook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let headers = CaseInsensitiveHeaders::from(&headers);
    let envelope = state.hook.handle(&headers, &body).await;
    Json(envelope.to_value())
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(
    config: &ServerConfig,
    hook: Arc<TelephonyHook>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = bind_address(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "telephony hook listening");

    axum::serve(listener, router(hook))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Socket address for `bind` and `port`. `bind` is an IPv4 or IPv6 literal.
pub fn bind_address(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let ip: IpAddr = config
        .bind
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| ServerError::InvalidAddress(config.bind.clone()))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
