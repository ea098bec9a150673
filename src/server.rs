use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::bot::{self, AppState};
use crate::update::Update;

/// Body returned when a request fails
#[derive(Debug, Serialize)]
struct ErrorMessage {
    message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorMessage { message })).into_response()
}

async fn handle_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            error!("Failed to decode update: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match bot::handle_update(&state, update).await {
        Ok(()) => StatusCode::OK.into_response(),
        // Still 200: the update was received, and a non-2xx makes Telegram redeliver it
        Err(e) => {
            error!("{:#}", e);
            error_response(StatusCode::OK, format!("{:#}", e))
        }
    }
}

/// Bound the whole request, body read included, so a slow client or a hung
/// platform call cannot hold a connection open
async fn enforce_timeout(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let uri = request.uri().clone();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request to {} timed out after {:?}", uri, limit);
            error_response(
                StatusCode::REQUEST_TIMEOUT,
                format!("Request timed out after {:?}", limit),
            )
        }
    }
}

pub fn router(state: Arc<AppState>, timeout: Duration) -> Router {
    Router::new()
        .route("/", any(handle_webhook))
        .layer(middleware::from_fn_with_state(timeout, enforce_timeout))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Caught shutdown signal, finishing in-flight requests");
}

/// Serve the webhook on `addr` until Ctrl-C or SIGTERM
pub async fn serve(state: Arc<AppState>, addr: &str, timeout: Duration) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Webhook listening on http://{}", addr);

    axum::serve(listener, router(state, timeout))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
