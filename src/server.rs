//! Server assembly: shared state, the route table, and the serve loop.
//!
//! Everything a handler needs is carried by [`AppState`] and injected through
//! axum's [`State`](axum::extract::State) extractor. There is no module-level
//! server or registry; `main` builds one [`AppState`], hands it to
//! [`router`], and [`serve`] owns the listener until shutdown.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::{net::TcpListener, signal};
use tracing::info;

use crate::{api, readiness::ReadinessAggregator};

/// Shared application state injected into every request handler.
pub struct AppState {
    /// Frozen probe registry. Only `/ready` consults it.
    pub readiness: Arc<ReadinessAggregator>,
    /// Overall deadline for one `/ready` evaluation.
    pub ready_timeout: Duration,
}

impl AppState {
    pub fn new(readiness: ReadinessAggregator, ready_timeout: Duration) -> Self {
        Self {
            readiness: Arc::new(readiness),
            ready_timeout,
        }
    }
}

/// Build the route table without middleware. Tests drive this directly.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::home::index))
        .route("/health", get(api::health::health))
        .route("/ready", get(api::ready::ready))
        .with_state(state)
}

/// Route table plus request-id and request tracing middleware.
pub fn app(state: Arc<AppState>) -> Router {
    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO));

    router(state)
        .layer(axum::middleware::from_fn(api::request_id::request_id_middleware))
        .layer(trace_layer)
}

/// Bind `addr`, serve until Ctrl-C or SIGTERM, then release the socket.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    info!("shutdown signal received");
}
