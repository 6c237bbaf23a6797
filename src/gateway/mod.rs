//! HTTP gateway
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/` | liveness text |
//! | POST | `/send-ft` | relay one FT transfer |
//! | GET | `/health` | admission gate occupancy |
//! | GET | `/docs` | Swagger UI (`/api-docs/openapi.json`) |

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/send-ft", post(handlers::send_ft))
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind `host:port` and serve until Ctrl-C / SIGTERM
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.inspect_err(|e| {
        tracing::error!(
            "[GATEWAY] Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        );
    })?;

    tracing::info!("[GATEWAY] listening on http://{}", addr);
    tracing::info!("[GATEWAY] API docs: http://{}/docs", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[GATEWAY] failed to install Ctrl-C handler: {}", e);
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
                tracing::error!("[GATEWAY] failed to install SIGTERM handler: {}", e);
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
    tracing::info!("[GATEWAY] shutdown signal received, draining connections");
}
