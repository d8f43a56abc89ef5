#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! HTTP surface of the relay: user proxy endpoints, admin surface,
//! and the middleware that authenticates both

mod admin;
mod auth;
mod error;
mod health;
mod proxy;
mod state;

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    port: u16,
}

impl Server {
    /// Build the server from assembled application state
    pub fn new(state: AppState, port: u16) -> Self {
        Self {
            router: router(state),
            port,
        }
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

/// Build the full router over the given state
pub fn router(state: AppState) -> Router {
    // User endpoints behind API-key auth
    let api = Router::new()
        .route("/api/v1/chat/completions", post(proxy::chat_completions))
        .route("/api/v1/images/generations", post(proxy::image_generation))
        .route("/api/v1/videos/generations", post(proxy::video_generation))
        .route("/api/v1/tasks/{task_id}", get(proxy::get_task))
        .route("/api/v1/balance", get(proxy::get_balance))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    // Admin endpoints behind the shared admin token
    let admin = Router::new()
        .route("/admin/channels", post(admin::create_channel).get(admin::list_channels))
        .route("/admin/channels/{id}", delete(admin::delete_channel))
        .route("/admin/recharge", post(admin::recharge))
        .route("/admin/monitor", get(admin::monitor))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin_token,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
