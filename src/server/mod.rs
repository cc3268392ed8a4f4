//! # HTTP Server
//!
//! Exposes the generation endpoint, composition sessions and the history
//! store over JSON.
//!
//! ## Usage
//!
//! ```bash
//! quickqr serve --listen 0.0.0.0:3000
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | POST | `/generate` | stateless generation |
//! | POST | `/api/compositions` | start a composition |
//! | GET/DELETE | `/api/compositions/:id` | state / discard |
//! | PUT | `/api/compositions/:id/text` | set text |
//! | PUT | `/api/compositions/:id/style` | edit colors and size |
//! | POST | `/api/compositions/:id/generate` | generate base image |
//! | POST/DELETE | `/api/compositions/:id/logo` | upload / remove logo |
//! | PUT | `/api/compositions/:id/frame` | select frame |
//! | POST | `/api/compositions/:id/compose` | finalize |
//! | POST | `/api/compositions/:id/save` | save to history |
//! | GET | `/api/compositions/:id/download` | PNG download |
//! | GET/DELETE | `/api/history` | list / clear |
//! | GET/DELETE | `/api/history/:index` | restore / delete |
//! | GET | `/api/history/:index/download` | PNG download |

pub mod handlers;
mod state;

pub use state::{
    AppState, CompositionSession, InFlight, SESSION_EXPIRATION_SECS, ServerConfig, SharedSession,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::QuickQrError;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let logo_limit = state.config.max_logo_bytes;

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Generation service
        .route("/generate", post(handlers::generate::generate))
        // Composition sessions
        .route("/api/compositions", post(handlers::composition::create))
        .route(
            "/api/compositions/:id",
            get(handlers::composition::show).delete(handlers::composition::destroy),
        )
        .route(
            "/api/compositions/:id/text",
            put(handlers::composition::set_text),
        )
        .route(
            "/api/compositions/:id/style",
            put(handlers::composition::update_style),
        )
        .route(
            "/api/compositions/:id/generate",
            post(handlers::composition::generate_base),
        )
        .route(
            "/api/compositions/:id/logo",
            post(handlers::composition::upload_logo)
                .layer(DefaultBodyLimit::max(logo_limit))
                .delete(handlers::composition::remove_logo),
        )
        .route(
            "/api/compositions/:id/frame",
            put(handlers::composition::select_frame),
        )
        .route(
            "/api/compositions/:id/compose",
            post(handlers::composition::compose),
        )
        .route(
            "/api/compositions/:id/save",
            post(handlers::composition::save),
        )
        .route(
            "/api/compositions/:id/download",
            get(handlers::composition::download),
        )
        // History
        .route(
            "/api/history",
            get(handlers::history::list).delete(handlers::history::clear),
        )
        .route(
            "/api/history/:index",
            get(handlers::history::restore).delete(handlers::history::remove),
        )
        .route(
            "/api/history/:index/download",
            get(handlers::history::download),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use quickqr::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), quickqr::QuickQrError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:3000".to_string(),
///     ..Default::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), QuickQrError> {
    let app_state = Arc::new(AppState::new(config.clone())?);

    // Spawn background session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            QuickQrError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    tracing::info!(addr = %config.listen_addr, "QuickQR server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QuickQrError::Transport(format!("Server error: {}", e)))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Background task to drop idle composition sessions.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        interval.tick().await;
        let removed = state.expire_sessions(Instant::now()).await;
        if removed > 0 {
            let remaining = state.sessions.read().await.len();
            tracing::debug!(removed, remaining, "cleaned up expired sessions");
        }
    }
}
